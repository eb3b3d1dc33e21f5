use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use recall_core::{Flashcard, FlashcardFilter, NewFlashcard, UpdateFlashcard};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{auth::Caller, error::ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_flashcards).post(create_flashcard))
        .route("/daily", get(daily_flashcards))
        .route(
            "/:id",
            get(get_flashcard).put(update_flashcard).delete(delete_flashcard),
        )
        .route("/:id/review", put(review_flashcard))
}

/// A review rating. Anything other than easy, medium or hard counts as hard,
/// and so does a review sent without a body.
#[derive(Deserialize)]
struct ReviewRequest {
    #[serde(default)]
    difficulty: String,
}

async fn create_flashcard(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewFlashcard>, JsonRejection>,
) -> Result<(StatusCode, Json<Flashcard>), ApiError> {
    let Json(card) = payload?;
    let card = state.service.create_flashcard(caller.id(), card).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn list_flashcards(
    State(state): State<AppState>,
    caller: Caller,
    filter: Result<Query<FlashcardFilter>, QueryRejection>,
) -> Result<Json<Vec<Flashcard>>, ApiError> {
    let Query(filter) = filter?;
    Ok(Json(state.service.list_flashcards(caller.id(), filter).await?))
}

async fn daily_flashcards(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Flashcard>>, ApiError> {
    Ok(Json(state.service.daily_set(caller.id()).await?))
}

async fn get_flashcard(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Flashcard>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.service.get_flashcard(caller.id(), id).await?))
}

async fn update_flashcard(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateFlashcard>, JsonRejection>,
) -> Result<Json<Flashcard>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    Ok(Json(
        state.service.update_flashcard(caller.id(), id, update).await?,
    ))
}

async fn delete_flashcard(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    state.service.delete_flashcard(caller.id(), id).await?;
    Ok(Json(json!({ "message": "Flashcard removed" })))
}

async fn review_flashcard(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
    payload: Option<Json<ReviewRequest>>,
) -> Result<Json<Flashcard>, ApiError> {
    let Path(id) = id?;
    let rating = payload.map(|Json(r)| r.difficulty).unwrap_or_default();
    Ok(Json(
        state
            .service
            .review_flashcard(caller.id(), id, &rating)
            .await?,
    ))
}
