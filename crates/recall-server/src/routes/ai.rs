use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use recall_core::{Flashcard, QuestionAnswer};
use serde::{Deserialize, Serialize};

use crate::{auth::Caller, error::ApiError, AppState};

const DEFAULT_FLASHCARD_COUNT: u32 = 5;
const DEFAULT_QUESTION_COUNT: u32 = 3;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summarize/:note_id", post(summarize))
        .route("/generate-flashcards/:note_id", post(generate_flashcards))
        .route("/daily-questions", post(daily_questions))
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Deserialize, Default)]
struct GenerateRequest {
    count: Option<u32>,
}

#[derive(Deserialize, Default)]
struct DailyQuestionsRequest {
    subject: Option<String>,
    count: Option<u32>,
}

async fn summarize(
    State(state): State<AppState>,
    caller: Caller,
    note_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let Path(note_id) = note_id?;
    let summary = state.service.summarize_note(caller.id(), note_id).await?;
    Ok(Json(SummaryResponse { summary }))
}

// The body is optional; a missing or unreadable one means the defaults.
async fn generate_flashcards(
    State(state): State<AppState>,
    caller: Caller,
    note_id: Result<Path<i64>, PathRejection>,
    payload: Option<Json<GenerateRequest>>,
) -> Result<(StatusCode, Json<Vec<Flashcard>>), ApiError> {
    let Path(note_id) = note_id?;
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    let cards = state
        .service
        .generate_flashcards(
            caller.id(),
            note_id,
            request.count.unwrap_or(DEFAULT_FLASHCARD_COUNT),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(cards)))
}

async fn daily_questions(
    State(state): State<AppState>,
    caller: Caller,
    payload: Option<Json<DailyQuestionsRequest>>,
) -> Result<Json<Vec<QuestionAnswer>>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    let questions = state
        .service
        .daily_questions(
            caller.id(),
            request.subject,
            request.count.unwrap_or(DEFAULT_QUESTION_COUNT),
        )
        .await?;
    Ok(Json(questions))
}
