use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use recall_core::{NewNote, Note, NoteFilter, UpdateNote};
use serde_json::{json, Value};

use crate::{auth::Caller, error::ApiError, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notes).post(create_note))
        .route("/subjects", get(list_subjects))
        .route("/:id", get(get_note).put(update_note).delete(delete_note))
}

async fn create_note(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewNote>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let Json(note) = payload?;
    let note = state.service.create_note(caller.id(), note).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn list_notes(
    State(state): State<AppState>,
    caller: Caller,
    filter: Result<Query<NoteFilter>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(filter) = filter?;
    Ok(Json(state.service.list_notes(caller.id(), filter).await?))
}

async fn list_subjects(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.service.list_subjects(caller.id()).await?))
}

async fn get_note(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.service.get_note(caller.id(), id).await?))
}

async fn update_note(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateNote>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    Ok(Json(state.service.update_note(caller.id(), id, update).await?))
}

async fn delete_note(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    state.service.delete_note(caller.id(), id).await?;
    Ok(Json(json!({ "message": "Note removed" })))
}
