//! Recall HTTP API: notes, spaced-repetition flashcards and the AI study
//! assistant, served over axum on top of the SQLite store.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method};
use recall_core::RecallService;
use recall_sqlite::SqliteDatabase;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod error;
pub mod openai;
mod routes;

pub type Service = RecallService<SqliteDatabase>;

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
}

/// Build the full router, with request tracing and the given CORS policy.
pub fn app(service: Service, cors: CorsLayer) -> Router {
    let state = AppState {
        service: Arc::new(service),
    };

    Router::new()
        .route("/health", get(health))
        .nest("/api/notes", routes::notes::router())
        .nest("/api/flashcards", routes::flashcards::router())
        .nest("/api/ai", routes::ai::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for a single allowed origin, or any origin for `None` / `"*"`.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, http::header::InvalidHeaderValue> {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(auth::USER_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    match origin.map(str::trim) {
        None | Some("") | Some("*") => Ok(cors.allow_origin(Any)),
        Some(origin) => Ok(cors.allow_origin(HeaderValue::from_str(origin)?)),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
