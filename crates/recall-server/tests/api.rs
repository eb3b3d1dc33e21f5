use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use recall_core::{Assistant, Completion, Error, RecallService};
use recall_server::{app, cors_layer};
use recall_sqlite::SqliteDatabase;
use serde_json::{json, Value};
use tower::util::ServiceExt;

struct Canned(&'static str);

#[async_trait::async_trait]
impl Completion for Canned {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, Error> {
        Ok(self.0.to_string())
    }
}

fn setup_app(assistant: Assistant) -> Router {
    let db = SqliteDatabase::open_in_memory().unwrap();
    let service = RecallService::new(db).with_assistant(assistant);
    app(service, cors_layer(None).unwrap())
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user);
    }
    let body = match body {
        Some(body) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&body).unwrap())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(json!({}));
    (status, body)
}

async fn create_note(app: &Router, user: &str, title: &str, subject: &str) -> i64 {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/notes",
        Some(user),
        Some(json!({
            "title": title,
            "content": format!("All about {}", title),
            "subject": subject,
            "tags": ["Intro"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn create_card(app: &Router, user: &str, question: &str) -> i64 {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/flashcards",
        Some(user),
        Some(json!({ "question": question, "answer": "yes", "subject": "math" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_needs_no_user() {
    let app = setup_app(Assistant::unavailable());
    let (status, body) = request(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_missing_user_is_unauthorized() {
    let app = setup_app(Assistant::unavailable());
    for user in [None, Some("  ")] {
        let (status, body) = request(&app, Method::GET, "/api/notes", user, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().contains("X-User-Id"));
    }
}

#[tokio::test]
async fn test_note_crud() {
    let app = setup_app(Assistant::unavailable());
    let id = create_note(&app, "alice", "Cells", "biology").await;
    create_note(&app, "alice", "Limits", "math").await;

    let (status, note) =
        request(&app, Method::GET, &format!("/api/notes/{}", id), Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(note["title"], "Cells");
    assert_eq!(note["userId"], "alice");
    assert_eq!(note["tags"], json!(["intro"]));
    assert!(note["createdAt"].is_string());

    let (_, notes) = request(
        &app,
        Method::GET,
        "/api/notes?subject=biology",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(notes.as_array().unwrap().len(), 1);

    let (_, subjects) =
        request(&app, Method::GET, "/api/notes/subjects", Some("alice"), None).await;
    assert_eq!(subjects, json!(["biology", "math"]));

    let (status, note) = request(
        &app,
        Method::PUT,
        &format!("/api/notes/{}", id),
        Some("alice"),
        Some(json!({ "title": "", "content": "Cells divide." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(note["title"], "Cells");
    assert_eq!(note["content"], "Cells divide.");

    let (status, body) = request(
        &app,
        Method::DELETE,
        &format!("/api/notes/{}", id),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Note removed" }));

    let (status, _) =
        request(&app, Method::GET, &format!("/api/notes/{}", id), Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors() {
    let app = setup_app(Assistant::unavailable());

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/notes",
        Some("alice"),
        Some(json!({ "title": " ", "content": "x", "subject": "s" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title cannot be empty"));

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/flashcards",
        Some("alice"),
        Some(json!({ "question": "q", "answer": "a", "subject": "s", "difficulty": "impossible" })),
    )
    .await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());

    let (status, _) = request(&app, Method::GET, "/api/notes/abc", Some("alice"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_users_records_are_forbidden() {
    let app = setup_app(Assistant::unavailable());
    let note = create_note(&app, "alice", "Cells", "biology").await;
    let card = create_card(&app, "alice", "2 + 2 = 4?").await;

    let (status, _) =
        request(&app, Method::GET, &format!("/api/notes/{}", note), Some("bob"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        Method::PUT,
        &format!("/api/flashcards/{}/review", card),
        Some("bob"),
        Some(json!({ "difficulty": "easy" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        Method::DELETE,
        &format!("/api/flashcards/{}", card),
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, cards) = request(&app, Method::GET, "/api/flashcards", Some("bob"), None).await;
    assert_eq!(cards, json!([]));
}

#[tokio::test]
async fn test_review_flow() {
    let app = setup_app(Assistant::unavailable());
    let id = create_card(&app, "alice", "Is 7 prime?").await;

    let (_, due) = request(
        &app,
        Method::GET,
        "/api/flashcards?due_only=true",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(due.as_array().unwrap().len(), 1);

    let (status, card) = request(
        &app,
        Method::PUT,
        &format!("/api/flashcards/{}/review", id),
        Some("alice"),
        Some(json!({ "difficulty": "easy" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["reviewCount"], 1);
    assert_eq!(card["difficulty"], "medium");
    assert!(card["lastReviewed"].is_string());
    assert!(card["nextReview"].as_str().unwrap() > card["lastReviewed"].as_str().unwrap());

    let (_, due) = request(
        &app,
        Method::GET,
        "/api/flashcards?due_only=true",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(due, json!([]));

    // Small collections come back whole from the daily set
    let (status, daily) =
        request(&app, Method::GET, "/api/flashcards/daily", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(daily.as_array().unwrap().len(), 1);
    assert_eq!(daily[0]["id"], id);

    let (status, body) = request(
        &app,
        Method::DELETE,
        &format!("/api/flashcards/{}", id),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Flashcard removed" }));
}

#[tokio::test]
async fn test_review_without_body_counts_as_hard() {
    let app = setup_app(Assistant::unavailable());
    let id = create_card(&app, "alice", "Is 9 prime?").await;

    let (status, card) = request(
        &app,
        Method::PUT,
        &format!("/api/flashcards/{}/review", id),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", card);
    assert_eq!(card["reviewCount"], 1);

    let last = chrono::DateTime::parse_from_rfc3339(card["lastReviewed"].as_str().unwrap()).unwrap();
    let next = chrono::DateTime::parse_from_rfc3339(card["nextReview"].as_str().unwrap()).unwrap();
    // One calendar day, which is 23 to 25 hours around a DST change
    let gap = next - last;
    assert!(gap >= chrono::TimeDelta::hours(23) && gap <= chrono::TimeDelta::hours(25));
}

#[tokio::test]
async fn test_ai_routes_without_key() {
    let app = setup_app(Assistant::unavailable());
    let note = create_note(&app, "alice", "Cells", "biology").await;

    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/api/ai/summarize/{}", note),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_ai_summarize_stores_summary() {
    let app = setup_app(Assistant::new(Arc::new(Canned("- cells are the unit of life"))));
    let note = create_note(&app, "alice", "Cells", "biology").await;

    let (status, body) = request(
        &app,
        Method::POST,
        &format!("/api/ai/summarize/{}", note),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "- cells are the unit of life");

    let (_, stored) =
        request(&app, Method::GET, &format!("/api/notes/{}", note), Some("alice"), None).await;
    assert_eq!(stored["summary"], "- cells are the unit of life");
}

#[tokio::test]
async fn test_ai_generate_flashcards() {
    let reply = r#"[{"question": "What is a cell?", "answer": "The unit of life"},
                    {"question": "Who saw cells first?", "answer": "Robert Hooke"}]"#;
    let app = setup_app(Assistant::new(Arc::new(Canned(reply))));
    let note = create_note(&app, "alice", "Cells", "biology").await;

    let (status, cards) = request(
        &app,
        Method::POST,
        &format!("/api/ai/generate-flashcards/{}", note),
        Some("alice"),
        Some(json!({ "count": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cards = cards.as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["noteId"], note);
    assert_eq!(cards[0]["subject"], "biology");
    assert_eq!(cards[0]["difficulty"], "medium");

    let (_, all) = request(&app, Method::GET, "/api/flashcards", Some("alice"), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, _) = request(
        &app,
        Method::POST,
        &format!("/api/ai/generate-flashcards/{}", note),
        Some("alice"),
        Some(json!({ "count": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ai_daily_questions() {
    let app = setup_app(Assistant::new(Arc::new(Canned("not json at all"))));

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/ai/daily-questions",
        Some("alice"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    create_note(&app, "alice", "Cells", "biology").await;
    let (status, body) = request(
        &app,
        Method::POST,
        "/api/ai/daily-questions",
        Some("alice"),
        Some(json!({ "subject": "biology" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}
