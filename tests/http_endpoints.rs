//! Router-level tests for the coach HTTP API, using an in-memory store and
//! stub generators in place of the model server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use pose_coach::clients::{GenerationError, Generator};
use pose_coach::config::Config;
use pose_coach::http::{AppState, build_router};
use pose_coach::storage::Store;
use serde_json::{Value, json};
use tower::ServiceExt;

struct CannedGenerator {
    reply: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}

struct OfflineGenerator;

#[async_trait]
impl Generator for OfflineGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Unreachable("connection refused".into()))
    }
}

fn state_with(generator: Arc<dyn Generator>) -> AppState {
    let mut config = Config::default();
    config.server.static_dir = None;
    AppState::new(config, Store::open_in_memory().unwrap(), generator).unwrap()
}

fn online() -> AppState {
    state_with(Arc::new(CannedGenerator {
        reply: "Nice depth! Keep your chest up.",
        calls: AtomicUsize::new(0),
    }))
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    // rejections from the Json extractor are plain text
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn metrics() -> Value {
    json!({
        "leftKneeAngle": 95.0,
        "rightKneeAngle": 97.5,
        "backAngle": 160.0,
        "hipWidth": 42.0,
        "timestamp": 1_700_000_000_000i64
    })
}

#[tokio::test]
async fn test_health() {
    let app = build_router(online());
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_workout_start_then_end_closes_row() {
    let state = online();
    let app = build_router(state.clone());

    let (status, body) = post(&app, "/workout/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["sessionId"].as_i64().unwrap();

    let (status, body) = post(
        &app,
        "/workout/end",
        json!({"sessionId": session_id, "summary": "Completed squat session"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let session = state.store.lock().await.session(session_id).unwrap().unwrap();
    assert!(session.end_time.is_some());
    assert_eq!(session.summary.as_deref(), Some("Completed squat session"));
}

#[tokio::test]
async fn test_ending_unknown_session_still_succeeds() {
    let app = build_router(online());
    let (status, body) = post(&app, "/workout/end", json!({"sessionId": 999})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_assistant_online_reply() {
    let app = build_router(online());
    let (status, body) = post(
        &app,
        "/assistant",
        json!({
            "message": "how is my form?",
            "context": [{"role": "user", "text": "how is my form?"}],
            "exercise": "squat",
            "workoutActive": true
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Nice depth! Keep your chest up.");
    assert!(body.get("offline_mode").is_none());
}

#[tokio::test]
async fn test_assistant_falls_back_when_model_is_down() {
    let app = build_router(state_with(Arc::new(OfflineGenerator)));
    let (status, body) = post(&app, "/assistant", json!({"message": "Hello coach"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["response"],
        "Hello! Great to see you. Let's get moving! (Offline mode - Ollama unavailable)"
    );
    assert_eq!(body["offline_mode"], true);
}

#[tokio::test]
async fn test_feedback_is_logged() {
    let state = online();
    let app = build_router(state.clone());

    let (status, body) = post(
        &app,
        "/feedback",
        json!({"metrics": metrics(), "exerciseType": "squat", "conversational": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feedback"], "Nice depth! Keep your chest up.");

    let logs = state.store.lock().await.recent_logs(5).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].exercise, "squat");
    assert_eq!(logs[0].feedback, "Nice depth! Keep your chest up.");
    let stored: Value = serde_json::from_str(&logs[0].metrics).unwrap();
    assert_eq!(stored["leftKneeAngle"], 95.0);
}

#[tokio::test]
async fn test_feedback_failure_is_500_and_not_logged() {
    let state = state_with(Arc::new(OfflineGenerator));
    let app = build_router(state.clone());

    let (status, body) = post(
        &app,
        "/feedback",
        json!({"metrics": metrics(), "exerciseType": "squat"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to generate feedback"}));
    assert!(state.store.lock().await.recent_logs(5).unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_feedback_body_is_rejected() {
    let app = build_router(online());
    let (status, _) = post(&app, "/feedback", json!({"exerciseType": "squat"})).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_speech_endpoints_defer_to_browser() {
    let app = build_router(online());
    let (_, body) = post(&app, "/speak", json!({"text": "Go deeper"})).await;
    assert_eq!(body, json!({"text": "Go deeper", "useBrowserTTS": true}));

    let (_, body) = post(&app, "/transcribe", json!({})).await;
    assert_eq!(body["useBrowserSTT"], true);
    assert_eq!(body["message"], "Using browser speech recognition");
}
