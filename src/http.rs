//! HTTP transport for the coach server.
//!
//! Axum router with the JSON endpoints the browser client talks to. Static
//! assets are served for any path the API does not claim.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::clients::{Generator, OllamaClient};
use crate::config::Config;
use crate::error::Result;
use crate::fallback::FallbackRules;
use crate::prompts::PromptRegistry;
use crate::schemas::{
    AssistantRequest, AssistantResponse, FeedbackRequest, FeedbackResponse, SpeakRequest,
    SpeakResponse, TranscribeResponse, WorkoutEndRequest, WorkoutEndResponse,
    WorkoutStartResponse,
};
use crate::storage::Store;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Mutex<Store>>,
    pub generator: Arc<dyn Generator>,
    pub prompts: Arc<PromptRegistry>,
    pub fallback: Arc<FallbackRules>,
}

impl AppState {
    pub fn new(config: Config, store: Store, generator: Arc<dyn Generator>) -> Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
            generator,
            prompts: Arc::new(PromptRegistry::new()),
            fallback: Arc::new(FallbackRules::new()?),
        })
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Free-form question. Falls back to canned replies when the model is down.
pub async fn assistant_handler(
    State(state): State<AppState>,
    Json(req): Json<AssistantRequest>,
) -> Result<Json<AssistantResponse>> {
    let prompt =
        state
            .prompts
            .assistant_prompt(&req.message, &req.context, &req.exercise, req.workout_active)?;

    match state.generator.generate(&prompt).await {
        Ok(response) => Ok(Json(AssistantResponse {
            response,
            offline_mode: false,
        })),
        Err(e) => {
            warn!(generator = state.generator.name(), "assistant generation failed: {}", e);
            Ok(Json(AssistantResponse {
                response: state.fallback.offline_reply(&req.message),
                offline_mode: true,
            }))
        }
    }
}

/// Form feedback for one metrics snapshot; the result is logged
pub async fn feedback_handler(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Response> {
    let prompt =
        state
            .prompts
            .feedback_prompt(&req.metrics, &req.exercise_type, req.conversational)?;

    let feedback = match state.generator.generate(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!(generator = state.generator.name(), "feedback generation failed: {}", e);
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to generate feedback"})),
            )
                .into_response());
        }
    };

    let metrics_json = serde_json::to_string(&req.metrics)?;
    // a lost log line should not cost the user their feedback
    if let Err(e) = state
        .store
        .lock()
        .await
        .log_feedback(&req.exercise_type, &metrics_json, &feedback)
    {
        warn!("failed to log feedback: {}", e);
    }

    Ok(Json(FeedbackResponse { feedback }).into_response())
}

pub async fn workout_start_handler(
    State(state): State<AppState>,
) -> Result<Json<WorkoutStartResponse>> {
    let session_id = state.store.lock().await.start_session()?;
    info!(session_id, "workout session started");
    Ok(Json(WorkoutStartResponse { session_id }))
}

pub async fn workout_end_handler(
    State(state): State<AppState>,
    Json(req): Json<WorkoutEndRequest>,
) -> Result<Json<WorkoutEndResponse>> {
    let changed = state
        .store
        .lock()
        .await
        .end_session(req.session_id, req.summary.as_deref())?;
    if changed {
        info!(session_id = req.session_id, "workout session ended");
    } else {
        warn!(session_id = req.session_id, "end requested for unknown workout session");
    }
    Ok(Json(WorkoutEndResponse { success: true }))
}

/// Synthesis happens in the browser; echo the text back with the flag set
pub async fn speak_handler(Json(req): Json<SpeakRequest>) -> Json<SpeakResponse> {
    Json(SpeakResponse {
        text: req.text,
        use_browser_tts: true,
    })
}

pub async fn transcribe_handler() -> Json<TranscribeResponse> {
    Json(TranscribeResponse {
        use_browser_stt: true,
        message: "Using browser speech recognition".to_string(),
    })
}

pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_millis(state.config.server.request_timeout_ms);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/assistant", post(assistant_handler))
        .route("/feedback", post(feedback_handler))
        .route("/workout/start", post(workout_start_handler))
        .route("/workout/end", post(workout_end_handler))
        .route("/speak", post(speak_handler))
        .route("/transcribe", post(transcribe_handler));

    if let Some(dir) = state.config.server.static_dir.as_deref() {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(TimeoutLayer::new(timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open storage, connect the model client and serve until Ctrl-C
pub async fn start_http_server(config: Config) -> Result<()> {
    let store = Store::open(&config.storage.database_path)?;
    let generator: Arc<dyn Generator> = Arc::new(OllamaClient::new(&config.model));
    let bind = config.server.bind;
    info!(
        "Using model {} at {}",
        config.model.model, config.model.endpoint
    );

    let state = AppState::new(config, store, generator)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    info!("Server running on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
