//! Request and response bodies for the coach HTTP API.
//!
//! Shared by the axum handlers and the reqwest client so both sides agree on
//! field names.

use serde::{Deserialize, Serialize};

use crate::conversation::Turn;
use crate::pose::FormMetrics;

pub const DEFAULT_EXERCISE: &str = "squat";

fn default_exercise() -> String {
    DEFAULT_EXERCISE.to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// `POST /assistant`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub message: String,
    #[serde(default)]
    pub context: Vec<Turn>,
    #[serde(default = "default_exercise")]
    pub exercise: String,
    #[serde(default)]
    pub workout_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub response: String,
    /// Set when the model server was unreachable and a canned reply was used
    #[serde(default, skip_serializing_if = "is_false")]
    pub offline_mode: bool,
}

/// `POST /feedback`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub metrics: FormMetrics,
    #[serde(default = "default_exercise")]
    pub exercise_type: String,
    #[serde(default)]
    pub conversational: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

/// `POST /workout/start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutStartResponse {
    pub session_id: i64,
}

/// `POST /workout/end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutEndRequest {
    pub session_id: i64,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEndResponse {
    pub success: bool,
}

/// `POST /speak`: speech synthesis stays in the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub text: String,
    #[serde(rename = "useBrowserTTS")]
    pub use_browser_tts: bool,
}

/// `POST /transcribe`: speech recognition stays in the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribeResponse {
    #[serde(rename = "useBrowserSTT")]
    pub use_browser_stt: bool,
    pub message: String,
}
