//! reqwest client for the coach server, used by the coaching runtime.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::cadence::CoachBackend;
use crate::error::{CoachError, Result};
use crate::schemas::{
    AssistantRequest, AssistantResponse, FeedbackRequest, FeedbackResponse, WorkoutEndRequest,
    WorkoutEndResponse, WorkoutStartResponse,
};

#[derive(Clone, Debug)]
pub struct CoachClient {
    base_url: String,
    client: Client,
}

impl CoachClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "coach request");
        let res = self.client.post(&url).json(body).send().await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(CoachError::Generation {
                message: format!("{} returned {}: {}", path, status, text),
            });
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl CoachBackend for CoachClient {
    async fn feedback(&self, request: &FeedbackRequest) -> Result<String> {
        let res: FeedbackResponse = self.post("/feedback", request).await?;
        Ok(res.feedback)
    }

    async fn ask(&self, request: &AssistantRequest) -> Result<AssistantResponse> {
        self.post("/assistant", request).await
    }

    async fn start_workout(&self) -> Result<i64> {
        let res: WorkoutStartResponse = self.post("/workout/start", &serde_json::json!({})).await?;
        Ok(res.session_id)
    }

    async fn end_workout(&self, session_id: i64, summary: &str) -> Result<()> {
        let body = WorkoutEndRequest {
            session_id,
            summary: Some(summary.to_string()),
        };
        let res: WorkoutEndResponse = self.post("/workout/end", &body).await?;
        if !res.success {
            return Err(CoachError::Internal {
                message: format!("server refused to close session {}", session_id),
            });
        }
        Ok(())
    }
}
