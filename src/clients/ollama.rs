use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{GenerationError, Generator};
use crate::config::ModelConfig;

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
    stop: &'a [String],
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for a local Ollama server's `/api/generate` endpoint
#[derive(Clone, Debug)]
pub struct OllamaClient {
    url: String,
    config: ModelConfig,
    client: Client,
}

impl OllamaClient {
    pub fn new(config: &ModelConfig) -> Self {
        let url = if config.endpoint.ends_with("/api/generate") {
            config.endpoint.clone()
        } else {
            format!("{}/api/generate", config.endpoint.trim_end_matches('/'))
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();

        Self {
            url,
            config: config.clone(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.max_tokens,
                stop: &self.config.stop,
            },
        }
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(model = %self.config.model, prompt_len = prompt.len(), "ollama generate");

        let res = self
            .client
            .post(&self.url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        timeout_ms: self.config.timeout_ms,
                    }
                } else {
                    GenerationError::Unreachable(e.to_string())
                }
            })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let parsed: GenerateResponse = res
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_gets_generate_path() {
        let mut config = ModelConfig::default();
        config.endpoint = "http://localhost:11434/".into();
        assert_eq!(
            OllamaClient::new(&config).url(),
            "http://localhost:11434/api/generate"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let client = OllamaClient::new(&ModelConfig::default());
        let body = serde_json::to_value(client.request_body("hello")).unwrap();
        assert_eq!(body["model"], "llama3.2:3b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 150);
        assert_eq!(body["options"]["stop"][1], "User:");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let mut config = ModelConfig::default();
        // reserved port, nothing listens there
        config.endpoint = "http://127.0.0.1:9".into();
        config.timeout_ms = 500;
        let err = OllamaClient::new(&config).generate("hi").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Unreachable(_) | GenerationError::Timeout { .. }
        ));
    }
}
