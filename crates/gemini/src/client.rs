//! Streaming client for the Gemini REST API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use world_core::{ChunkStream, GenerationBackend, GenerationError, GenerationRequest, WorldConfig};

use crate::sse::chunk_stream;
use crate::wire::{ErrorWrapper, GenerateContentRequest};

/// Consulted when the configured variable is unset.
const FALLBACK_KEY_ENV: &str = "GEMINI_API_KEY";

pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GeminiClient {
    /// A missing `api_key` is not an error here; every call fails instead.
    pub fn new(api_key: Option<String>, config: &WorldConfig) -> Result<Self> {
        let mut builder =
            Client::builder().connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if config.read_timeout_secs > 0 {
            builder = builder.read_timeout(Duration::from_secs(config.read_timeout_secs));
        }
        let client = builder
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            api_key_env: config.api_key_env.clone(),
        })
    }

    /// Reads the API key from the environment variable named in `config`.
    pub fn from_config(config: &WorldConfig) -> Result<Self> {
        Self::new(read_api_key(&config.api_key_env), config)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:streamGenerateContent?alt=sse", self.api_base)
    }
}

fn read_api_key(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .or_else(|| std::env::var(FALLBACK_KEY_ENV).ok())
        .filter(|key| !key.trim().is_empty())
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<ChunkStream, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::MissingApiKey(self.api_key_env.clone()))?;

        let url = self.endpoint(&request.model);
        let body = GenerateContentRequest::user_text(request.prompt);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GenerationError::Transport(format!("Gemini API request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        debug!(model = %request.model, %status, "Gemini stream opened");
        Ok(chunk_stream(response.bytes_stream().boxed()))
    }
}

fn map_http_error(status: StatusCode, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| wrapper.error.describe())
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    GenerationError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = WorldConfig {
            api_base: "http://localhost:9000/v1beta/".to_string(),
            ..WorldConfig::default()
        };
        let client = GeminiClient::new(Some("k".into()), &config).unwrap();
        assert_eq!(
            client.endpoint("gemini-3-flash-preview"),
            "http://localhost:9000/v1beta/models/gemini-3-flash-preview:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let client = GeminiClient::new(Some("   ".into()), &WorldConfig::default()).unwrap();
        assert!(!client.has_api_key());
    }

    #[test]
    fn test_map_http_error_prefers_json_body() {
        let err = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(
            err,
            GenerationError::Api {
                status: 400,
                message: "INVALID_ARGUMENT: API key not valid".to_string()
            }
        );
    }

    #[test]
    fn test_map_http_error_falls_back_to_raw_body() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(
            err,
            GenerationError::Api {
                status: 502,
                message: "upstream down".to_string()
            }
        );
    }
}
