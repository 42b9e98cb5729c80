//! Ollama provider for local vision models
//!
//! `POST {base}/api/generate` with `stream: false`. The whole request is
//! bounded by the client timeout; expiry counts as unreachable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{GenerateRequest, ProviderError, VisionProvider};
use crate::error::{Result, StepdocError};

/// Default Ollama API endpoint
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Default vision model
pub const DEFAULT_MODEL: &str = "llava";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaProvider {
    /// Build a provider for `base_url`; fails on a non-http(s) URL
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| StepdocError::InvalidConfig {
            field: "ollama_url".to_string(),
            reason: format!("'{}': {}", base_url, e),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StepdocError::InvalidConfig {
                field: "ollama_url".to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StepdocError::InvalidConfig {
                field: "timeout_secs".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl VisionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> std::result::Result<String, ProviderError> {
        let payload = GeneratePayload {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            images: &request.images,
        };

        tracing::debug!(
            provider = "ollama",
            endpoint = %self.endpoint,
            model = %self.model,
            images = request.images.len(),
            "Sending generate request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(provider = "ollama", status = %status, "Ollama returned an error status");
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response.json().await.map_err(classify)?;
        Ok(body.response.unwrap_or_default())
    }
}

fn classify(err: reqwest::Error) -> ProviderError {
    if err.is_connect() || err.is_timeout() {
        ProviderError::Unreachable(err.to_string())
    } else {
        ProviderError::Other(err.to_string())
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct GeneratePayload<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    images: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_without_double_slash() {
        let provider = OllamaProvider::new("http://gpu-box:11434/", "llava", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(provider.endpoint(), "http://gpu-box:11434/api/generate");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = OllamaProvider::new("ftp://host", "llava", DEFAULT_TIMEOUT)
            .err()
            .unwrap();
        assert!(matches!(err, StepdocError::InvalidConfig { .. }));
    }

    #[test]
    fn payload_omits_empty_images() {
        let images: Vec<String> = vec![];
        let payload = GeneratePayload {
            model: "llava",
            prompt: "hi",
            stream: false,
            images: &images,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, serde_json::json!({"model": "llava", "prompt": "hi", "stream": false}));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        // Bind then drop to get a port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let provider = OllamaProvider::new(
            &format!("http://127.0.0.1:{}", port),
            "llava",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = provider.generate(GenerateRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unreachable(_)));
    }
}
