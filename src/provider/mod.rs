//! # Vision Provider Layer
//!
//! Trait and implementations for the remote description capability.
//!
//! - [`VisionProvider`] - core trait: prompt (+ images) in, text out
//! - [`OllamaProvider`] - `POST {base}/api/generate` against a local Ollama
//! - [`MockProvider`] - configurable responses, failure simulation, request capture
//!
//! Providers report failures as a [`ProviderError`]; turning those into
//! document text is the job of [`crate::describe::Describer`].
//!
//! ```rust
//! use stepdoc::config::StepdocConfig;
//! use stepdoc::provider::create_provider;
//!
//! let config = StepdocConfig::default();
//! assert!(create_provider("ollama", &config).is_ok());
//! assert!(create_provider("mock", &config).is_ok());
//! assert!(create_provider("invalid", &config).is_err());
//! ```

mod mock;
mod ollama;

pub use mock::MockProvider;
pub use ollama::{OllamaProvider, DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_TIMEOUT};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StepdocConfig;
use crate::error::{Result, StepdocError};

/// Why a provider call produced no text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Connection refused or the bounded wait expired
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    /// Anything but 200
    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Other(String),
}

/// One generation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Base64-encoded images
    pub images: Vec<String>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, base64: impl Into<String>) -> Self {
        self.images.push(base64.into());
        self
    }
}

/// Remote (or fake) text generation with optional image input
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name ("ollama", "mock")
    fn name(&self) -> &str;

    /// Model the provider asks for
    fn model(&self) -> &str;

    /// Generate text for `request`. Implementations must bound their own wait.
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<String, ProviderError>;
}

/// Create a provider by name
///
/// | Name | Description |
/// |------|-------------|
/// | `ollama` | Local Ollama server at `config.ollama_url` |
/// | `mock` | Always answers `config.model`-independent canned text |
pub fn create_provider(name: &str, config: &StepdocConfig) -> Result<Arc<dyn VisionProvider>> {
    match name.to_lowercase().as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            &config.ollama_url,
            config.model.clone(),
            config.timeout(),
        )?)),
        "mock" => Ok(Arc::new(MockProvider::new())),
        _ => Err(StepdocError::UnknownProvider {
            name: name.to_string(),
        }),
    }
}
