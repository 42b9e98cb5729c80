//! Screenshot descriptions
//!
//! [`Describer`] wraps a [`VisionProvider`] and never fails: every outcome is
//! a [`Description`], turned into document text only when rendered.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;

use crate::event_log::EventType;
use crate::provider::{GenerateRequest, ProviderError, VisionProvider, DEFAULT_TIMEOUT};

pub const NO_SCREENSHOT_TEXT: &str = "No screenshot available.";
pub const UNREACHABLE_TEXT: &str = "Ollama not reachable. Ensure 'ollama serve' is running.";
pub const IMAGE_FAILED_TEXT: &str = "Image processing failed.";

/// Outcome of describing one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    /// Trimmed model output
    Text(String),
    /// No path recorded, or the file is gone
    NoScreenshot,
    /// The file exists but could not be read
    ImageUnreadable(String),
    /// Connection refused or timed out
    Unreachable,
    /// Non-200 answer
    HttpStatus(u16),
    Failed(String),
}

impl Description {
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::NoScreenshot => f.write_str(NO_SCREENSHOT_TEXT),
            Self::ImageUnreadable(_) => f.write_str(IMAGE_FAILED_TEXT),
            Self::Unreachable => f.write_str(UNREACHABLE_TEXT),
            Self::HttpStatus(code) => write!(f, "LLM Error: {}", code),
            Self::Failed(reason) => write!(f, "Error: {}", reason),
        }
    }
}

/// Prompt sent along with the screenshot
pub fn prompt_for(event_type: EventType) -> String {
    format!(
        "Describe the GUI element being interacted with in this image. \
         The user performed: {}. Keep it brief, one sentence.",
        event_type
    )
}

pub struct Describer {
    provider: Arc<dyn VisionProvider>,
    timeout: Duration,
}

impl Describer {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound on one provider call, whatever the provider does itself
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> &dyn VisionProvider {
        self.provider.as_ref()
    }

    pub async fn describe(&self, event_type: EventType, screenshot: Option<&Path>) -> Description {
        let Some(path) = screenshot.filter(|p| p.exists()) else {
            return Description::NoScreenshot;
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read screenshot");
                return Description::ImageUnreadable(e.to_string());
            }
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let request = GenerateRequest::new(prompt_for(event_type)).with_image(encoded);
        let outcome = tokio::time::timeout(self.timeout, self.provider.generate(request)).await;

        match outcome {
            Ok(Ok(text)) => Description::Text(text.trim().to_string()),
            Ok(Err(ProviderError::Unreachable(reason))) => {
                tracing::warn!(provider = self.provider.name(), %reason, "Vision provider unreachable");
                Description::Unreachable
            }
            Ok(Err(ProviderError::Status(code))) => Description::HttpStatus(code),
            Ok(Err(ProviderError::Other(reason))) => {
                tracing::warn!(provider = self.provider.name(), %reason, "Vision provider failed");
                Description::Failed(reason)
            }
            Err(_) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Vision provider timed out"
                );
                Description::Unreachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    fn screenshot(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("screenshot_1.png");
        fs::write(&path, b"\x89PNG fake").unwrap();
        path
    }

    struct SlowProvider;

    #[async_trait]
    impl VisionProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _request: GenerateRequest) -> Result<String, ProviderError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("too late".to_string())
        }
    }

    #[test]
    fn display_texts_are_fixed() {
        assert_eq!(Description::NoScreenshot.to_string(), "No screenshot available.");
        assert_eq!(
            Description::Unreachable.to_string(),
            "Ollama not reachable. Ensure 'ollama serve' is running."
        );
        assert_eq!(
            Description::ImageUnreadable("denied".into()).to_string(),
            "Image processing failed."
        );
        assert_eq!(Description::HttpStatus(500).to_string(), "LLM Error: 500");
        assert_eq!(Description::Failed("boom".into()).to_string(), "Error: boom");
    }

    #[test]
    fn prompt_names_the_action() {
        let prompt = prompt_for(EventType::PressSpecial);
        assert!(prompt.contains("The user performed: press_special."));
        assert!(prompt.ends_with("Keep it brief, one sentence."));
    }

    #[tokio::test]
    async fn no_path_skips_provider() {
        let mock = MockProvider::new();
        let describer = Describer::new(Arc::new(mock.clone()));

        let desc = describer.describe(EventType::Click, None).await;
        assert_eq!(desc, Description::NoScreenshot);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_file_skips_provider() {
        let tmp = TempDir::new().unwrap();
        let mock = MockProvider::new();
        let describer = Describer::new(Arc::new(mock.clone()));

        let gone = tmp.path().join("screenshot_404.png");
        let desc = describer.describe(EventType::Click, Some(&gone)).await;
        assert_eq!(desc, Description::NoScreenshot);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn sends_prompt_and_encoded_image_and_trims() {
        let tmp = TempDir::new().unwrap();
        let path = screenshot(&tmp);
        let mock = MockProvider::new().with_default("  A blue button.\n");
        let describer = Describer::new(Arc::new(mock.clone()));

        let desc = describer.describe(EventType::Click, Some(&path)).await;
        assert_eq!(desc, Description::Text("A blue button.".to_string()));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, prompt_for(EventType::Click));
        let expected = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG fake");
        assert_eq!(requests[0].images, vec![expected]);
    }

    #[tokio::test]
    async fn unreachable_maps_to_fixed_text() {
        let tmp = TempDir::new().unwrap();
        let path = screenshot(&tmp);
        let mock = MockProvider::new().failing(ProviderError::Unreachable("refused".into()));
        let describer = Describer::new(Arc::new(mock));

        let desc = describer.describe(EventType::Click, Some(&path)).await;
        assert_eq!(desc, Description::Unreachable);
    }

    #[tokio::test]
    async fn status_and_other_errors_map_to_diagnostics() {
        let tmp = TempDir::new().unwrap();
        let path = screenshot(&tmp);

        let status = Describer::new(Arc::new(MockProvider::new().failing(ProviderError::Status(404))));
        assert_eq!(
            status.describe(EventType::Click, Some(&path)).await,
            Description::HttpStatus(404)
        );

        let other = Describer::new(Arc::new(
            MockProvider::new().failing(ProviderError::Other("bad json".into())),
        ));
        assert_eq!(
            other.describe(EventType::Click, Some(&path)).await.to_string(),
            "Error: bad json"
        );
    }

    #[tokio::test]
    async fn hung_provider_is_unreachable_after_timeout() {
        let tmp = TempDir::new().unwrap();
        let path = screenshot(&tmp);
        let describer =
            Describer::new(Arc::new(SlowProvider)).with_timeout(Duration::from_millis(50));

        let desc = describer.describe(EventType::PressSpecial, Some(&path)).await;
        assert_eq!(desc, Description::Unreachable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_file_skips_provider() {
        let tmp = TempDir::new().unwrap();
        // A directory exists but cannot be read as a file
        let path = tmp.path().join("screenshot_dir.png");
        fs::create_dir(&path).unwrap();
        let mock = MockProvider::new();
        let describer = Describer::new(Arc::new(mock.clone()));

        let desc = describer.describe(EventType::Click, Some(&path)).await;
        assert!(matches!(desc, Description::ImageUnreadable(_)));
        assert_eq!(desc.to_string(), IMAGE_FAILED_TEXT);
        assert_eq!(mock.call_count(), 0);
    }
}
