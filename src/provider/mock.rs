//! Mock provider for testing
//!
//! Returns configurable responses without touching the network.
//! Clones share state, so a test can keep a handle for assertions.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{GenerateRequest, ProviderError, VisionProvider};

const DEFAULT_RESPONSE: &str = "Mock description.";

/// Mock provider that returns predefined responses
#[derive(Clone)]
pub struct MockProvider {
    /// Queue of responses to return (FIFO)
    responses: Arc<Mutex<VecDeque<String>>>,
    /// Response when the queue is empty
    default_response: String,
    /// When set, every call fails with this error
    failure: Option<ProviderError>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            default_response: DEFAULT_RESPONSE.to_string(),
            failure: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        let provider = Self::new();
        provider.responses.lock().extend(responses);
        provider
    }

    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Fail every call with `error`
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn queue_response(&self, response: impl Into<String>) {
        self.responses.lock().push_back(response.into());
    }

    /// All requests made so far
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
        self.requests.lock().push(request);

        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let next = self.responses.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.default_response.clone()))
    }
}
