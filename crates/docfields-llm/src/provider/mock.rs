//! Offline provider returning a canned reply.

use async_trait::async_trait;

use super::LlmProvider;
use crate::Result;

/// Provider that never touches the network.
///
/// With a configured reply it returns that reply verbatim; otherwise it
/// echoes the start of the prompt, which is never valid JSON.
pub struct MockProvider {
    response: Option<String>,
}

impl MockProvider {
    pub fn new(response: Option<String>) -> Self {
        Self { response }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(match &self.response {
            Some(response) => response.clone(),
            None => {
                let head: String = prompt.chars().take(60).collect();
                format!("[Mock Response] {head}...")
            }
        })
    }
}
