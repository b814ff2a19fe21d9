//! Provider implementations.

pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{LlmConfig, LlmError, ProviderKind, Result};

/// Trait for language-model providers.
///
/// This trait abstracts over the different chat APIs so the structurer can
/// ask for a completion without knowing which service answers it. A provider
/// is built once from configuration and shared across requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name as used in configuration.
    fn name(&self) -> &str;

    /// Model the provider talks to.
    fn model(&self) -> &str;

    /// Send a single-turn prompt and return the reply text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the provider selected by `config`.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>> {
    debug!(provider = %config.provider, model = config.model_name(), "creating LLM provider");

    let provider: Box<dyn LlmProvider> = match config.provider {
        ProviderKind::OpenAi => Box::new(openai::OpenAiProvider::new(config)?),
        ProviderKind::Gemini => Box::new(gemini::GeminiProvider::new(config)?),
        ProviderKind::Ollama => Box::new(ollama::OllamaProvider::new(config)?),
        ProviderKind::Mock => Box::new(mock::MockProvider::new(config.mock_response.clone())),
    };

    Ok(provider)
}

pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    if config.timeout_secs == 0 {
        return Err(LlmError::Config("timeout_secs must be positive".to_string()));
    }

    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(LlmError::Http)
}

pub(crate) fn api_key(config: &LlmConfig) -> Result<String> {
    let var = config
        .api_key_var()
        .ok_or_else(|| LlmError::Config(format!("{} needs an API key variable", config.provider)))?;

    match std::env::var(&var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(LlmError::MissingApiKey(var)),
    }
}

/// Check the status and decode a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Server {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.json().await?)
}

pub(crate) fn non_empty(text: String) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        Err(LlmError::EmptyResponse)
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&LlmConfig::mock("{}")).unwrap();
        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.model(), "mock-model");
    }

    #[test]
    fn test_missing_api_key() {
        let config = LlmConfig {
            provider: ProviderKind::OpenAi,
            api_key_env: Some("DOCFIELDS_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..LlmConfig::default()
        };

        match create_provider(&config) {
            Err(LlmError::MissingApiKey(var)) => {
                assert_eq!(var, "DOCFIELDS_TEST_KEY_THAT_IS_NEVER_SET")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("provider created without a key"),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = LlmConfig {
            timeout_secs: 0,
            ..LlmConfig::default()
        };
        assert!(matches!(create_provider(&config), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  {}\n".to_string()).unwrap(), "{}");
        assert!(matches!(non_empty("   ".to_string()), Err(LlmError::EmptyResponse)));
    }
}
