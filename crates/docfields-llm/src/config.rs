//! Provider configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Supported language-model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI or any OpenAI-compatible chat completions endpoint.
    #[serde(alias = "open_ai")]
    OpenAi,
    /// Google Gemini.
    #[serde(alias = "google")]
    Gemini,
    /// Local Ollama server.
    Ollama,
    /// Canned responses, no network.
    Mock,
}

impl ProviderKind {
    /// Model used when the configuration leaves `model` empty.
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::Ollama => "llama3.1",
            ProviderKind::Mock => "mock-model",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    pub fn default_api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::Ollama | ProviderKind::Mock => None,
        }
    }

    /// Base URL used when the configuration does not override it.
    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::Mock => "",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Mock => write!(f, "mock"),
        }
    }
}

/// Language-model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ask the model at all. When false the structurer contributes nothing.
    pub enabled: bool,

    /// Which provider to talk to.
    pub provider: ProviderKind,

    /// Model name (empty = provider default).
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Override for the provider endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Override for the API key environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Reply returned by the mock provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_response: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: ProviderKind::Ollama,
            model: String::new(),
            temperature: 0.1,
            max_tokens: None,
            base_url: None,
            api_key_env: None,
            timeout_secs: 30,
            mock_response: None,
        }
    }
}

impl LlmConfig {
    /// Configuration for the mock provider with a fixed reply.
    pub fn mock(response: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Mock,
            mock_response: Some(response.into()),
            ..Self::default()
        }
    }

    /// Effective model name.
    pub fn model_name(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            self.model.trim()
        }
    }

    /// Effective endpoint without a trailing slash.
    pub fn endpoint(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Effective API key variable name, if any.
    pub fn api_key_var(&self) -> Option<String> {
        self.api_key_env
            .clone()
            .or_else(|| self.provider.default_api_key_env().map(str::to_string))
    }

    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LlmConfig::default();
        assert!(config.enabled);
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(config.model_name(), "llama3.1");
        assert_eq!(config.endpoint(), "http://localhost:11434");
        assert_eq!(config.api_key_var(), None);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_provider_names() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        let kind: ProviderKind = serde_json::from_str("\"google\"").unwrap();
        assert_eq!(kind, ProviderKind::Gemini);
        assert_eq!(serde_json::to_string(&ProviderKind::Mock).unwrap(), "\"mock\"");
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }

    #[test]
    fn test_overrides() {
        let config = LlmConfig {
            provider: ProviderKind::OpenAi,
            model: " gpt-4o ".to_string(),
            base_url: Some("http://proxy.local/v1/".to_string()),
            api_key_env: Some("PROXY_KEY".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(config.model_name(), "gpt-4o");
        assert_eq!(config.endpoint(), "http://proxy.local/v1");
        assert_eq!(config.api_key_var(), Some("PROXY_KEY".to_string()));
    }

    #[test]
    fn test_partial_json() {
        let config: LlmConfig =
            serde_json::from_str(r#"{"provider": "gemini", "timeout_secs": 5}"#).unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.model_name(), "gemini-1.5-flash");
        assert_eq!(config.api_key_var(), Some("GEMINI_API_KEY".to_string()));
        assert_eq!(config.timeout_secs, 5);
        assert!(config.enabled);
    }
}
