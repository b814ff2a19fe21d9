//! Language-model provider layer for docfields.
//!
//! This crate provides a unified interface for asking a chat model for a
//! completion across different providers:
//! - OpenAI-compatible chat completions
//! - Google Gemini `generateContent`
//! - Ollama `/api/chat` for local models
//! - a mock provider for offline runs and tests
//!
//! The provider is chosen once from [`LlmConfig`] via [`create_provider`].

mod config;
mod error;
mod provider;

pub use config::{LlmConfig, ProviderKind};
pub use error::LlmError;
pub use provider::{LlmProvider, create_provider};
pub use provider::gemini::GeminiProvider;
pub use provider::mock::MockProvider;
pub use provider::ollama::OllamaProvider;
pub use provider::openai::OpenAiProvider;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, LlmError>;
