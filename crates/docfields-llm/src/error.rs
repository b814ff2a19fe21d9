//! Error types for the provider layer.

use thiserror::Error;

/// Errors that can occur while talking to a language model.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level failure (connect, TLS, body decode).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Server { status: u16, body: String },

    /// The API key environment variable is missing or empty.
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),

    /// The provider answered but the reply carried no text.
    #[error("provider returned no text")]
    EmptyResponse,

    /// Invalid provider configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
