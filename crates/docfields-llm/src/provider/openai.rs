//! OpenAI-compatible chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LlmProvider, api_key, http_client, non_empty, read_json};
use crate::{LlmConfig, LlmError, Result};

/// Provider for `/chat/completions` endpoints.
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider; fails when the API key variable is unset.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            endpoint: format!("{}/chat/completions", config.endpoint()),
            api_key: api_key(config)?,
            model: config.model_name().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

fn reply_text(response: ChatResponse) -> Result<String> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(LlmError::EmptyResponse)?;
    non_empty(text)
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(url = %self.endpoint, model = %self.model, "sending chat completion");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        reply_text(read_json(response).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" {\"total\": \"12.00\"} "}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(reply_text(response).unwrap(), r#"{"total": "12.00"}"#);
    }

    #[test]
    fn test_reply_without_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(reply_text(response), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.1,
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }
}
