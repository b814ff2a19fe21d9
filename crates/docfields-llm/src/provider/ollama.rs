//! Local models served by Ollama.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LlmProvider, http_client, non_empty, read_json};
use crate::{LlmConfig, Result};

/// Provider for Ollama's non-streaming `/api/chat`.
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            endpoint: format!("{}/api/chat", config.endpoint()),
            model: config.model_name().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
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
            stream: false,
            options: Options {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        debug!(url = %self.endpoint, model = %self.model, "sending ollama chat");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let reply: ChatResponse = read_json(response).await?;
        non_empty(reply.message.map(|m| m.content).unwrap_or_default())
    }
}
