//! Google Gemini `generateContent`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LlmProvider, api_key, http_client, non_empty, read_json};
use crate::{LlmConfig, LlmError, Result};

/// Provider for the Gemini REST API.
pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ReplyContent>,
}

#[derive(Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
    /// Create a provider; fails when the API key variable is unset.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config.model_name().to_string();
        Ok(Self {
            client: http_client(config)?,
            endpoint: format!("{}/models/{}:generateContent", config.endpoint(), model),
            api_key: api_key(config)?,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

/// Multi-part replies are joined line by line.
fn reply_text(response: GenerateResponse) -> Result<String> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or(LlmError::EmptyResponse)?
        .parts;

    let text = parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("\n");
    non_empty(text)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        debug!(url = %self.endpoint, model = %self.model, "sending generateContent");
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        reply_text(read_json(response).await?)
    }
}
