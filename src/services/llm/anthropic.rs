//! Claude Client
//!
//! Anthropic Messages API adapter. System messages travel out-of-band
//! in the request's `system` field.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

use super::provider::LlmClient;
use super::types::{LlmConfig, LlmResponse, Message, MessageRole};

const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug)]
pub struct ClaudeClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl ClaudeClient {
    pub fn new(config: LlmConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::validation("Claude API key is required"))?;

        Ok(Self {
            api_key,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: reqwest::Client::new(),
        })
    }
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    messages: Vec<ClaudeMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ClaudeUsage,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: usize,
    #[serde(default)]
    output_tokens: usize,
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn chat(&self, messages: &[Message]) -> AppResult<LlmResponse> {
        let mut system_prompt: Option<&str> = None;
        let mut chat_messages = Vec::new();

        for msg in messages {
            if msg.role == MessageRole::System {
                system_prompt = Some(&msg.content);
            } else {
                chat_messages.push(ClaudeMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                });
            }
        }

        let request = ClaudeRequest {
            model: &self.model,
            messages: chat_messages,
            max_tokens: MAX_TOKENS,
            system: system_prompt,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external(format!("claude request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external(format!("failed to read claude response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::external(format!(
                "claude API request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: ClaudeResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::parse(format!("failed to decode claude response: {}", e)))?;

        let content = parsed
            .content
            .first()
            .map(|c| c.text.clone())
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            provider: "claude".to_string(),
            model: if parsed.model.is_empty() {
                self.model.clone()
            } else {
                parsed.model
            },
            tokens_used: parsed.usage.input_tokens + parsed.usage.output_tokens,
            finish_reason: parsed.stop_reason.unwrap_or_default(),
        })
    }

    fn provider(&self) -> &'static str {
        "claude"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
