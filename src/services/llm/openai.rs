//! OpenAI Client
//!
//! Chat completions adapter. System messages stay inline; OpenAI
//! accepts them as ordinary turns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

use super::provider::LlmClient;
use super::types::{LlmConfig, LlmResponse, Message};

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::validation("OpenAI API key is required"))?;

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
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    #[serde(default)]
    finish_reason: String,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    total_tokens: usize,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, messages: &[Message]) -> AppResult<LlmResponse> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external(format!("openai request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external(format!("failed to read openai response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::external(format!(
                "openai API request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: OpenAiResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::parse(format!("failed to decode openai response: {}", e)))?;

        let (content, finish_reason) = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| (c.message.content, c.finish_reason))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            provider: "openai".to_string(),
            model: if parsed.model.is_empty() {
                self.model.clone()
            } else {
                parsed.model
            },
            tokens_used: parsed.usage.total_tokens,
            finish_reason,
        })
    }

    fn provider(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_api_key() {
        let err = OpenAiClient::new(LlmConfig::new(super::super::types::ProviderType::OpenAI))
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn response_parsing() {
        let body = r#"{
            "id": "cmpl-1", "object": "chat.completion", "created": 1,
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "done"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 8, "completion_tokens": 2, "total_tokens": 10}
        }"#;
        let parsed: OpenAiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "done");
        assert_eq!(parsed.usage.total_tokens, 10);
    }
}
