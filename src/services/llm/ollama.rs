//! Ollama Client
//!
//! Local model adapter over Ollama's `/api/chat` endpoint. No API key;
//! token counts are not reported in non-streaming mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

use super::provider::LlmClient;
use super::types::{LlmConfig, LlmResponse, Message};

const DEFAULT_MODEL: &str = "llama3.3";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug)]
pub struct OllamaClient {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: LlmConfig) -> AppResult<Self> {
        Ok(Self {
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: reqwest::Client::new(),
        })
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    message: OllamaResponseMessage,
}

#[derive(Deserialize, Default)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, messages: &[Message]) -> AppResult<LlmResponse> {
        let request = OllamaRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AppError::external(format!(
                        "cannot connect to Ollama at {}: is the server running?",
                        self.base_url
                    ))
                } else {
                    AppError::external(format!("ollama request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external(format!("failed to read ollama response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::external(format!(
                "ollama API request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: OllamaResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::parse(format!("failed to decode ollama response: {}", e)))?;

        Ok(LlmResponse {
            content: parsed.message.content,
            provider: "ollama".to_string(),
            model: if parsed.model.is_empty() {
                self.model.clone()
            } else {
                parsed.model
            },
            tokens_used: 0,
            finish_reason: "stop".to_string(),
        })
    }

    fn provider(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
