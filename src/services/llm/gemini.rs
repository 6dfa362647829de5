//! Gemini Client
//!
//! Google Gemini generateContent adapter. System messages become the
//! request's `systemInstruction`; assistant turns map to the "model"
//! role.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

use super::provider::LlmClient;
use super::types::{LlmConfig, LlmResponse, Message, MessageRole};

const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::validation("Gemini API key is required"))?;

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
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: GeminiUsage,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
    #[serde(rename = "finishReason", default)]
    finish_reason: String,
}

#[derive(Deserialize, Default)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: usize,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat(&self, messages: &[Message]) -> AppResult<LlmResponse> {
        let mut system_instruction: Option<GeminiContent> = None;
        let mut contents = Vec::new();

        for msg in messages {
            if msg.role == MessageRole::System {
                system_instruction = Some(GeminiContent {
                    role: None,
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                });
            } else {
                let role = match msg.role {
                    MessageRole::Assistant => "model",
                    _ => "user",
                };
                contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                });
            }
        }

        let request = GeminiRequest {
            contents,
            system_instruction,
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external(format!("gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::external(format!("failed to read gemini response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::external(format!(
                "gemini API request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::parse(format!("failed to decode gemini response: {}", e)))?;

        let (content, finish_reason) = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                let text = c
                    .content
                    .parts
                    .into_iter()
                    .next()
                    .map(|p| p.text)
                    .unwrap_or_default();
                (text, c.finish_reason)
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            provider: "gemini".to_string(),
            model: self.model.clone(),
            tokens_used: parsed.usage_metadata.total_token_count,
            finish_reason,
        })
    }

    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
