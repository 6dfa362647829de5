//! LLM Client Trait
//!
//! Defines the common chat interface all providers implement, plus the
//! factory that constructs a concrete client from configuration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::utils::error::AppResult;

use super::anthropic::ClaudeClient;
use super::gemini::GeminiClient;
use super::ollama::OllamaClient;
use super::openai::OpenAiClient;
use super::types::{LlmConfig, LlmResponse, Message, ProviderType};

/// Chat interface every LLM provider implements.
#[async_trait]
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Send a chat request and return the complete response.
    ///
    /// System messages may be carried out-of-band by providers that
    /// require it; callers just include them in `messages`.
    async fn chat(&self, messages: &[Message]) -> AppResult<LlmResponse>;

    /// Provider name ("claude", "gemini", "openai", "ollama").
    fn provider(&self) -> &'static str;

    /// Model in use.
    fn model(&self) -> &str;

    /// Whether streaming responses are supported.
    fn supports_streaming(&self) -> bool {
        false
    }
}

/// Construct a client for the configured provider.
pub fn create_client(config: LlmConfig) -> AppResult<Arc<dyn LlmClient>> {
    match config.provider {
        ProviderType::Claude => Ok(Arc::new(ClaudeClient::new(config)?)),
        ProviderType::Gemini => Ok(Arc::new(GeminiClient::new(config)?)),
        ProviderType::OpenAI => Ok(Arc::new(OpenAiClient::new(config)?)),
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
    }
}
