//! LLM provider layer: a common chat capability with Claude, Gemini,
//! OpenAI, and Ollama adapters behind a factory.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

pub use provider::{create_client, LlmClient};
pub use types::{LlmConfig, LlmResponse, Message, MessageRole, ProviderType};
