//! Engine services: structural indexing, semantic RAG, hybrid
//! retrieval, LLM providers, and the autonomous agent.

pub mod agent;
pub mod indexer;
pub mod llm;
pub mod rag;
pub mod retrieval;
