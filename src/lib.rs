//! codescout — code-aware retrieval and planning engine
//!
//! Given a natural-language task and a project directory, codescout
//! returns the code locations most relevant to that task and can plan
//! and execute coding tasks autonomously. Retrieval is hybrid: a
//! structural symbol/module index with call and import graphs, fused
//! with a semantic index of embedded code chunks, under a query
//! classifier and a token-budgeted result merger.

pub mod models;
pub mod services;
pub mod utils;

pub use models::action::{Action, ActionResult, TaskExecution};
pub use models::task::{Task, TaskBreakdown, TaskStatus};
pub use services::agent::{CodingAgent, Executor, ExecutorConfig, RunOptions, TaskManager};
pub use services::indexer::{
    ContextFetcher, Indexer, ProjectIndex, SearchEngine, Summarizer, SymbolKind,
};
pub use services::llm::{create_client, LlmClient, LlmConfig, ProviderType};
pub use services::rag::{
    Embedder, HybridResult, OllamaEmbedder, RagIndexer, SqliteVectorStore, VectorStore,
};
pub use services::retrieval::{QueryAnalyzer, QueryType, ResultMerger};
pub use utils::error::{AppError, AppResult};
