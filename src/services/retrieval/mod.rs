//! Hybrid retrieval: query classification, result fusion, and the
//! combined query path.

pub mod hybrid;
pub mod merger;
pub mod query_analyzer;

pub use hybrid::{fetch_hybrid_context, format_hybrid_result};
pub use merger::{ResultMerger, DEFAULT_TOKEN_BUDGET};
pub use query_analyzer::{QueryAnalyzer, QueryType};
