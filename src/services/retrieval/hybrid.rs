//! Hybrid Retrieval
//!
//! The full query path: classify the query, run the structural and/or
//! semantic side accordingly, and fuse the results under a token
//! budget.

use tracing::debug;

use crate::services::indexer::context::ContextFetcher;
use crate::services::indexer::index::ProjectIndex;
use crate::services::rag::index_manager::RagIndexer;
use crate::services::rag::types::{HybridResult, SearchResult};
use crate::utils::error::AppResult;

use super::merger::ResultMerger;
use super::query_analyzer::{QueryAnalyzer, QueryType};

/// Classify `query` and retrieve context from the sides its class
/// selects, merged under `token_budget`.
pub async fn fetch_hybrid_context(
    index: &ProjectIndex,
    rag_indexer: &RagIndexer,
    query: &str,
    max_results: usize,
    token_budget: usize,
) -> AppResult<HybridResult> {
    let query_type = QueryAnalyzer::new().classify(query);
    debug!(query, %query_type, "classified query");

    let structural_files: Vec<String> = match query_type {
        QueryType::Structural | QueryType::Hybrid => {
            let fetcher = ContextFetcher::new(index);
            let context = fetcher.fetch_context(query, max_results);
            context.modules.into_iter().map(|m| m.path).collect()
        }
        QueryType::Semantic => Vec::new(),
    };

    let rag_results: Vec<SearchResult> = match query_type {
        QueryType::Semantic | QueryType::Hybrid => rag_indexer.search(query, max_results).await?,
        QueryType::Structural => Vec::new(),
    };

    let mut result = ResultMerger::new(token_budget).merge(&rag_results, &structural_files);
    result.query_type = query_type.to_string();
    Ok(result)
}

/// Render a hybrid result for terminal or prompt output.
pub fn format_hybrid_result(result: &HybridResult, max_results: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== Hybrid Search Results ({}) — {} files ===\n\n",
        result.query_type,
        result.files.len()
    ));
    out.push_str(&format!(
        "Sources: {} from indexer, {} from RAG\n\n",
        result.sources.indexer, result.sources.rag
    ));

    for (i, file) in result.files.iter().take(max_results).enumerate() {
        out.push_str(&format!(
            "{}. {} (Relevance: {:.2}, Source: {})\n",
            i + 1,
            file.path,
            file.relevance,
            file.source
        ));
        if !file.highlights.is_empty() {
            out.push_str("   Relevant sections:\n");
            for highlight in &file.highlights {
                out.push_str(&format!("   - Lines {}-{}\n", highlight.start, highlight.end));
            }
        }
        if !file.chunks.is_empty() {
            out.push_str(&format!(
                "   Found {} relevant code segments\n",
                file.chunks.len()
            ));
        }
        out.push('\n');
    }

    out.push_str(&format!("\nTotal tokens: {}\n", result.total_tokens));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indexer::index::Indexer;
    use crate::services::rag::embedder::Embedder;
    use crate::services::rag::vector_store::SqliteVectorStore;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
            let mut v = vec![0.0f32; 2];
            if text.to_lowercase().contains("login") {
                v[0] = 1.0;
            } else {
                v[1] = 1.0;
            }
            Ok(v)
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "axis"
        }
    }

    async fn setup(dir: &TempDir) -> (Arc<crate::services::indexer::index::ProjectIndex>, RagIndexer)
    {
        fs::write(
            dir.path().join("auth.py"),
            "class LoginHandler:\n    \"\"\"Validates login requests.\"\"\"\n\n    def login(self, user):\n        return user\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("billing.py"),
            "def charge(amount):\n    return amount\n",
        )
        .unwrap();

        let mut indexer = Indexer::new();
        let index = indexer.index_project(dir.path()).unwrap();

        let store = Arc::new(SqliteVectorStore::new_in_memory(2).unwrap());
        let mut rag = RagIndexer::new(Arc::new(AxisEmbedder), store);
        rag.index_project(dir.path()).await.unwrap();

        (index, rag)
    }

    #[tokio::test]
    async fn structural_query_skips_rag() {
        let dir = TempDir::new().unwrap();
        let (index, rag) = setup(&dir).await;

        let result = fetch_hybrid_context(&index, &rag, "LoginHandler", 5, 50_000)
            .await
            .unwrap();
        assert_eq!(result.query_type, "structural");
        assert_eq!(result.sources.rag, 0);
        assert!(result.files.iter().any(|f| f.path == "auth.py"));
        assert!(result.files.iter().all(|f| f.source == "indexer"));
    }

    #[tokio::test]
    async fn semantic_query_skips_structural() {
        let dir = TempDir::new().unwrap();
        let (index, rag) = setup(&dir).await;

        let result = fetch_hybrid_context(&index, &rag, "explain how we validate sessions", 5, 50_000)
            .await
            .unwrap();
        assert_eq!(result.query_type, "semantic");
        assert_eq!(result.sources.indexer, 0);
        assert!(!result.files.is_empty());
    }

    #[tokio::test]
    async fn hybrid_query_runs_both_sides() {
        let dir = TempDir::new().unwrap();
        let (index, rag) = setup(&dir).await;

        let result = fetch_hybrid_context(&index, &rag, "how does LoginHandler validate login", 5, 50_000)
            .await
            .unwrap();
        assert_eq!(result.query_type, "hybrid");
        assert!(result.files.iter().any(|f| f.path == "auth.py"));
        // auth.py is found by both sides and carries the boost.
        let auth = result.files.iter().find(|f| f.path == "auth.py").unwrap();
        assert_eq!(auth.source, "both");
    }

    #[tokio::test]
    async fn formatting_includes_sources_and_tokens() {
        let dir = TempDir::new().unwrap();
        let (index, rag) = setup(&dir).await;

        let result = fetch_hybrid_context(&index, &rag, "how does LoginHandler validate login", 5, 50_000)
            .await
            .unwrap();
        let rendered = format_hybrid_result(&result, 5);
        assert!(rendered.contains("Hybrid Search Results (hybrid)"));
        assert!(rendered.contains("Sources:"));
        assert!(rendered.contains("Total tokens:"));
        assert!(rendered.contains("auth.py"));
    }
}
