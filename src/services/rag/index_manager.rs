//! RAG Indexer
//!
//! Lifecycle driver for the semantic index: walk the project tree,
//! chunk each recognized code file, embed chunk contents in batches,
//! and upsert into the vector store. Per-file failures are logged and
//! skipped so a single unreadable file never aborts a run.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use ignore::WalkBuilder;
use tracing::{info, warn};

use crate::utils::error::{AppError, AppResult};

use super::chunker::{chunker_for, Chunker};
use super::embedder::Embedder;
use super::types::{Chunk, IndexStats, SearchResult};
use super::vector_store::VectorStore;

/// Number of chunks embedded per batch.
const EMBED_BATCH_SIZE: usize = 10;

/// Directories that are always skipped, regardless of ignore rules.
const ALWAYS_SKIPPED: &[&str] = &[".git", ".index"];

/// File extensions picked up for semantic indexing.
const CODE_EXTENSIONS: &[&str] = &[
    "go", "py", "js", "ts", "jsx", "tsx", "java", "c", "cpp", "h", "hpp", "rs", "rb", "php",
    "cs", "swift", "kt", "scala",
];

/// Whether a file extension belongs to the recognized code-file set.
pub fn is_code_extension(ext: &str) -> bool {
    CODE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Walk a project root honoring its `.gitignore`, always skipping `.git`
/// and `.index`, returning relative paths of recognized code files in
/// lexical order.
pub fn collect_code_files(root: &Path) -> Vec<String> {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .require_git(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !ALWAYS_SKIPPED.contains(&name.as_ref())
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !is_code_extension(ext) {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(root) {
            files.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    files.sort();
    files
}

/// Manages the RAG indexing lifecycle over an embedder and vector store.
pub struct RagIndexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    stats: IndexStats,
}

impl RagIndexer {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        let stats = IndexStats {
            embedding_model: embedder.model_id().to_string(),
            dimensions: embedder.dimension(),
            ..Default::default()
        };
        Self {
            embedder,
            store,
            stats,
        }
    }

    /// Index all code files under `root`.
    ///
    /// The store is cleared first so every run starts fresh (incremental
    /// re-indexing is out of scope).
    pub async fn index_project(&mut self, root: &Path) -> AppResult<()> {
        info!(project = %root.display(), "indexing project");

        self.store
            .clear()
            .map_err(|e| AppError::external(format!("failed to clear vector store: {}", e)))?;

        let files = collect_code_files(root);
        info!(count = files.len(), "found code files");

        let mut total_chunks = 0usize;
        for (i, rel_path) in files.iter().enumerate() {
            if i % 10 == 0 && !files.is_empty() {
                info!(
                    done = i,
                    total = files.len(),
                    "indexing progress {:.1}%",
                    (i as f64 / files.len() as f64) * 100.0
                );
            }

            match self.index_file(root, rel_path).await {
                Ok(chunks) => total_chunks += chunks.len(),
                Err(e) => {
                    warn!(file = rel_path.as_str(), error = %e, "failed to index file");
                    continue;
                }
            }
        }

        self.stats.total_files = files.len();
        self.stats.total_chunks = total_chunks;
        self.stats.last_updated = Utc::now().to_rfc3339();

        info!(
            files = files.len(),
            chunks = total_chunks,
            "semantic index complete"
        );
        Ok(())
    }

    /// Chunk, embed, and store a single file (path relative to root).
    ///
    /// An embedding or insertion failure aborts this file only.
    pub async fn index_file(&self, root: &Path, rel_path: &str) -> AppResult<Vec<Chunk>> {
        let content = std::fs::read_to_string(root.join(rel_path))?;

        let chunker = chunker_for(rel_path);
        let chunks = chunker.chunk_file(rel_path, &content);
        if chunks.is_empty() {
            return Ok(chunks);
        }

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            self.store.insert_batch(batch, &embeddings)?;
        }

        Ok(chunks)
    }

    /// Remove a file's chunks from the index.
    pub fn remove_file(&self, rel_path: &str) -> AppResult<usize> {
        self.store.delete(rel_path)
    }

    /// Semantic search: embed the query, scan the store.
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<SearchResult>> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| AppError::external(format!("failed to embed query: {}", e)))?;
        self.store.search(&query_embedding, top_k)
    }

    /// Current statistics; chunk count reflects the live store.
    pub fn stats(&mut self) -> AppResult<IndexStats> {
        self.stats.total_chunks = self.store.count()?;
        Ok(self.stats.clone())
    }

    /// Drop the whole index.
    pub fn clear(&self) -> AppResult<()> {
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rag::vector_store::SqliteVectorStore;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    /// Keyword-sensitive embedder: axis 0 for content mentioning "Add",
    /// axis 1 otherwise.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
            let mut v = vec![0.0f32; 4];
            if text.contains("Add") {
                v[0] = 1.0;
            } else {
                v[1] = 1.0;
            }
            Ok(v)
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_id(&self) -> &str {
            "keyword-test"
        }
    }

    fn write_project(dir: &TempDir) {
        fs::write(
            dir.path().join("math.go"),
            "package math\n\n// Add returns the sum.\nfunc Add(a, b int) int {\n\treturn a + b\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("cache.py"),
            "class Cache:\n    def get(self, k):\n        return self.d.get(k)\n",
        )
        .unwrap();
    }

    #[test]
    fn collects_code_files_in_lexical_order() {
        let dir = TempDir::new().unwrap();
        write_project(&dir);
        fs::write(dir.path().join("notes.md"), "# notes").unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config.go"), "x").unwrap();
        fs::create_dir_all(dir.path().join(".index")).unwrap();
        fs::write(dir.path().join(".index/cached.go"), "x").unwrap();

        let files = collect_code_files(dir.path());
        assert_eq!(files, vec!["cache.py".to_string(), "math.go".to_string()]);
    }

    #[test]
    fn honors_root_gitignore() {
        let dir = TempDir::new().unwrap();
        write_project(&dir);
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/dep.go"), "package dep").unwrap();
        fs::write(dir.path().join(".gitignore"), "vendor/\n").unwrap();

        let files = collect_code_files(dir.path());
        assert!(!files.iter().any(|f| f.starts_with("vendor/")), "{:?}", files);
    }

    #[tokio::test]
    async fn index_then_search_finds_the_right_file() {
        let dir = TempDir::new().unwrap();
        write_project(&dir);

        let store = Arc::new(SqliteVectorStore::new_in_memory(4).unwrap());
        let mut indexer = RagIndexer::new(Arc::new(KeywordEmbedder), store);
        indexer.index_project(dir.path()).await.unwrap();

        let stats = indexer.stats().unwrap();
        assert_eq!(stats.total_files, 2);
        assert!(stats.total_chunks >= 2);
        assert_eq!(stats.embedding_model, "keyword-test");
        assert_eq!(stats.dimensions, 4);
        assert!(!stats.last_updated.is_empty());

        let results = indexer.search("Add two numbers", 3).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.file_path, "math.go");
        assert!(results[0].score >= 0.99);
    }

    #[tokio::test]
    async fn reindex_clears_previous_chunks() {
        let dir = TempDir::new().unwrap();
        write_project(&dir);

        let store = Arc::new(SqliteVectorStore::new_in_memory(4).unwrap());
        let mut indexer = RagIndexer::new(Arc::new(KeywordEmbedder), store.clone());
        indexer.index_project(dir.path()).await.unwrap();
        let first = store.count().unwrap();

        indexer.index_project(dir.path()).await.unwrap();
        assert_eq!(store.count().unwrap(), first, "rerun must not duplicate");
    }

    #[tokio::test]
    async fn remove_file_deletes_its_chunks() {
        let dir = TempDir::new().unwrap();
        write_project(&dir);

        let store = Arc::new(SqliteVectorStore::new_in_memory(4).unwrap());
        let mut indexer = RagIndexer::new(Arc::new(KeywordEmbedder), store.clone());
        indexer.index_project(dir.path()).await.unwrap();

        let removed = indexer.remove_file("math.go").unwrap();
        assert!(removed >= 1);
        let results = indexer.search("Add", 5).await.unwrap();
        assert!(results.iter().all(|r| r.chunk.file_path != "math.go"));
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_project(&dir);
        // Invalid UTF-8 payload with a code extension.
        fs::write(dir.path().join("bin.rs"), [0xFFu8, 0xFE, 0x00, 0x9f]).unwrap();

        let store = Arc::new(SqliteVectorStore::new_in_memory(4).unwrap());
        let mut indexer = RagIndexer::new(Arc::new(KeywordEmbedder), store);
        indexer.index_project(dir.path()).await.unwrap();

        let results = indexer.search("Add", 5).await.unwrap();
        assert!(!results.is_empty(), "good files still indexed");
    }
}
