//! RAG Types
//!
//! Chunks, search results, and index statistics for the semantic side of
//! hybrid retrieval.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A syntactic code segment prepared for embedding.
///
/// The identifier is deterministic in the content: the first 16 hex
/// characters of the SHA-256 of the chunk text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub file_path: String,
    /// 1-based, inclusive
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
    /// function, method, type, struct, interface, class, block
    pub chunk_type: String,
    /// Named symbol when present; split parts carry a `_partN` suffix
    #[serde(default)]
    pub symbol_name: String,
    pub language: String,
    pub content: String,
    pub token_count: usize,
    /// Full content hash, used for change detection
    pub hash: String,
}

impl Chunk {
    /// Create a chunk with auto-generated id, hash, and token estimate.
    pub fn new(
        file_path: impl Into<String>,
        content: impl Into<String>,
        chunk_type: impl Into<String>,
        symbol_name: impl Into<String>,
        language: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        let content = content.into();
        let hash = compute_hash(&content);
        Self {
            id: hash[..16].to_string(),
            file_path: file_path.into(),
            start_line,
            end_line,
            chunk_type: chunk_type.into(),
            symbol_name: symbol_name.into(),
            language: language.into(),
            token_count: estimate_tokens(&content),
            content,
            hash,
        }
    }
}

/// Result of a semantic vector search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Cosine similarity; higher is better
    pub score: f32,
    /// "rag" for vector hits; the merger widens this to "both"
    pub source: String,
}

/// Line range used for highlighting within a file result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// Per-file relevance unit produced by the result merger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub path: String,
    pub relevance: f32,
    /// "rag", "indexer", or "both"
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<LineRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<Chunk>,
}

/// Count of entries newly introduced by each retrieval side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SourceCounts {
    pub indexer: usize,
    pub rag: usize,
}

/// Fused output of structural and semantic retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HybridResult {
    pub files: Vec<FileResult>,
    pub total_tokens: usize,
    /// "structural", "semantic", or "hybrid"
    pub query_type: String,
    pub sources: SourceCounts,
}

/// Statistics for a RAG index run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexStats {
    pub total_files: usize,
    pub total_chunks: usize,
    pub embedding_model: String,
    pub dimensions: usize,
    /// RFC 3339 timestamp of the last completed run
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_updated: String,
}

/// SHA-256 of the content, hex-encoded.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Rough token estimate: ~4 characters per token, never less than 1.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() / 4).max(1)
}
