//! Result Merger
//!
//! Fuses RAG search results with structural module paths into a single
//! ranked file list under a token budget. Co-occurring files are
//! boosted multiplicatively; scores may exceed 1.0 and are left
//! unnormalized because only the ordering is contractual.

use std::collections::HashMap;

use crate::services::rag::types::{FileResult, HybridResult, LineRange, SearchResult};

/// Default token budget for merged results.
pub const DEFAULT_TOKEN_BUDGET: usize = 50_000;

/// Token estimate for a file result that carries no chunks.
const DEFAULT_FILE_TOKENS: usize = 500;

/// Relevance boost when a file re-appears in the RAG results.
const RAG_REMATCH_BOOST: f32 = 1.2;

/// Relevance boost when a file appears in both sources.
const BOTH_SOURCES_BOOST: f32 = 1.3;

/// Prior relevance for a structural-only (exact symbol) match.
const INDEXER_PRIOR: f32 = 0.9;

/// Combines and ranks results from both retrieval sides.
pub struct ResultMerger {
    max_tokens: usize,
}

impl ResultMerger {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// Merge RAG results and structural module paths into a ranked,
    /// budget-truncated hybrid result.
    pub fn merge(&self, rag_results: &[SearchResult], indexer_files: &[String]) -> HybridResult {
        let mut result = HybridResult::default();

        // Insertion-ordered map of path → file result.
        let mut order: Vec<String> = Vec::new();
        let mut file_map: HashMap<String, FileResult> = HashMap::new();

        for res in rag_results {
            let path = res.chunk.file_path.clone();
            match file_map.get_mut(&path) {
                Some(existing) => {
                    existing.relevance = existing.relevance.max(res.score) * RAG_REMATCH_BOOST;
                    existing.source = "both".to_string();
                    existing.highlights.push(LineRange {
                        start: res.chunk.start_line,
                        end: res.chunk.end_line,
                    });
                    existing.chunks.push(res.chunk.clone());
                }
                None => {
                    file_map.insert(
                        path.clone(),
                        FileResult {
                            path: path.clone(),
                            relevance: res.score,
                            source: "rag".to_string(),
                            highlights: vec![LineRange {
                                start: res.chunk.start_line,
                                end: res.chunk.end_line,
                            }],
                            chunks: vec![res.chunk.clone()],
                        },
                    );
                    order.push(path);
                    result.sources.rag += 1;
                }
            }
        }

        for path in indexer_files {
            match file_map.get_mut(path) {
                Some(existing) => {
                    existing.relevance *= BOTH_SOURCES_BOOST;
                    existing.source = "both".to_string();
                }
                None => {
                    file_map.insert(
                        path.clone(),
                        FileResult {
                            path: path.clone(),
                            relevance: INDEXER_PRIOR,
                            source: "indexer".to_string(),
                            highlights: Vec::new(),
                            chunks: Vec::new(),
                        },
                    );
                    order.push(path.clone());
                    result.sources.indexer += 1;
                }
            }
        }

        // Relevance descending; insertion order breaks ties.
        let mut files: Vec<FileResult> = order
            .into_iter()
            .filter_map(|path| file_map.remove(&path))
            .collect();
        files.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        result.files = files;
        self.truncate_to_budget(&mut result);
        result
    }

    /// Greedily accept files while the running token total stays within
    /// budget; a chunk-less file costs the default estimate.
    fn truncate_to_budget(&self, result: &mut HybridResult) {
        let mut total_tokens = 0usize;
        let mut kept = Vec::new();

        for file in result.files.drain(..) {
            let mut file_tokens: usize = file.chunks.iter().map(|c| c.token_count).sum();
            if file_tokens == 0 {
                file_tokens = DEFAULT_FILE_TOKENS;
            }

            if total_tokens + file_tokens > self.max_tokens {
                break;
            }
            total_tokens += file_tokens;
            kept.push(file);
        }

        result.files = kept;
        result.total_tokens = total_tokens;
    }
}

impl Default for ResultMerger {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BUDGET)
    }
}
