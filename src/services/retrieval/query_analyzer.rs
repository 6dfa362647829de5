//! Query Analyzer
//!
//! Deterministic classifier deciding which retrieval side serves a
//! query: the structural index (exact symbols, paths, call-graph
//! phrases), the semantic RAG index (concepts and behavior), or both.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How to retrieve context for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Indexer only (exact symbols)
    Structural,
    /// RAG only (conceptual)
    Semantic,
    /// Both sides
    Hybrid,
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryType::Structural => write!(f, "structural"),
            QueryType::Semantic => write!(f, "semantic"),
            QueryType::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Capitalized English words that are not symbol names.
const COMMON_WORDS: &[&str] = &[
    "I", "A", "The", "This", "That", "What", "How", "Where", "Why",
];

/// Phrases indicating conceptual queries.
const CONCEPT_WORDS: &[&str] = &["how", "where", "why", "find", "search", "explain", "show me"];

/// Phrases indicating behavior queries.
const BEHAVIOR_WORDS: &[&str] = &[
    "handle", "process", "validate", "check", "manage", "create", "update", "delete",
];

/// Phrases indicating call-graph queries.
const CALL_GRAPH_WORDS: &[&str] = &[
    "calls",
    "called by",
    "uses",
    "used by",
    "depends on",
    "imports",
];

/// Code-file extensions recognized in file-path detection.
const PATH_EXTENSIONS: &[&str] = &[
    ".go", ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".c", ".cpp", ".h", ".hpp", ".rs",
    ".rb", ".php", ".cs", ".swift", ".kt", ".scala",
];

/// Determines which retrieval method to use for a query.
pub struct QueryAnalyzer {
    symbol_pattern: Regex,
}

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self {
            // PascalCase / camelCase fragments
            symbol_pattern: Regex::new(r"[A-Z][a-zA-Z0-9]*").expect("valid symbol regex"),
        }
    }

    /// Classify a query as structural, semantic, or hybrid.
    ///
    /// Symbol detection runs against the original query (case carries
    /// the signal); phrase checks run against the lowercased form.
    pub fn classify(&self, query: &str) -> QueryType {
        let lower = query.to_lowercase();

        let has_symbol = self.has_symbols(query);
        let has_file_path =
            lower.contains('/') || PATH_EXTENSIONS.iter().any(|ext| lower.contains(ext));
        let has_call_graph = contains_any(&lower, CALL_GRAPH_WORDS);

        let has_concept = contains_any(&lower, CONCEPT_WORDS);
        let has_behavior = contains_any(&lower, BEHAVIOR_WORDS);

        if (has_symbol || has_file_path || has_call_graph) && !has_concept && !has_behavior {
            return QueryType::Structural;
        }

        if (has_concept || has_behavior) && !has_symbol && !has_file_path {
            return QueryType::Semantic;
        }

        QueryType::Hybrid
    }

    fn has_symbols(&self, query: &str) -> bool {
        self.symbol_pattern
            .find_iter(query)
            .map(|m| m.as_str())
            .any(|token| token.len() > 1 && !COMMON_WORDS.contains(&token))
    }
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}
