//! Context Fetcher
//!
//! Keyword ranking over the project index: given a free-text task,
//! return the most relevant modules, the symbols that matched, and a
//! few project summary fragments, formatted for LLM prompts.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::index::ProjectIndex;
use super::search::SymbolMatch;

/// Weight for an exact symbol-name match.
const WEIGHT_EXACT_NAME: f32 = 5.0;
/// Weight for a keyword appearing inside a symbol name.
const WEIGHT_NAME_SUBSTRING: f32 = 2.0;
/// Weight for a keyword appearing in docs or signatures.
const WEIGHT_TEXT_SUBSTRING: f32 = 1.0;
/// Bonus for one-hop call or import neighbors of a matched module.
const WEIGHT_NEIGHBOR: f32 = 0.5;

/// Function words dropped from task text before matching.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "then", "else", "for", "to", "of", "in", "on",
    "at", "by", "with", "from", "as", "is", "are", "was", "be", "been", "it", "its", "this",
    "that", "these", "those", "do", "does", "did", "can", "could", "should", "would", "will",
    "what", "when", "where", "why", "how", "which", "who", "i", "we", "you", "they", "my",
    "our", "your",
];

/// A module with its relevance score for one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRelevance {
    pub path: String,
    pub score: f32,
}

/// Everything the fetcher found for one task.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskContext {
    pub task: String,
    pub modules: Vec<ModuleRelevance>,
    pub symbols: Vec<SymbolMatch>,
    pub summary: Vec<String>,
}

/// Keyword→relevant-module ranking over a project index.
pub struct ContextFetcher<'a> {
    index: &'a ProjectIndex,
}

impl<'a> ContextFetcher<'a> {
    pub fn new(index: &'a ProjectIndex) -> Self {
        Self { index }
    }

    /// Rank modules for a task and return the top `max_results`.
    pub fn fetch_context(&self, task: &str, max_results: usize) -> TaskContext {
        let keywords = tokenize(task);

        let mut module_scores: HashMap<String, f32> = HashMap::new();
        let mut matched_symbols: Vec<(f32, SymbolMatch)> = Vec::new();
        let mut matched_names: HashSet<String> = HashSet::new();

        for module in self.index.modules.values() {
            let mut score = 0.0f32;
            for symbol in &module.symbols {
                let name_lower = symbol.name.to_lowercase();
                let doc_lower = symbol.doc.to_lowercase();
                let sig_lower = symbol.signature.to_lowercase();

                let mut symbol_score = 0.0f32;
                for keyword in &keywords {
                    if &name_lower == keyword {
                        symbol_score += WEIGHT_EXACT_NAME;
                    } else if name_lower.contains(keyword.as_str()) {
                        symbol_score += WEIGHT_NAME_SUBSTRING;
                    }
                    if doc_lower.contains(keyword.as_str()) {
                        symbol_score += WEIGHT_TEXT_SUBSTRING;
                    }
                    if sig_lower.contains(keyword.as_str()) {
                        symbol_score += WEIGHT_TEXT_SUBSTRING;
                    }
                }

                if symbol_score > 0.0 {
                    score += symbol_score;
                    matched_names.insert(symbol.name.clone());
                    matched_symbols.push((
                        symbol_score,
                        SymbolMatch {
                            name: symbol.name.clone(),
                            kind: symbol.kind,
                            file_path: module.path.clone(),
                            line: symbol.line,
                            signature: symbol.signature.clone(),
                            doc: symbol.doc.clone(),
                        },
                    ));
                }
            }
            if score > 0.0 {
                module_scores.insert(module.path.clone(), score);
            }
        }

        self.apply_neighborhood_bonus(&matched_names, &mut module_scores);

        let mut ranked: Vec<ModuleRelevance> = module_scores
            .into_iter()
            .map(|(path, score)| ModuleRelevance { path, score })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.path.len().cmp(&b.path.len()))
                .then_with(|| a.path.cmp(&b.path))
        });
        ranked.truncate(max_results);

        matched_symbols.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.name.cmp(&b.1.name))
        });
        let symbols: Vec<SymbolMatch> = matched_symbols
            .into_iter()
            .take(max_results)
            .map(|(_, m)| m)
            .collect();

        TaskContext {
            task: task.to_string(),
            modules: ranked,
            symbols,
            summary: self.summary_fragments(),
        }
    }

    /// One-hop bonus: call-graph neighbors of matched symbols and
    /// import neighbors of matched modules.
    fn apply_neighborhood_bonus(
        &self,
        matched_names: &HashSet<String>,
        scores: &mut HashMap<String, f32>,
    ) {
        let mut bonuses: HashMap<String, f32> = HashMap::new();

        for name in matched_names {
            let edges = self.index.call_edges(name);
            for neighbor in edges.callers.iter().chain(edges.callees.iter()) {
                if let Some(entries) = self.index.symbol_table.get(neighbor) {
                    for entry in entries {
                        *bonuses.entry(entry.module_path.clone()).or_default() += WEIGHT_NEIGHBOR;
                    }
                }
            }
        }

        let directly_matched: Vec<String> = scores.keys().cloned().collect();
        for path in &directly_matched {
            let edges = self.index.import_edges(path);
            for neighbor in edges.imports.iter().chain(edges.imported_by.iter()) {
                *bonuses.entry(neighbor.clone()).or_default() += WEIGHT_NEIGHBOR;
            }
        }

        for (path, bonus) in bonuses {
            *scores.entry(path).or_default() += bonus;
        }
    }

    fn summary_fragments(&self) -> Vec<String> {
        let mut languages: Vec<&str> = self
            .index
            .modules
            .values()
            .map(|m| m.language.as_str())
            .collect();
        languages.sort();
        languages.dedup();

        vec![
            format!(
                "{} modules, {} symbols indexed",
                self.index.modules.len(),
                self.index.symbol_count()
            ),
            format!("languages: {}", languages.join(", ")),
        ]
    }
}

/// Lowercase word tokens with punctuation stripped and stopwords dropped.
fn tokenize(task: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    task.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.len() > 1 && !STOPWORDS.contains(w))
        .filter(|w| seen.insert(w.to_string()))
        .map(|w| w.to_string())
        .collect()
}

/// Render a task context as a prompt block.
pub fn format_context(context: &TaskContext) -> String {
    let mut out = String::new();

    out.push_str("RELEVANT MODULES:\n");
    if context.modules.is_empty() {
        out.push_str("  (none matched)\n");
    }
    for module in &context.modules {
        out.push_str(&format!("  - {} (score {:.1})\n", module.path, module.score));
    }

    if !context.symbols.is_empty() {
        out.push_str("\nREFERENCED SYMBOLS:\n");
        for symbol in &context.symbols {
            out.push_str(&format!(
                "  - {} ({}) at {}:{}",
                symbol.name, symbol.kind, symbol.file_path, symbol.line
            ));
            if !symbol.doc.is_empty() {
                out.push_str(&format!(" — {}", symbol.doc));
            }
            out.push('\n');
        }
    }

    if !context.summary.is_empty() {
        out.push_str("\nPROJECT SUMMARY:\n");
        for fragment in &context.summary {
            out.push_str(&format!("  - {}\n", fragment));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::indexer::index::Indexer;
    use std::fs;
    use tempfile::TempDir;

    fn build_index(dir: &TempDir) -> std::sync::Arc<ProjectIndex> {
        fs::write(
            dir.path().join("auth.py"),
            "class AuthService:\n    \"\"\"Validates login tokens.\"\"\"\n\n    def login(self, user):\n        return check(user)\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("billing.py"),
            "def charge(amount):\n    \"\"\"Charge a payment amount.\"\"\"\n    return amount\n",
        )
        .unwrap();
        let mut indexer = Indexer::new();
        indexer.index_project(dir.path()).unwrap()
    }

    #[test]
    fn tokenizer_drops_stopwords_and_punctuation() {
        let tokens = tokenize("How does the login flow handle tokens?");
        assert!(tokens.contains(&"login".to_string()));
        assert!(tokens.contains(&"tokens".to_string()));
        assert!(!tokens.contains(&"the".to_string()));
        assert!(!tokens.contains(&"how".to_string()));
    }

    #[test]
    fn ranks_matching_module_first() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let fetcher = ContextFetcher::new(&index);

        let context = fetcher.fetch_context("fix the login token validation", 5);
        assert!(!context.modules.is_empty());
        assert_eq!(context.modules[0].path, "auth.py");
        assert!(context.modules[0].score > 0.0);
        assert!(context
            .symbols
            .iter()
            .any(|s| s.name == "AuthService.login" || s.name == "AuthService"));
    }

    #[test]
    fn respects_max_results() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let fetcher = ContextFetcher::new(&index);

        let context = fetcher.fetch_context("charge login payment amount", 1);
        assert_eq!(context.modules.len(), 1);
    }

    #[test]
    fn exact_name_outranks_substring() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def charge(x):\n    return x\n").unwrap();
        fs::write(
            dir.path().join("b.py"),
            "def charge_extra(x):\n    return x\n",
        )
        .unwrap();
        let mut indexer = Indexer::new();
        let index = indexer.index_project(dir.path()).unwrap();
        let fetcher = ContextFetcher::new(&index);

        let context = fetcher.fetch_context("charge", 2);
        assert_eq!(context.modules[0].path, "a.py");
    }

    #[test]
    fn format_renders_all_sections() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let fetcher = ContextFetcher::new(&index);

        let context = fetcher.fetch_context("login", 5);
        let rendered = format_context(&context);
        assert!(rendered.contains("RELEVANT MODULES:"));
        assert!(rendered.contains("auth.py"));
        assert!(rendered.contains("PROJECT SUMMARY:"));
    }

    #[test]
    fn summary_mentions_counts_and_languages() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let fetcher = ContextFetcher::new(&index);

        let context = fetcher.fetch_context("anything", 5);
        assert!(context.summary[0].contains("2 modules"));
        assert!(context.summary[1].contains("python"));
    }
}
