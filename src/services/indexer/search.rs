//! Symbol Search
//!
//! Query operations over a built project index: symbol lookup by name,
//! documentation search, and call/import graph traversal.

use serde::{Deserialize, Serialize};

use super::index::{ProjectIndex, SymbolKind};

/// One symbol search hit, carrying enough context to display or feed an
/// LLM prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
}

/// Direction selector for graph queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

impl Direction {
    /// Parse CLI-style direction words; anything unknown means both.
    pub fn parse(s: &str) -> Self {
        match s {
            "callers" | "imported_by" | "incoming" => Direction::Incoming,
            "callees" | "imports" | "outgoing" => Direction::Outgoing,
            _ => Direction::Both,
        }
    }
}

/// Search operations over a project index.
pub struct SearchEngine<'a> {
    index: &'a ProjectIndex,
}

impl<'a> SearchEngine<'a> {
    pub fn new(index: &'a ProjectIndex) -> Self {
        Self { index }
    }

    /// Find symbols by name: exact matches first, then case-insensitive
    /// substring matches, each group ordered by name then path.
    pub fn search_symbol(&self, query: &str) -> Vec<SymbolMatch> {
        let query_lower = query.to_lowercase();
        let mut exact = Vec::new();
        let mut partial = Vec::new();

        for (name, entries) in &self.index.symbol_table {
            if name == query {
                for entry in entries {
                    exact.push(to_match(entry.module_path.clone(), entry));
                }
            } else if name.to_lowercase().contains(&query_lower) {
                for entry in entries {
                    partial.push(to_match(entry.module_path.clone(), entry));
                }
            }
        }

        sort_matches(&mut exact);
        sort_matches(&mut partial);
        exact.extend(partial);
        exact
    }

    /// Find symbols whose documentation mentions the query.
    pub fn search_documentation(&self, query: &str) -> Vec<SymbolMatch> {
        let query_lower = query.to_lowercase();
        let mut hits = Vec::new();

        for module in self.index.modules.values() {
            for symbol in &module.symbols {
                if symbol.doc.to_lowercase().contains(&query_lower) {
                    hits.push(SymbolMatch {
                        name: symbol.name.clone(),
                        kind: symbol.kind,
                        file_path: module.path.clone(),
                        line: symbol.line,
                        signature: symbol.signature.clone(),
                        doc: symbol.doc.clone(),
                    });
                }
            }
        }

        sort_matches(&mut hits);
        hits
    }

    /// Callers and/or callees of a function or method name.
    pub fn search_by_call_graph(&self, name: &str, direction: Direction) -> Vec<String> {
        let edges = self.index.call_edges(name);
        let mut out = Vec::new();
        if matches!(direction, Direction::Incoming | Direction::Both) {
            out.extend(edges.callers);
        }
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            out.extend(edges.callees);
        }
        out.sort();
        out.dedup();
        out
    }

    /// Modules a module imports and/or is imported by. Accepts a module
    /// path or a bare stem (`util` matches `util.py`).
    pub fn search_imports(&self, module: &str, direction: Direction) -> Vec<String> {
        let path = self.resolve_module(module);
        let Some(path) = path else { return Vec::new() };

        let edges = self.index.import_edges(&path);
        let mut out = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            out.extend(edges.imports);
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            out.extend(edges.imported_by);
        }
        out.sort();
        out.dedup();
        out
    }

    /// Full details for the first exact match of a symbol name.
    pub fn get_symbol_details(&self, name: &str) -> Option<SymbolMatch> {
        let entries = self.index.symbol_table.get(name)?;
        let mut matches: Vec<SymbolMatch> = entries
            .iter()
            .map(|e| to_match(e.module_path.clone(), e))
            .collect();
        sort_matches(&mut matches);
        matches.into_iter().next()
    }

    fn resolve_module(&self, module: &str) -> Option<String> {
        if self.index.modules.contains_key(module) {
            return Some(module.to_string());
        }
        let mut candidates: Vec<&String> = self
            .index
            .modules
            .keys()
            .filter(|path| {
                let stem = path
                    .rsplit('/')
                    .next()
                    .and_then(|f| f.split('.').next())
                    .unwrap_or_default();
                stem == module
            })
            .collect();
        candidates.sort();
        candidates.first().map(|p| (*p).clone())
    }
}

fn to_match(module_path: String, entry: &super::index::SymbolEntry) -> SymbolMatch {
    SymbolMatch {
        name: entry.symbol.name.clone(),
        kind: entry.symbol.kind,
        file_path: module_path,
        line: entry.symbol.line,
        signature: entry.symbol.signature.clone(),
        doc: entry.symbol.doc.clone(),
    }
}

fn sort_matches(matches: &mut [SymbolMatch]) {
    matches.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.line.cmp(&b.line))
    });
}

/// Render one search hit for terminal or prompt output.
pub fn format_search_result(result: &SymbolMatch) -> String {
    let mut out = format!(
        "{} ({}) — {}:{}",
        result.name, result.kind, result.file_path, result.line
    );
    if !result.signature.is_empty() {
        out.push_str(&format!("\n  {}", result.signature));
    }
    if !result.doc.is_empty() {
        out.push_str(&format!("\n  {}", result.doc));
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
            dir.path().join("calc.go"),
            "package calc\n\n// Add returns the sum of two ints.\nfunc Add(a, b int) int {\n\treturn a + b\n}\n\n// Sum folds Add over a slice.\nfunc Sum(xs []int) int {\n\ttotal := 0\n\tfor _, x := range xs {\n\t\ttotal = Add(total, x)\n\t}\n\treturn total\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("store.py"),
            "import calc\n\nclass Store:\n    \"\"\"Persists totals.\"\"\"\n\n    def save(self, n):\n        return n\n",
        )
        .unwrap();

        let mut indexer = Indexer::new();
        indexer.index_project(dir.path()).unwrap()
    }

    #[test]
    fn exact_match_precedes_substring() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let engine = SearchEngine::new(&index);

        let results = engine.search_symbol("Add");
        assert!(!results.is_empty());
        assert_eq!(results[0].name, "Add");
        assert_eq!(results[0].file_path, "calc.go");
    }

    #[test]
    fn substring_search_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let engine = SearchEngine::new(&index);

        let results = engine.search_symbol("sto");
        assert!(results.iter().any(|r| r.name == "Store"));
    }

    #[test]
    fn documentation_search() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let engine = SearchEngine::new(&index);

        let results = engine.search_documentation("sum of two");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Add");
    }

    #[test]
    fn call_graph_directions() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let engine = SearchEngine::new(&index);

        assert_eq!(
            engine.search_by_call_graph("Add", Direction::Incoming),
            vec!["Sum".to_string()]
        );
        assert_eq!(
            engine.search_by_call_graph("Sum", Direction::Outgoing),
            vec!["Add".to_string()]
        );
        assert!(engine
            .search_by_call_graph("Missing", Direction::Both)
            .is_empty());
    }

    #[test]
    fn import_search_accepts_stem() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let engine = SearchEngine::new(&index);

        let imports = engine.search_imports("store", Direction::Outgoing);
        assert_eq!(imports, vec!["calc.go".to_string()]);

        let imported_by = engine.search_imports("calc.go", Direction::Incoming);
        assert_eq!(imported_by, vec!["store.py".to_string()]);
    }

    #[test]
    fn symbol_details_and_formatting() {
        let dir = TempDir::new().unwrap();
        let index = build_index(&dir);
        let engine = SearchEngine::new(&index);

        let details = engine.get_symbol_details("Add").unwrap();
        let formatted = format_search_result(&details);
        assert!(formatted.contains("Add (function)"));
        assert!(formatted.contains("calc.go"));
        assert!(formatted.contains("sum of two ints"));

        assert!(engine.get_symbol_details("Nope").is_none());
    }
}
