//! Source Parsers
//!
//! The `SourceParser` capability extracts a module (symbols, imports,
//! call references) from one source file. Concrete parsers are
//! tree-sitter based and live behind a registry keyed by file extension;
//! unregistered extensions are ignored by the structural indexer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::utils::error::AppResult;

use super::index::Module;

/// Language-specific source → symbol extraction.
pub trait SourceParser: Send + Sync {
    /// Language tag recorded on produced modules (e.g. "go", "python").
    fn language(&self) -> &'static str;

    /// File extensions (without dot) this parser claims.
    fn extensions(&self) -> &'static [&'static str];

    /// Parse a file into a module. `rel_path` is relative to the
    /// project root with `/` separators.
    fn parse(&self, rel_path: &str, content: &str) -> AppResult<Module>;
}

/// Registry mapping file extensions to parsers.
#[derive(Default, Clone)]
pub struct ParserRegistry {
    by_extension: HashMap<String, Arc<dyn SourceParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Arc<dyn SourceParser>) {
        for ext in parser.extensions() {
            self.by_extension.insert(ext.to_string(), parser.clone());
        }
    }

    pub fn for_extension(&self, ext: &str) -> Option<&Arc<dyn SourceParser>> {
        self.by_extension.get(&ext.to_lowercase())
    }

    pub fn registered_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.by_extension.keys().cloned().collect();
        exts.sort();
        exts
    }
}

// ---------------------------------------------------------------------------
// Shared tree-sitter helpers
// ---------------------------------------------------------------------------

/// Text content of a node.
pub(crate) fn node_text(node: tree_sitter::Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}

/// Text of a named child field, if present and non-empty.
pub(crate) fn field_text(
    node: tree_sitter::Node,
    field: &str,
    source: &str,
) -> Option<String> {
    let child = node.child_by_field_name(field)?;
    let text = node_text(child, source);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// The trimmed text of a 1-based source line.
pub(crate) fn line_text(lines: &[&str], line_number: usize) -> String {
    if line_number == 0 || line_number > lines.len() {
        return String::new();
    }
    lines[line_number - 1].trim().to_string()
}

/// Collect callee names from every call expression under `node`.
///
/// `call_kind` is the language's call node kind; `function_field` names
/// the callee child. Selector calls record their full dotted text.
pub(crate) fn collect_calls(
    node: tree_sitter::Node,
    source: &str,
    call_kind: &str,
    function_field: &str,
    out: &mut Vec<String>,
) {
    if node.kind() == call_kind {
        if let Some(callee) = node.child_by_field_name(function_field) {
            let text = node_text(callee, source);
            if !text.is_empty() && !out.contains(&text) {
                out.push(text);
            }
        }
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_calls(child, source, call_kind, function_field, out);
        }
    }
}
