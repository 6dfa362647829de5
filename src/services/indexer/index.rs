//! Project Index
//!
//! The in-memory structural graph of a project: modules, symbols, and
//! the derived call and import graphs. Graphs are name → edge tables on
//! the root aggregate, so relation cycles never create ownership cycles.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::services::rag::index_manager::collect_code_files;
use crate::utils::error::AppResult;

use super::go::GoParser;
use super::parser::{ParserRegistry, SourceParser};
use super::python::PythonParser;

/// Kind of a named declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Struct,
    Interface,
    Constant,
    Variable,
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Type => "type",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
        };
        write!(f, "{}", s)
    }
}

/// A named declaration within a module.
///
/// Methods carry their receiver type and a `Receiver.Method` name, so
/// the symbol table distinguishes `get` on different types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub doc: String,
    /// 1-based starting line
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Outgoing call references (callee names as written)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<String>,
}

impl Symbol {
    /// Stable identity: `module.path + "#" + name`.
    pub fn identity(&self, module_path: &str) -> String {
        format!("{}#{}", module_path, self.name)
    }
}

/// A source file and its declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Path relative to the project root, `/`-separated
    pub path: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<Symbol>,
    /// Import targets as written in the source
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
}

/// A symbol table entry locating a symbol in its module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub module_path: String,
    pub symbol: Symbol,
}

/// Callers and callees of one symbol name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallEdges {
    pub callers: Vec<String>,
    pub callees: Vec<String>,
}

/// Import relations of one module path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportEdges {
    pub imports: Vec<String>,
    pub imported_by: Vec<String>,
}

/// Root aggregate: path → module plus the derived graphs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectIndex {
    pub root: String,
    pub modules: HashMap<String, Module>,
    /// name → every location declaring that name
    pub symbol_table: HashMap<String, Vec<SymbolEntry>>,
    /// Every declared symbol name has an entry, even with no edges
    pub call_graph: HashMap<String, CallEdges>,
    pub import_graph: HashMap<String, ImportEdges>,
    /// Callee names that resolve to no symbol table entry
    pub unresolved_calls: Vec<String>,
    /// Import targets that resolve to no known module
    pub external_imports: Vec<String>,
}

impl ProjectIndex {
    /// Call edges for a symbol name; empty edges when unknown.
    pub fn call_edges(&self, name: &str) -> CallEdges {
        self.call_graph.get(name).cloned().unwrap_or_default()
    }

    /// Import edges for a module path; empty when unknown.
    pub fn import_edges(&self, path: &str) -> ImportEdges {
        self.import_graph.get(path).cloned().unwrap_or_default()
    }

    pub fn symbol_count(&self) -> usize {
        self.modules.values().map(|m| m.symbols.len()).sum()
    }
}

/// Builds and caches project indexes.
///
/// Single-threaded by design; multi-threaded callers wrap it themselves.
pub struct Indexer {
    registry: ParserRegistry,
    cache: HashMap<PathBuf, Arc<ProjectIndex>>,
    cache_enabled: bool,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer {
    /// Indexer with the Go and Python parsers registered.
    pub fn new() -> Self {
        let mut registry = ParserRegistry::new();
        registry.register(Arc::new(GoParser::new()));
        registry.register(Arc::new(PythonParser::new()));
        Self {
            registry,
            cache: HashMap::new(),
            cache_enabled: true,
        }
    }

    /// Empty indexer; callers register parsers explicitly.
    pub fn bare() -> Self {
        Self {
            registry: ParserRegistry::new(),
            cache: HashMap::new(),
            cache_enabled: true,
        }
    }

    pub fn register_parser(&mut self, parser: Arc<dyn SourceParser>) {
        self.registry.register(parser);
    }

    /// When disabled, every call re-walks the project.
    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
        if !enabled {
            self.cache.clear();
        }
    }

    /// Build (or return the cached) index for a project root.
    pub fn index_project(&mut self, root: &Path) -> AppResult<Arc<ProjectIndex>> {
        let key = root.to_path_buf();
        if self.cache_enabled {
            if let Some(cached) = self.cache.get(&key) {
                debug!(project = %root.display(), "returning cached project index");
                return Ok(cached.clone());
            }
        }

        let mut index = ProjectIndex {
            root: root.to_string_lossy().to_string(),
            ..Default::default()
        };

        for rel_path in collect_code_files(root) {
            let ext = rel_path.rsplit('.').next().unwrap_or_default();
            let Some(parser) = self.registry.for_extension(ext) else {
                continue;
            };

            let content = match std::fs::read_to_string(root.join(&rel_path)) {
                Ok(c) => c,
                Err(e) => {
                    warn!(file = rel_path.as_str(), error = %e, "failed to read file");
                    continue;
                }
            };

            match parser.parse(&rel_path, &content) {
                Ok(module) => {
                    index.modules.insert(rel_path, module);
                }
                Err(e) => {
                    warn!(file = rel_path.as_str(), error = %e, "failed to parse file");
                }
            }
        }

        build_symbol_table(&mut index);
        build_call_graph(&mut index);
        build_import_graph(&mut index);

        let index = Arc::new(index);
        if self.cache_enabled {
            self.cache.insert(key, index.clone());
        }
        Ok(index)
    }
}

fn build_symbol_table(index: &mut ProjectIndex) {
    let mut table: HashMap<String, Vec<SymbolEntry>> = HashMap::new();
    for module in index.modules.values() {
        for symbol in &module.symbols {
            table
                .entry(symbol.name.clone())
                .or_default()
                .push(SymbolEntry {
                    module_path: module.path.clone(),
                    symbol: symbol.clone(),
                });
        }
    }
    index.symbol_table = table;
}

/// Resolve a callee reference against the symbol table: exact name
/// first, then the segment after the last dot (selector calls like
/// `c.get` reach `Cache.get` through their method name).
fn resolve_callee(table: &HashMap<String, Vec<SymbolEntry>>, callee: &str) -> Option<String> {
    if table.contains_key(callee) {
        return Some(callee.to_string());
    }
    let tail = callee.rsplit('.').next()?;
    if tail != callee {
        if table.contains_key(tail) {
            return Some(tail.to_string());
        }
        // Methods are tabled as Receiver.Method; match on the method part.
        let suffix = format!(".{}", tail);
        let mut matches: Vec<&String> = table.keys().filter(|k| k.ends_with(&suffix)).collect();
        matches.sort();
        if let Some(found) = matches.first() {
            return Some((*found).clone());
        }
    }
    None
}

fn build_call_graph(index: &mut ProjectIndex) {
    let mut graph: HashMap<String, CallEdges> = HashMap::new();
    let mut unresolved = BTreeSet::new();

    for name in index.symbol_table.keys() {
        graph.entry(name.clone()).or_default();
    }

    for module in index.modules.values() {
        for symbol in &module.symbols {
            for callee in &symbol.calls {
                match resolve_callee(&index.symbol_table, callee) {
                    Some(resolved) => {
                        if resolved == symbol.name {
                            continue;
                        }
                        let edges = graph.entry(symbol.name.clone()).or_default();
                        if !edges.callees.contains(&resolved) {
                            edges.callees.push(resolved.clone());
                        }
                        let reverse = graph.entry(resolved).or_default();
                        if !reverse.callers.contains(&symbol.name) {
                            reverse.callers.push(symbol.name.clone());
                        }
                    }
                    None => {
                        unresolved.insert(callee.clone());
                    }
                }
            }
        }
    }

    index.call_graph = graph;
    index.unresolved_calls = unresolved.into_iter().collect();
}

/// Resolve an import target to a known module path: exact path, file
/// stem, or trailing path segments.
fn resolve_import(modules: &HashMap<String, Module>, target: &str) -> Option<String> {
    if modules.contains_key(target) {
        return Some(target.to_string());
    }
    let last = target.rsplit(['/', '.']).next().unwrap_or(target);
    let mut candidates: Vec<&String> = modules
        .keys()
        .filter(|path| {
            let stem = path
                .rsplit('/')
                .next()
                .and_then(|f| f.split('.').next())
                .unwrap_or_default();
            stem == last
        })
        .collect();
    candidates.sort();
    candidates.first().map(|p| (*p).clone())
}

fn build_import_graph(index: &mut ProjectIndex) {
    let mut graph: HashMap<String, ImportEdges> = HashMap::new();
    let mut external = BTreeSet::new();

    for path in index.modules.keys() {
        graph.entry(path.clone()).or_default();
    }

    for module in index.modules.values() {
        for target in &module.imports {
            match resolve_import(&index.modules, target) {
                Some(resolved) if resolved != module.path => {
                    let edges = graph.entry(module.path.clone()).or_default();
                    if !edges.imports.contains(&resolved) {
                        edges.imports.push(resolved.clone());
                    }
                    let reverse = graph.entry(resolved).or_default();
                    if !reverse.imported_by.contains(&module.path) {
                        reverse.imported_by.push(module.path.clone());
                    }
                }
                Some(_) => {}
                None => {
                    external.insert(target.clone());
                }
            }
        }
    }

    index.import_graph = graph;
    index.external_imports = external.into_iter().collect();
}
