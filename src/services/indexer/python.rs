//! Python Parser
//!
//! Tree-sitter based symbol extraction for Python files: top-level
//! functions, classes with their methods (named `Class.method`),
//! module-level assignments, imports, and call references.

use crate::utils::error::{AppError, AppResult};

use super::index::{Module, Symbol, SymbolKind};
use super::parser::{collect_calls, field_text, line_text, node_text, SourceParser};

pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for PythonParser {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn parse(&self, rel_path: &str, content: &str) -> AppResult<Module> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| AppError::parse(format!("python grammar unavailable: {}", e)))?;
        let tree = parser
            .parse(content, None)
            .ok_or_else(|| AppError::parse(format!("failed to parse {}", rel_path)))?;

        let root = tree.root_node();
        let lines: Vec<&str> = content.lines().collect();
        let mut symbols = Vec::new();
        let mut imports = Vec::new();

        for i in 0..root.child_count() {
            let node = match root.child(i) {
                Some(n) => n,
                None => continue,
            };
            extract_top_level(node, content, &lines, &mut symbols, &mut imports);
        }

        Ok(Module {
            path: rel_path.to_string(),
            language: "python".to_string(),
            symbols,
            imports,
        })
    }
}

fn extract_top_level(
    node: tree_sitter::Node,
    source: &str,
    lines: &[&str],
    symbols: &mut Vec<Symbol>,
    imports: &mut Vec<String>,
) {
    match node.kind() {
        "function_definition" => {
            if let Some(sym) = function_symbol(node, source, lines, None) {
                symbols.push(sym);
            }
        }
        "class_definition" => {
            extract_class(node, source, lines, symbols);
        }
        "decorated_definition" => {
            // Unwrap to the inner def/class.
            if let Some(inner) = node.child_by_field_name("definition") {
                extract_top_level(inner, source, lines, symbols, imports);
            }
        }
        "import_statement" => {
            collect_kind_texts(node, source, "dotted_name", imports);
        }
        "import_from_statement" => {
            if let Some(module) = field_text(node, "module_name", source) {
                if !imports.contains(&module) {
                    imports.push(module);
                }
            }
        }
        "expression_statement" => {
            if let Some(sym) = assignment_symbol(node, source, lines) {
                symbols.push(sym);
            }
        }
        _ => {}
    }
}

fn extract_class(
    node: tree_sitter::Node,
    source: &str,
    lines: &[&str],
    symbols: &mut Vec<Symbol>,
) {
    let Some(class_name) = field_text(node, "name", source) else {
        return;
    };
    let start_line = node.start_position().row + 1;
    symbols.push(Symbol {
        name: class_name.clone(),
        kind: SymbolKind::Type,
        signature: line_text(lines, start_line),
        doc: docstring(node, source),
        line: start_line,
        receiver: None,
        calls: Vec::new(),
    });

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    for i in 0..body.child_count() {
        let Some(child) = body.child(i) else { continue };
        let def = match child.kind() {
            "function_definition" => Some(child),
            "decorated_definition" => child
                .child_by_field_name("definition")
                .filter(|d| d.kind() == "function_definition"),
            _ => None,
        };
        if let Some(def) = def {
            if let Some(sym) = function_symbol(def, source, lines, Some(&class_name)) {
                symbols.push(sym);
            }
        }
    }
}

fn function_symbol(
    node: tree_sitter::Node,
    source: &str,
    lines: &[&str],
    class_name: Option<&str>,
) -> Option<Symbol> {
    let name = field_text(node, "name", source)?;
    let start_line = node.start_position().row + 1;

    let (full_name, kind, receiver) = match class_name {
        Some(class) => (
            format!("{}.{}", class, name),
            SymbolKind::Method,
            Some(class.to_string()),
        ),
        None => (name, SymbolKind::Function, None),
    };

    let mut calls = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        collect_calls(body, source, "call", "function", &mut calls);
    }

    Some(Symbol {
        name: full_name,
        kind,
        signature: line_text(lines, start_line),
        doc: docstring(node, source),
        line: start_line,
        receiver,
        calls,
    })
}

/// Module-level assignment: ALL_CAPS names are constants, the rest
/// variables. Only simple identifier targets are recorded.
fn assignment_symbol(
    node: tree_sitter::Node,
    source: &str,
    lines: &[&str],
) -> Option<Symbol> {
    let assignment = node.child(0).filter(|c| c.kind() == "assignment")?;
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = node_text(left, source);
    let start_line = node.start_position().row + 1;
    let kind = if name
        .chars()
        .all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit())
    {
        SymbolKind::Constant
    } else {
        SymbolKind::Variable
    };

    Some(Symbol {
        name,
        kind,
        signature: line_text(lines, start_line),
        doc: String::new(),
        line: start_line,
        receiver: None,
        calls: Vec::new(),
    })
}

/// Docstring: first expression_statement string in the body block.
fn docstring(node: tree_sitter::Node, source: &str) -> String {
    let Some(body) = node.child_by_field_name("body") else {
        return String::new();
    };
    for j in 0..body.child_count() {
        let Some(stmt) = body.child(j) else { continue };
        if stmt.kind() == "expression_statement" {
            for k in 0..stmt.child_count() {
                let Some(expr) = stmt.child(k) else { continue };
                if expr.kind() == "string" {
                    return clean_docstring(&node_text(expr, source));
                }
            }
        }
        // Only the first statement can be a docstring.
        if stmt.kind() != "comment" {
            break;
        }
    }
    String::new()
}

fn clean_docstring(text: &str) -> String {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("\"\"\"")
        .or_else(|| trimmed.strip_prefix("'''"))
        .unwrap_or(trimmed);
    let inner = inner
        .strip_suffix("\"\"\"")
        .or_else(|| inner.strip_suffix("'''"))
        .unwrap_or(inner);
    inner
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Texts of all descendant nodes of the given kind, deduplicated.
fn collect_kind_texts(
    node: tree_sitter::Node,
    source: &str,
    kind: &str,
    out: &mut Vec<String>,
) {
    if node.kind() == kind {
        let text = node_text(node, source);
        if !text.is_empty() && !out.contains(&text) {
            out.push(text);
        }
        return;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_kind_texts(child, source, kind, out);
        }
    }
}
