//! Go Parser
//!
//! Tree-sitter based symbol extraction for Go files: top-level
//! functions, methods (with receiver types), type declarations, consts,
//! vars, plus imports and outgoing call references.

use crate::utils::error::{AppError, AppResult};

use super::index::{Module, Symbol, SymbolKind};
use super::parser::{collect_calls, field_text, line_text, node_text, SourceParser};

pub struct GoParser;

impl GoParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for GoParser {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse(&self, rel_path: &str, content: &str) -> AppResult<Module> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| AppError::parse(format!("go grammar unavailable: {}", e)))?;
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
            let start_line = node.start_position().row + 1;

            match node.kind() {
                "function_declaration" => {
                    let Some(name) = field_text(node, "name", content) else {
                        continue;
                    };
                    symbols.push(Symbol {
                        name,
                        kind: SymbolKind::Function,
                        signature: line_text(&lines, start_line),
                        doc: doc_comment(&lines, start_line),
                        line: start_line,
                        receiver: None,
                        calls: body_calls(node, content),
                    });
                }
                "method_declaration" => {
                    let Some(name) = field_text(node, "name", content) else {
                        continue;
                    };
                    let receiver = receiver_type(node, content);
                    let full_name = match &receiver {
                        Some(recv) => format!("{}.{}", recv, name),
                        None => name,
                    };
                    symbols.push(Symbol {
                        name: full_name,
                        kind: SymbolKind::Method,
                        signature: line_text(&lines, start_line),
                        doc: doc_comment(&lines, start_line),
                        line: start_line,
                        receiver,
                        calls: body_calls(node, content),
                    });
                }
                "type_declaration" => {
                    for j in 0..node.child_count() {
                        let spec = match node.child(j) {
                            Some(s) if s.kind() == "type_spec" => s,
                            _ => continue,
                        };
                        let Some(name) = field_text(spec, "name", content) else {
                            continue;
                        };
                        let spec_line = spec.start_position().row + 1;
                        symbols.push(Symbol {
                            name,
                            kind: type_spec_kind(spec),
                            signature: line_text(&lines, spec_line),
                            doc: doc_comment(&lines, start_line),
                            line: spec_line,
                            receiver: None,
                            calls: Vec::new(),
                        });
                    }
                }
                "const_declaration" | "var_declaration" => {
                    let kind = if node.kind() == "const_declaration" {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    };
                    for name in spec_identifiers(node, content) {
                        symbols.push(Symbol {
                            name,
                            kind,
                            signature: line_text(&lines, start_line),
                            doc: String::new(),
                            line: start_line,
                            receiver: None,
                            calls: Vec::new(),
                        });
                    }
                }
                "import_declaration" => {
                    collect_imports(node, content, &mut imports);
                }
                _ => {}
            }
        }

        Ok(Module {
            path: rel_path.to_string(),
            language: "go".to_string(),
            symbols,
            imports,
        })
    }
}

/// `(s *Server)` and `(s Server)` both yield `Server`.
fn receiver_type(node: tree_sitter::Node, source: &str) -> Option<String> {
    for i in 0..node.child_count() {
        let child = node.child(i)?;
        if child.kind() == "parameter_list" {
            let text = node_text(child, source);
            let inner = text.trim_start_matches('(').trim_end_matches(')');
            return inner
                .split_whitespace()
                .last()
                .map(|t| t.trim_start_matches('*').to_string());
        }
    }
    None
}

fn type_spec_kind(type_spec: tree_sitter::Node) -> SymbolKind {
    for i in 0..type_spec.child_count() {
        if let Some(child) = type_spec.child(i) {
            match child.kind() {
                "struct_type" => return SymbolKind::Struct,
                "interface_type" => return SymbolKind::Interface,
                _ => {}
            }
        }
    }
    SymbolKind::Type
}

/// Identifiers declared by const/var specs under `node`.
fn spec_identifiers(node: tree_sitter::Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for i in 0..node.child_count() {
        let Some(child) = node.child(i) else { continue };
        match child.kind() {
            "const_spec" | "var_spec" => {
                for j in 0..child.child_count() {
                    let Some(part) = child.child(j) else { continue };
                    if part.kind() == "identifier" {
                        names.push(node_text(part, source));
                    } else if part.kind() == "=" || part.kind() == "type_identifier" {
                        break;
                    }
                }
            }
            "const_spec_list" | "var_spec_list" => {
                names.extend(spec_identifiers(child, source));
            }
            _ => {}
        }
    }
    names
}

/// Import path strings under an import_declaration, quotes trimmed.
fn collect_imports(node: tree_sitter::Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "import_spec" {
        let path = node
            .child_by_field_name("path")
            .map(|p| node_text(p, source))
            .unwrap_or_default();
        let trimmed = path.trim_matches('"');
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        return;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_imports(child, source, out);
        }
    }
}

/// Preceding `//` comment lines, joined.
fn doc_comment(lines: &[&str], def_line: usize) -> String {
    if def_line < 2 {
        return String::new();
    }
    let mut doc_lines = Vec::new();
    let mut idx = def_line - 2;
    loop {
        if idx >= lines.len() {
            break;
        }
        let trimmed = lines[idx].trim();
        if let Some(rest) = trimmed.strip_prefix("//") {
            doc_lines.push(rest.trim().to_string());
        } else {
            break;
        }
        if idx == 0 {
            break;
        }
        idx -= 1;
    }
    doc_lines.reverse();
    doc_lines.join(" ")
}

fn body_calls(node: tree_sitter::Node, source: &str) -> Vec<String> {
    let mut calls = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        collect_calls(body, source, "call_expression", "function", &mut calls);
    }
    calls
}
