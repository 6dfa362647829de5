//! Code Chunkers
//!
//! Split source files into embedding-ready chunks along syntactic
//! boundaries. Go files are chunked on tree-sitter declaration nodes,
//! Python files on indentation blocks, and everything else through a
//! fixed-size sliding window. Oversized chunks are re-split into
//! overlapping parts so they stay within embedding model limits.

use tracing::debug;

use super::types::Chunk;

/// Maximum chunk size in characters (~1000 tokens).
const MAX_CHUNK_SIZE: usize = 4000;

/// Overlap between split parts, in lines.
const OVERLAP_LINES: usize = 10;

/// Sliding window size for the generic chunker, in lines.
const WINDOW_LINES: usize = 50;

/// Sliding window overlap, in lines.
const WINDOW_OVERLAP: usize = 10;

/// Splits code into searchable chunks.
pub trait Chunker: Send + Sync {
    fn chunk_file(&self, file_path: &str, content: &str) -> Vec<Chunk>;
    fn language(&self) -> &str;
}

/// Pick a chunker for a file based on its extension.
pub fn chunker_for(file_path: &str) -> Box<dyn Chunker> {
    let ext = file_path.rsplit('.').next().unwrap_or("");
    match ext {
        "go" => Box::new(GoChunker),
        "py" => Box::new(PythonChunker),
        _ => Box::new(GenericChunker::new(language_for_extension(ext))),
    }
}

/// Map a file extension to a language tag for chunk metadata.
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext {
        "go" => "go",
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "hpp" => "cpp",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "cs" => "csharp",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        _ => "text",
    }
}

// ---------------------------------------------------------------------------
// Go: tree-sitter declaration chunking
// ---------------------------------------------------------------------------

/// AST-driven chunker for Go files.
///
/// Produces one chunk per top-level function, method (named
/// `Receiver.Method`), and type declaration. Falls back to the generic
/// sliding window when the file cannot be parsed.
pub struct GoChunker;

impl Chunker for GoChunker {
    fn chunk_file(&self, file_path: &str, content: &str) -> Vec<Chunk> {
        match self.chunk_with_tree_sitter(file_path, content) {
            Some(chunks) if !chunks.is_empty() => chunks,
            _ => {
                debug!(file = file_path, "go chunker falling back to sliding window");
                generic_sliding_chunks(file_path, content, "go")
            }
        }
    }

    fn language(&self) -> &str {
        "go"
    }
}

impl GoChunker {
    fn chunk_with_tree_sitter(&self, file_path: &str, content: &str) -> Option<Vec<Chunk>> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .ok()?;
        let tree = parser.parse(content, None)?;
        let root = tree.root_node();
        if root.has_error() && root.child_count() == 0 {
            return None;
        }

        let lines: Vec<&str> = content.lines().collect();
        let mut chunks = Vec::new();

        for i in 0..root.child_count() {
            let node = match root.child(i) {
                Some(n) => n,
                None => continue,
            };
            let start = node.start_position().row + 1;
            let end = node.end_position().row + 1;

            match node.kind() {
                "function_declaration" => {
                    let name = field_text(node, "name", content).unwrap_or_default();
                    let text = extract_lines(&lines, start, end);
                    chunks.extend(split_large_chunk(
                        file_path, &text, "function", &name, "go", start, end,
                    ));
                }
                "method_declaration" => {
                    let name = field_text(node, "name", content).unwrap_or_default();
                    let symbol = match go_receiver_type(node, content) {
                        Some(recv) => format!("{}.{}", recv, name),
                        None => name,
                    };
                    let text = extract_lines(&lines, start, end);
                    chunks.extend(split_large_chunk(
                        file_path, &text, "method", &symbol, "go", start, end,
                    ));
                }
                "type_declaration" => {
                    for j in 0..node.child_count() {
                        let spec = match node.child(j) {
                            Some(s) if s.kind() == "type_spec" => s,
                            _ => continue,
                        };
                        let name = field_text(spec, "name", content).unwrap_or_default();
                        let chunk_type = go_type_kind(spec);
                        let spec_start = spec.start_position().row + 1;
                        let spec_end = spec.end_position().row + 1;
                        let text = extract_lines(&lines, spec_start, spec_end);
                        chunks.extend(split_large_chunk(
                            file_path, &text, chunk_type, &name, "go", spec_start, spec_end,
                        ));
                    }
                }
                _ => {}
            }
        }

        Some(chunks)
    }
}

/// Distinguish struct / interface / other type declarations.
fn go_type_kind(type_spec: tree_sitter::Node) -> &'static str {
    for i in 0..type_spec.child_count() {
        if let Some(child) = type_spec.child(i) {
            match child.kind() {
                "struct_type" => return "struct",
                "interface_type" => return "interface",
                _ => {}
            }
        }
    }
    "type"
}

/// Extract the receiver type name from a Go method declaration.
///
/// `(s *Server)` and `(s Server)` both yield `Server`.
fn go_receiver_type(node: tree_sitter::Node, source: &str) -> Option<String> {
    for i in 0..node.child_count() {
        let child = node.child(i)?;
        if child.kind() == "parameter_list" {
            let text = &source[child.byte_range()];
            let inner = text.trim_start_matches('(').trim_end_matches(')');
            return inner
                .split_whitespace()
                .last()
                .map(|t| t.trim_start_matches('*').to_string());
        }
    }
    None
}

fn field_text(node: tree_sitter::Node, field: &str, source: &str) -> Option<String> {
    let child = node.child_by_field_name(field)?;
    let text = &source[child.byte_range()];
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// Python: indentation chunking
// ---------------------------------------------------------------------------

/// Indentation-driven chunker for Python files.
///
/// Captures decorators with their `def`/`class`, treats indented `def`s
/// as methods, and extends each block through all lines more indented
/// than the header (blank and comment-only lines stay in the block).
pub struct PythonChunker;

impl Chunker for PythonChunker {
    fn chunk_file(&self, file_path: &str, content: &str) -> Vec<Chunk> {
        let lines: Vec<&str> = content.lines().collect();
        let mut chunks = Vec::new();

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim();
            if trimmed.is_empty() {
                i += 1;
                continue;
            }

            let (chunk_type, symbol_name) = if let Some(rest) = trimmed.strip_prefix("class ") {
                ("class", extract_python_name(rest))
            } else if let Some(rest) = trimmed.strip_prefix("def ") {
                let kind = if leading_indent(line) > 0 {
                    "method"
                } else {
                    "function"
                };
                (kind, extract_python_name(rest))
            } else {
                i += 1;
                continue;
            };

            let base_indent = leading_indent(line);

            // Include decorators immediately above at the same indent.
            let mut start_idx = i;
            for d in (0..i).rev() {
                let dec = lines[d].trim();
                if dec.is_empty() {
                    break;
                }
                if dec.starts_with('@') && leading_indent(lines[d]) == base_indent {
                    start_idx = d;
                } else {
                    break;
                }
            }

            // Indentation delimits the end of the block.
            let mut end_idx = i + 1;
            for (j, next) in lines.iter().enumerate().skip(i + 1) {
                let trim_next = next.trim();
                if trim_next.is_empty() || trim_next.starts_with('#') {
                    continue;
                }
                if leading_indent(next) <= base_indent && !trim_next.starts_with('@') {
                    break;
                }
                end_idx = j + 1;
            }

            let chunk_content = lines[start_idx..end_idx].join("\n");
            if chunk_content.trim().len() >= 20 {
                chunks.extend(split_large_chunk(
                    file_path,
                    &chunk_content,
                    chunk_type,
                    &symbol_name,
                    "python",
                    start_idx + 1,
                    end_idx,
                ));
            }
            i = end_idx;
        }

        if chunks.is_empty() {
            return generic_sliding_chunks(file_path, content, "python");
        }
        chunks
    }

    fn language(&self) -> &str {
        "python"
    }
}

/// Pull the bare name out of a Python signature tail like `Foo(Bar):`.
fn extract_python_name(signature: &str) -> String {
    let sig = signature.trim().trim_end_matches(':');
    let sig = match sig.find('(') {
        Some(idx) => &sig[..idx],
        None => sig,
    };
    sig.trim().to_string()
}

fn leading_indent(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

// ---------------------------------------------------------------------------
// Generic: sliding window
// ---------------------------------------------------------------------------

/// Fallback chunker for languages without a syntactic strategy.
pub struct GenericChunker {
    language: &'static str,
}

impl GenericChunker {
    pub fn new(language: &'static str) -> Self {
        Self { language }
    }
}

impl Chunker for GenericChunker {
    fn chunk_file(&self, file_path: &str, content: &str) -> Vec<Chunk> {
        generic_sliding_chunks(file_path, content, self.language)
    }

    fn language(&self) -> &str {
        self.language
    }
}

/// 50-line windows with 10-line overlap; windows whose trimmed content
/// is shorter than 50 characters are dropped.
pub fn generic_sliding_chunks(file_path: &str, content: &str, language: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    let stride = WINDOW_LINES - WINDOW_OVERLAP;
    let mut chunks = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let end = (i + WINDOW_LINES).min(lines.len());
        let window = lines[i..end].join("\n");

        if window.trim().len() >= 50 {
            chunks.push(Chunk::new(
                file_path, window, "block", "", language, i + 1, end,
            ));
        }

        if end >= lines.len() {
            break;
        }
        i += stride;
    }

    chunks
}

// ---------------------------------------------------------------------------
// Oversize split
// ---------------------------------------------------------------------------

/// Split a chunk larger than `MAX_CHUNK_SIZE` characters into overlapping
/// sub-chunks of at most 100 lines; parts inherit the kind and carry
/// `name_part1`, `name_part2`, … in the symbol field.
pub fn split_large_chunk(
    file_path: &str,
    content: &str,
    chunk_type: &str,
    symbol_name: &str,
    language: &str,
    start: usize,
    end: usize,
) -> Vec<Chunk> {
    if content.len() <= MAX_CHUNK_SIZE {
        return vec![Chunk::new(
            file_path,
            content,
            chunk_type,
            symbol_name,
            language,
            start,
            end,
        )];
    }

    let lines: Vec<&str> = content.lines().collect();
    let lines_per_chunk = (MAX_CHUNK_SIZE / 40).min(100);
    let stride = lines_per_chunk - OVERLAP_LINES;
    let mut chunks = Vec::new();
    let mut part = 1;

    let mut i = 0;
    while i < lines.len() {
        let end_idx = (i + lines_per_chunk).min(lines.len());
        let sub = lines[i..end_idx].join("\n");

        if sub.trim().len() >= 20 {
            let part_symbol = if part > 1 || end_idx < lines.len() {
                format!("{}_part{}", symbol_name, part)
            } else {
                symbol_name.to_string()
            };
            chunks.push(Chunk::new(
                file_path,
                sub,
                chunk_type,
                part_symbol,
                language,
                start + i,
                start + end_idx - 1,
            ));
            part += 1;
        }

        if end_idx >= lines.len() {
            break;
        }
        i += stride;
    }

    chunks
}

/// Slice of the source between 1-based inclusive line bounds.
fn extract_lines(lines: &[&str], start_line: usize, end_line: usize) -> String {
    if start_line < 1 || start_line > lines.len() {
        return String::new();
    }
    let end = end_line.min(lines.len());
    lines[start_line - 1..end].join("\n")
}
