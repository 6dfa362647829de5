//! Project Summaries
//!
//! Human-readable overviews of a built index: aggregate statistics and
//! a directory structure tree.

use std::collections::BTreeMap;

use super::index::ProjectIndex;

/// Renders project-level summaries.
pub struct Summarizer;

impl Summarizer {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate overview: counts, language breakdown, largest modules,
    /// and likely entry points.
    pub fn generate_project_overview(&self, index: &ProjectIndex) -> String {
        let mut out = String::new();
        out.push_str(&format!("Project: {}\n", index.root));
        out.push_str(&format!(
            "Modules: {} | Symbols: {}\n",
            index.modules.len(),
            index.symbol_count()
        ));

        let mut per_language: BTreeMap<&str, usize> = BTreeMap::new();
        for module in index.modules.values() {
            *per_language.entry(module.language.as_str()).or_default() += 1;
        }
        out.push_str("Languages:\n");
        for (language, count) in &per_language {
            out.push_str(&format!("  {}: {} files\n", language, count));
        }

        let mut largest: Vec<(&String, usize)> = index
            .modules
            .iter()
            .map(|(path, m)| (path, m.symbols.len()))
            .collect();
        largest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        out.push_str("Largest modules:\n");
        for (path, count) in largest.iter().take(10) {
            out.push_str(&format!("  {} ({} symbols)\n", path, count));
        }

        let mut entry_points: Vec<&String> = index
            .modules
            .iter()
            .filter(|(path, module)| {
                let file = path.rsplit('/').next().unwrap_or(path);
                file.starts_with("main.")
                    || file.starts_with("app.")
                    || file.starts_with("index.")
                    || module.symbols.iter().any(|s| s.name == "main")
            })
            .map(|(path, _)| path)
            .collect();
        entry_points.sort();
        if !entry_points.is_empty() {
            out.push_str("Entry points:\n");
            for path in entry_points.iter().take(10) {
                out.push_str(&format!("  {}\n", path));
            }
        }

        if !index.external_imports.is_empty() {
            out.push_str(&format!(
                "External imports: {}\n",
                index.external_imports.len()
            ));
        }

        out
    }

    /// Directory tree of module paths, limited to `max_depth` levels.
    pub fn generate_structure_tree(&self, index: &ProjectIndex, max_depth: usize) -> String {
        #[derive(Default)]
        struct Node {
            children: BTreeMap<String, Node>,
            is_file: bool,
        }

        let mut root = Node::default();
        for path in index.modules.keys() {
            let mut node = &mut root;
            let parts: Vec<&str> = path.split('/').collect();
            for (i, part) in parts.iter().enumerate() {
                node = node.children.entry(part.to_string()).or_default();
                if i == parts.len() - 1 {
                    node.is_file = true;
                }
            }
        }

        fn render(node: &Node, depth: usize, max_depth: usize, out: &mut String) {
            if depth >= max_depth {
                return;
            }
            for (name, child) in &node.children {
                out.push_str(&"  ".repeat(depth));
                if child.is_file {
                    out.push_str(&format!("{}\n", name));
                } else {
                    out.push_str(&format!("{}/\n", name));
                }
                render(child, depth + 1, max_depth, out);
            }
        }

        let mut out = format!("{}/\n", index.root);
        render(&root, 0, max_depth.max(1), &mut out);
        out
    }
}

impl Default for Summarizer {
    fn default() -> Self {
        Self::new()
    }
}
