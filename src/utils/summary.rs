//! Per-node Markdown documents for the embedding collaborator

use crate::core::Node;
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
}

pub const DEFAULT_DOCUMENT_LINES: usize = 40;

/// First `max_lines` lines of `code`, with an overflow note when cut.
pub fn code_excerpt(code: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let mut excerpt = lines
        .iter()
        .take(max_lines)
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    if lines.len() > max_lines {
        let _ = write!(excerpt, "\n... ({} more lines)", lines.len() - max_lines);
    }
    excerpt
}

/// Fence tag for a node's code block.
fn fence_language(node: &Node) -> &str {
    match node.language.as_str() {
        "c_sharp" => "csharp",
        "" => "text",
        other => other,
    }
}

/// Renders the embedding document for one node.
pub fn node_document(node: &Node, max_lines: usize) -> String {
    let mut doc = format!("# {} - {}:{}", node.name, node.file, node.start_line);
    let excerpt = code_excerpt(&node.code, max_lines);
    let fence = fence_language(node);

    if let Some(signature) = excerpt.lines().next().filter(|l| !l.trim().is_empty()) {
        let _ = write!(doc, "\n\n## Signature\n```{}\n{}\n```", fence, signature);
    }
    let description = node.doc.trim();
    if !description.is_empty() {
        let _ = write!(doc, "\n\n## Documentation\n{}", description);
    }
    if !excerpt.is_empty() {
        let _ = write!(doc, "\n\n## Code\n```{}\n{}\n```", fence, excerpt);
    }

    let mut metrics = Vec::new();
    if let Some(loc) = node.loc {
        metrics.push(format!("Lines of code: {}", loc));
    }
    if let Some(cyclomatic) = node.cyclomatic {
        metrics.push(format!("Complexity: {}", cyclomatic));
    }
    if !metrics.is_empty() {
        let _ = write!(doc, "\n\n## Metrics\n{}", metrics.join(" | "));
    }
    doc
}

/// File name for a node's document, with path-hostile characters replaced.
pub fn document_file_name(node_id: &str) -> String {
    format!("{}.md", UNSAFE_FILE_CHARS.replace_all(node_id, "_"))
}

/// Writes one document per node into `dir`; returns how many were written.
///
/// A failed write is logged and the remaining nodes are still written.
pub fn write_documents(nodes: &[Node], dir: &Path, max_lines: usize) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let mut written = 0;
    for node in nodes {
        let path = dir.join(document_file_name(&node.id));
        match fs::write(&path, node_document(node, max_lines)) {
            Ok(()) => written += 1,
            Err(e) => log::warn!("Failed to write document {:?}: {}", path, e),
        }
    }
    log::info!("Wrote {} documents to {:?}", written, dir);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Language, NodeKind};
    use tempfile::TempDir;

    fn sample() -> Node {
        let mut node = Node::new(NodeKind::Function, "area", "geo/shapes.py", (3, 6), Language::Python)
            .with_code("def area(r):\n    if r < 0:\n        return 0\n    return 3.14 * r * r".to_string())
            .with_doc("Area of a circle.".to_string());
        node.loc = Some(4);
        node.cyclomatic = Some(2);
        node
    }

    #[test]
    fn test_node_document_sections() {
        let doc = node_document(&sample(), 40);
        assert!(doc.starts_with("# area - geo/shapes.py:3"));
        assert!(doc.contains("## Signature\n```python\ndef area(r):\n```"));
        assert!(doc.contains("## Documentation\nArea of a circle."));
        assert!(doc.contains("## Metrics\nLines of code: 4 | Complexity: 2"));
    }

    #[test]
    fn test_excerpt_overflow_note() {
        let excerpt = code_excerpt("a\nb\nc\nd", 2);
        assert_eq!(excerpt, "a\nb\n... (2 more lines)");
        assert_eq!(code_excerpt("a\nb", 2), "a\nb");
    }

    #[test]
    fn test_unannotated_node_has_no_metrics() {
        let node = Node::new(NodeKind::File, "README", "docs/x.json", (1, 1), Language::Json);
        let doc = node_document(&node, 10);
        assert!(!doc.contains("## Metrics"));
        assert!(!doc.contains("## Code"));
    }

    #[test]
    fn test_write_documents() -> Result<()> {
        let dir = TempDir::new()?;
        let written = write_documents(&[sample()], dir.path(), 5)?;
        assert_eq!(written, 1);
        assert_eq!(
            document_file_name("function:area:geo/shapes.py:3"),
            "function_area_geo_shapes.py_3.md"
        );
        assert!(dir.path().join("function_area_geo_shapes.py_3.md").exists());
        Ok(())
    }
}
