//! Markdown answer output: ordered path with snippets, then the connecting edges

use anyhow::Result;
use std::io::Write;

use super::AnswerFormatter;
use crate::core::AnswerPath;
use crate::utils::analysis::graph::CodeGraph;
use crate::utils::summary::code_excerpt;

pub struct MarkdownFormatter {
    /// Code lines shown per node
    pub max_lines: usize,
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self { max_lines: 30 }
    }
}

impl AnswerFormatter for MarkdownFormatter {
    fn write_answer(
        &mut self,
        output: &mut dyn Write,
        graph: &CodeGraph,
        answer: &AnswerPath,
    ) -> Result<()> {
        writeln!(output, "# Answer Path")?;
        writeln!(output)?;
        if answer.is_empty() {
            writeln!(output, "_No matching nodes._")?;
            return Ok(());
        }
        writeln!(
            output,
            "> {} nodes, {} edges",
            answer.path_nodes.len(),
            answer.path_edges.len()
        )?;
        writeln!(output)?;

        for (i, id) in answer.path_nodes.iter().enumerate() {
            let Some(node) = graph.node(id) else {
                writeln!(output, "## {}. `{}`", i + 1, id)?;
                writeln!(output)?;
                continue;
            };
            let kind = node.kind().map(|k| k.as_str()).unwrap_or("node");
            writeln!(output, "## {}. `{}` ({})", i + 1, node.name, kind)?;
            writeln!(output)?;
            writeln!(
                output,
                "`{}:{}-{}`",
                node.file, node.start_line, node.end_line
            )?;
            writeln!(output)?;
            let doc = node.doc.trim();
            if !doc.is_empty() {
                writeln!(output, "> {}", doc.replace('\n', "\n> "))?;
                writeln!(output)?;
            }
            if !node.code.is_empty() {
                writeln!(output, "```{}", node.language)?;
                writeln!(output, "{}", code_excerpt(&node.code, self.max_lines))?;
                writeln!(output, "```")?;
                writeln!(output)?;
            }
        }

        if !answer.path_edges.is_empty() {
            writeln!(output, "## Edges")?;
            writeln!(output)?;
            writeln!(output, "| Source | Target | Type |")?;
            writeln!(output, "|--------|--------|------|")?;
            for edge in &answer.path_edges {
                writeln!(
                    output,
                    "| `{}` | `{}` | {} |",
                    edge.source, edge.target, edge.edge_type
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Edge, EdgeType, Language, Node, NodeKind, ScanSummary};
    use crate::utils::analysis::query::resolve;

    #[test]
    fn test_markdown_lists_path_in_order() -> Result<()> {
        let a = Node::new(NodeKind::Function, "load", "io.py", (1, 2), Language::Python)
            .with_code("def load():\n    parse()".to_string())
            .with_doc("Reads input.".to_string());
        let b = Node::new(NodeKind::Function, "parse", "io.py", (4, 5), Language::Python)
            .with_code("def parse():\n    pass".to_string());
        let edges = vec![Edge::new(a.id.clone(), b.id.clone(), EdgeType::Call)];
        let graph = CodeGraph::assemble(vec![a, b], edges, &ScanSummary::default());
        let answer = resolve(&graph, &["function:load:io.py:1", "function:parse:io.py:4"]);

        let mut out = Vec::new();
        MarkdownFormatter::default().write_answer(&mut out, &graph, &answer)?;
        let text = String::from_utf8(out)?;

        let first = text.find("## 1. `load` (function)").expect("load heading");
        let second = text.find("## 2. `parse` (function)").expect("parse heading");
        assert!(first < second);
        assert!(text.contains("> Reads input."));
        assert!(text.contains("```python\ndef load():"));
        assert!(text.contains("| `function:load:io.py:1` | `function:parse:io.py:4` | call |"));
        Ok(())
    }

    #[test]
    fn test_markdown_empty_answer() -> Result<()> {
        let mut out = Vec::new();
        MarkdownFormatter::default().write_answer(&mut out, &CodeGraph::empty(), &AnswerPath::empty())?;
        assert!(String::from_utf8(out)?.contains("_No matching nodes._"));
        Ok(())
    }
}
