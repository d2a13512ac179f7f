//! Mermaid flowchart of an answer path

use anyhow::Result;
use std::collections::HashMap;
use std::io::Write;

use super::AnswerFormatter;
use crate::core::AnswerPath;
use crate::utils::analysis::graph::CodeGraph;

pub struct MermaidFormatter;

fn label(text: &str) -> String {
    text.replace('"', "'")
}

impl AnswerFormatter for MermaidFormatter {
    fn write_answer(
        &mut self,
        output: &mut dyn Write,
        graph: &CodeGraph,
        answer: &AnswerPath,
    ) -> Result<()> {
        writeln!(output, "flowchart LR")?;

        let mut ids: HashMap<&str, String> = HashMap::new();
        for (i, id) in answer.path_nodes.iter().enumerate() {
            let key = format!("N{}", i);
            let text = match graph.node(id) {
                Some(node) => format!("{}<br/>{}:{}", node.name, node.file, node.start_line),
                None => id.clone(),
            };
            writeln!(output, "    {}[\"{}\"]", key, label(&text))?;
            ids.insert(id.as_str(), key);
        }

        for edge in &answer.path_edges {
            if let (Some(s), Some(t)) = (ids.get(edge.source.as_str()), ids.get(edge.target.as_str())) {
                writeln!(output, "    {} -->|{}| {}", s, edge.edge_type, t)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PathEdge, PathEdgeType};

    #[test]
    fn test_mermaid_flowchart() -> Result<()> {
        let answer = AnswerPath {
            path_nodes: vec!["function:a:x.go:1".into(), "class:\"B\":x.go:9".into()],
            path_edges: vec![PathEdge::new(
                "function:a:x.go:1",
                "class:\"B\":x.go:9",
                PathEdgeType::Inherit,
            )],
        };
        let mut out = Vec::new();
        MermaidFormatter.write_answer(&mut out, &CodeGraph::empty(), &answer)?;
        let text = String::from_utf8(out)?;

        assert!(text.starts_with("flowchart LR\n"));
        assert!(text.contains("N1[\"class:'B':x.go:9\"]"));
        assert!(text.contains("N0 -->|inherit| N1"));
        Ok(())
    }
}
