//! Answer path renderers

pub mod json;
pub mod markdown;
pub mod mermaid;

use anyhow::Result;
use std::io::Write;

use crate::config::AnswerFormat;
use crate::core::AnswerPath;
use crate::utils::analysis::graph::CodeGraph;

pub trait AnswerFormatter {
    /// Writes `answer`, looking node details up in `graph`.
    fn write_answer(
        &mut self,
        output: &mut dyn Write,
        graph: &CodeGraph,
        answer: &AnswerPath,
    ) -> Result<()>;
}

pub fn create_formatter(format: AnswerFormat) -> Box<dyn AnswerFormatter> {
    match format {
        AnswerFormat::Json => Box::new(json::JsonFormatter),
        AnswerFormat::Markdown => Box::new(markdown::MarkdownFormatter::default()),
        AnswerFormat::Mermaid => Box::new(mermaid::MermaidFormatter),
    }
}

/// Renders an answer path to a string in the requested format.
pub fn render_answer(graph: &CodeGraph, answer: &AnswerPath, format: AnswerFormat) -> Result<String> {
    let mut buffer = Vec::new();
    create_formatter(format).write_answer(&mut buffer, graph, answer)?;
    Ok(String::from_utf8(buffer)?)
}
