//! JSON answer output: `{ "path_nodes": [...], "path_edges": [...] }`

use anyhow::Result;
use std::io::Write;

use super::AnswerFormatter;
use crate::core::AnswerPath;
use crate::utils::analysis::graph::CodeGraph;

pub struct JsonFormatter;

impl AnswerFormatter for JsonFormatter {
    fn write_answer(
        &mut self,
        output: &mut dyn Write,
        _graph: &CodeGraph,
        answer: &AnswerPath,
    ) -> Result<()> {
        serde_json::to_writer_pretty(&mut *output, answer)?;
        writeln!(output)?;
        Ok(())
    }
}
