use super::docs::truncate_chars;
use super::{ParserBackend, TextLimits};
use crate::core::{FileParseError, Language, Node, NodeKind, SourceFile};

pub const NAME: &str = "whole_file";

/// Emits a single `file` node holding a truncated copy of the file body
pub struct WholeFileBackend {
    limits: TextLimits,
}

impl WholeFileBackend {
    pub fn new(limits: TextLimits) -> Self {
        Self { limits }
    }
}

impl ParserBackend for WholeFileBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, _language: Language) -> bool {
        true
    }

    fn is_structural(&self) -> bool {
        false
    }

    fn parse(&self, file: &SourceFile) -> Result<Vec<Node>, FileParseError> {
        let name = file.file_name().to_string();
        let line_count = file.content.lines().count().max(1);
        let code = truncate_chars(
            &file.content,
            self.limits.max_snippet_chars,
            "file truncated",
        );
        let mut doc = format!("File: {} ({})", name, file.language);
        if let Some(size) = file.truncated_from {
            doc.push_str(&format!(" (file exceeds size cap: {} bytes)", size));
        }

        let node = Node::new(
            NodeKind::File,
            name,
            file.relative.as_str(),
            (1, line_count),
            file.language,
        )
        .with_code(code)
        .with_doc(doc);
        Ok(vec![node])
    }
}
