//! Parser backend chain
//!
//! Each candidate file is offered to an ordered list of interchangeable backends.
//! Structural backends (tree-sitter, the Python outline parser) are tried first; the
//! first one that yields nodes wins. The whole-file backend only runs when no
//! structural backend applies or none of them found a clean definition.

pub mod docs;
pub mod outline;
pub mod syntax;
pub mod whole_file;

use crate::core::{FileParseError, Language, Node, SourceFile};
use serde::{Deserialize, Serialize};

pub use outline::PythonOutlineBackend;
pub use syntax::SyntaxTreeBackend;
pub use whole_file::WholeFileBackend;

/// A strategy that turns one source file into entity nodes
pub trait ParserBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, language: Language) -> bool;

    /// Structural backends emit one node per definition.
    fn is_structural(&self) -> bool {
        true
    }

    fn parse(&self, file: &SourceFile) -> Result<Vec<Node>, FileParseError>;
}

/// Configurable backend identifiers, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    SyntaxTree,
    PythonOutline,
    WholeFile,
}

impl BackendKind {
    pub fn defaults() -> Vec<BackendKind> {
        vec![
            BackendKind::SyntaxTree,
            BackendKind::PythonOutline,
            BackendKind::WholeFile,
        ]
    }
}

/// Size limits applied to node code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLimits {
    /// Cap on an entity node's code
    pub max_code_chars: usize,
    /// Cap on a whole-file node's code
    pub max_snippet_chars: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            max_code_chars: 20_000,
            max_snippet_chars: 2_000,
        }
    }
}

pub struct BackendChain {
    backends: Vec<Box<dyn ParserBackend>>,
}

impl BackendChain {
    pub fn new(backends: Vec<Box<dyn ParserBackend>>) -> Self {
        Self { backends }
    }

    pub fn from_kinds(kinds: &[BackendKind], limits: TextLimits) -> Self {
        // damaged Python is left to the outline parser
        let strict = if kinds.contains(&BackendKind::PythonOutline) {
            vec![Language::Python]
        } else {
            Vec::new()
        };
        let mut backends: Vec<Box<dyn ParserBackend>> = Vec::new();
        for kind in kinds {
            if backends.iter().any(|b| b.name() == kind_name(*kind)) {
                continue;
            }
            match kind {
                BackendKind::SyntaxTree => backends.push(Box::new(
                    SyntaxTreeBackend::new(limits).with_strict_languages(strict.clone()),
                )),
                BackendKind::PythonOutline => {
                    backends.push(Box::new(PythonOutlineBackend::new(limits)))
                }
                BackendKind::WholeFile => backends.push(Box::new(WholeFileBackend::new(limits))),
            }
        }
        Self { backends }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Runs the chain over one file.
    ///
    /// An `Err` means a structural backend rejected the file and no later one
    /// recovered it; the caller skips it. Files cut at the size cap bypass
    /// structural parsing.
    pub fn parse_file(&self, file: &SourceFile) -> Result<Vec<Node>, FileParseError> {
        let mut failure = None;

        if !file.is_truncated() {
            for backend in self.backends.iter().filter(|b| b.is_structural()) {
                if !backend.supports(file.language) {
                    continue;
                }
                match backend.parse(file) {
                    Ok(nodes) if !nodes.is_empty() => return Ok(nodes),
                    Ok(_) => log::debug!("{}: no definitions in {}", backend.name(), file.relative),
                    Err(e) => {
                        log::debug!("{}: {}", backend.name(), e);
                        failure.get_or_insert(e);
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        for backend in self.backends.iter().filter(|b| !b.is_structural()) {
            if backend.supports(file.language) {
                return backend.parse(file);
            }
        }
        Ok(Vec::new())
    }
}

impl Default for BackendChain {
    fn default() -> Self {
        Self::from_kinds(&BackendKind::defaults(), TextLimits::default())
    }
}

fn kind_name(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::SyntaxTree => syntax::NAME,
        BackendKind::PythonOutline => outline::NAME,
        BackendKind::WholeFile => whole_file::NAME,
    }
}

#[cfg(test)]
pub(crate) fn source_file(relative: &str, content: &str) -> SourceFile {
    SourceFile {
        path: std::path::PathBuf::from(relative),
        relative: relative.to_string(),
        language: Language::from_extension(relative.rsplit('.').next().unwrap_or(""))
            .expect("known extension"),
        content: content.to_string(),
        truncated_from: None,
    }
}
