use super::docs::{leading_comment, python_docstring, slice_lines, truncate_chars};
use super::{ParserBackend, TextLimits};
use crate::core::{FileParseError, Language, Node, SourceFile};
use crate::utils::ast;

pub const NAME: &str = "syntax_tree";

/// Tree-sitter backend: one node per function, method, class or type definition
///
/// Trees with error nodes keep only the definitions whose own subtree parsed cleanly.
/// Languages listed as strict reject the whole file instead, leaving the verdict to
/// the next structural backend.
pub struct SyntaxTreeBackend {
    limits: TextLimits,
    strict: Vec<Language>,
}

impl SyntaxTreeBackend {
    pub fn new(limits: TextLimits) -> Self {
        Self {
            limits,
            strict: Vec::new(),
        }
    }

    pub fn with_strict_languages(mut self, languages: Vec<Language>) -> Self {
        self.strict = languages;
        self
    }
}

impl ParserBackend for SyntaxTreeBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, language: Language) -> bool {
        language.has_grammar()
    }

    fn parse(&self, file: &SourceFile) -> Result<Vec<Node>, FileParseError> {
        let Some(profile) = file.language.profile() else {
            return Ok(Vec::new());
        };
        let Some(tree) = ast::parse(file.language, &file.content) else {
            log::warn!("{}: {} parser unavailable", file.relative, file.language);
            return Ok(Vec::new());
        };
        let damaged = match ast::first_error_line(&tree) {
            Some(line) if self.strict.contains(&file.language) => {
                return Err(FileParseError::Syntax {
                    path: file.relative.clone(),
                    line,
                });
            }
            Some(line) => {
                log::debug!(
                    "{}: syntax error at line {}; keeping clean definitions",
                    file.relative,
                    line
                );
                true
            }
            None => false,
        };

        let source = file.content.as_bytes();
        let lines: Vec<&str> = file.content.lines().collect();
        let mut nodes = Vec::new();

        for syntax_node in ast::descendants(tree.root_node()) {
            let Some((kind, name)) = ast::classify_definition(syntax_node, source, profile) else {
                continue;
            };
            if damaged && syntax_node.has_error() {
                continue;
            }
            let (start, end) = ast::line_span(syntax_node);
            let code = truncate_chars(
                &slice_lines(&lines, start, end),
                self.limits.max_code_chars,
                "truncated",
            );
            let doc = if file.language == Language::Python {
                syntax_node
                    .child_by_field_name("body")
                    .map(|body| body.start_position().row)
                    .filter(|row| *row + 1 > start)
                    .map(|row| python_docstring(&lines, row))
                    .unwrap_or_default()
            } else {
                leading_comment(&lines, start)
            };

            nodes.push(
                Node::new(kind, name, file.relative.as_str(), (start, end), file.language)
                    .with_code(code)
                    .with_doc(doc),
            );
        }

        Ok(nodes)
    }
}
