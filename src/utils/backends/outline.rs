//! Python outline parser
//!
//! A grammar-free fallback for Python: validates string and bracket structure, then
//! recovers `def`/`class` blocks from indentation.

use super::docs::{python_docstring, slice_lines, truncate_chars};
use super::{ParserBackend, TextLimits};
use crate::core::{FileParseError, Language, Node, NodeKind, SourceFile};
use lazy_static::lazy_static;
use regex::Regex;

pub const NAME: &str = "python_outline";

lazy_static! {
    static ref DEF_HEADER: Regex =
        Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap();
    static ref CLASS_HEADER: Regex =
        Regex::new(r"^(\s*)class\s+([A-Za-z_][A-Za-z0-9_]*)\s*[:(]").unwrap();
}

#[derive(Debug, Clone, Copy, Default)]
struct LineState {
    /// Open bracket depth when the line begins
    depth: usize,
    /// The line begins inside a triple-quoted string
    in_string: bool,
}

pub struct PythonOutlineBackend {
    limits: TextLimits,
}

impl PythonOutlineBackend {
    pub fn new(limits: TextLimits) -> Self {
        Self { limits }
    }
}

impl ParserBackend for PythonOutlineBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, language: Language) -> bool {
        language == Language::Python
    }

    fn parse(&self, file: &SourceFile) -> Result<Vec<Node>, FileParseError> {
        let lines: Vec<&str> = file.content.lines().collect();
        let states = scan_structure(&lines, &file.relative)?;
        let mut nodes = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            if states[idx].in_string || states[idx].depth > 0 {
                continue;
            }
            let (kind, caps) = if let Some(caps) = DEF_HEADER.captures(line) {
                (NodeKind::Function, caps)
            } else if let Some(caps) = CLASS_HEADER.captures(line) {
                (NodeKind::Class, caps)
            } else {
                continue;
            };
            let indent = indent_width(&caps[1]);
            let name = caps[2].to_string();

            let header_end = header_end(&lines, &states, idx, &file.relative)?;
            let end = block_end(&lines, &states, header_end, indent);
            let start = idx + 1;

            let code = truncate_chars(
                &slice_lines(&lines, start, end + 1),
                self.limits.max_code_chars,
                "truncated",
            );
            let doc = if end > header_end {
                python_docstring(&lines, header_end + 1)
            } else {
                String::new()
            };

            nodes.push(
                Node::new(kind, name, file.relative.as_str(), (start, end + 1), file.language)
                    .with_code(code)
                    .with_doc(doc),
            );
        }

        Ok(nodes)
    }
}

fn indent_width(prefix: &str) -> usize {
    prefix.chars().map(|c| if c == '\t' { 8 } else { 1 }).sum()
}

/// `line` up to its trailing comment; `#` inside a quoted string is kept.
fn code_part(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (pos, c) in line.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return &line[..pos],
            None => {}
        }
    }
    line
}

/// Index of the line that closes a definition header with `:`.
fn header_end(
    lines: &[&str],
    states: &[LineState],
    start: usize,
    path: &str,
) -> Result<usize, FileParseError> {
    for idx in start..lines.len() {
        let next_depth = states.get(idx + 1).map(|s| s.depth).unwrap_or(0);
        if next_depth > 0 {
            continue;
        }
        let code = code_part(lines[idx]);
        let tail = match code.rfind(|c: char| c == ')' || c == ']') {
            Some(pos) => &code[pos + 1..],
            None => code,
        };
        if tail.contains(':') {
            return Ok(idx);
        }
        return Err(FileParseError::Syntax {
            path: path.to_string(),
            line: idx + 1,
        });
    }
    Err(FileParseError::Syntax {
        path: path.to_string(),
        line: start + 1,
    })
}

/// Index of the last non-blank line belonging to the block opened at `header_end`.
fn block_end(lines: &[&str], states: &[LineState], header_end: usize, indent: usize) -> usize {
    let mut end = header_end;
    for idx in header_end + 1..lines.len() {
        let line = lines[idx];
        let trimmed = line.trim();
        if states[idx].in_string || states[idx].depth > 0 {
            end = idx;
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let width = indent_width(&line[..line.len() - line.trim_start().len()]);
        if width <= indent {
            break;
        }
        end = idx;
    }
    end
}

/// Tracks strings and brackets across the file, failing on structural errors.
fn scan_structure(lines: &[&str], path: &str) -> Result<Vec<LineState>, FileParseError> {
    let mut states = Vec::with_capacity(lines.len());
    let mut stack: Vec<(char, usize)> = Vec::new();
    // (quote char, triple, line opened)
    let mut string: Option<(char, bool, usize)> = None;

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        states.push(LineState {
            depth: stack.len(),
            in_string: string.is_some(),
        });

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if let Some((quote, triple, _)) = string {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == quote {
                    if !triple {
                        string = None;
                    } else if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                        string = None;
                        i += 2;
                    }
                }
                i += 1;
                continue;
            }
            match c {
                '#' => break,
                '"' | '\'' => {
                    let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                    string = Some((c, triple, line_no));
                    if triple {
                        i += 2;
                    }
                }
                '(' | '[' | '{' => stack.push((c, line_no)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return Err(FileParseError::Unbalanced {
                                path: path.to_string(),
                                line: line_no,
                                delimiter: c,
                            });
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }

        if let Some((_, false, opened)) = string
            && !line.ends_with('\\')
        {
            return Err(FileParseError::Syntax {
                path: path.to_string(),
                line: opened,
            });
        }
    }

    if let Some((_, _, opened)) = string {
        return Err(FileParseError::Syntax {
            path: path.to_string(),
            line: opened,
        });
    }
    if let Some((open, line)) = stack.pop() {
        return Err(FileParseError::Unbalanced {
            path: path.to_string(),
            line,
            delimiter: open,
        });
    }
    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::backends::source_file;

    fn outline(code: &str) -> Result<Vec<Node>, FileParseError> {
        PythonOutlineBackend::new(TextLimits::default()).parse(&source_file("mod.py", code))
    }

    #[test]
    fn test_blocks_follow_indentation() {
        let code = "import os\n\nclass Store:\n    \"\"\"Keeps items.\"\"\"\n\n    def put(self, item):\n        self.items.append(item)\n\n    async def flush(self):\n        pass\n\ndef helper(\n    a,\n    b,\n):\n    return a\n";
        let nodes = outline(code).expect("parsed");
        let spans: Vec<(&str, usize, usize)> = nodes
            .iter()
            .map(|n| (n.name.as_str(), n.start_line, n.end_line))
            .collect();
        assert_eq!(
            spans,
            vec![("Store", 3, 10), ("put", 6, 7), ("flush", 9, 10), ("helper", 12, 16)]
        );
        assert_eq!(nodes[0].doc, "Keeps items.");
    }

    #[test]
    fn test_defs_inside_strings_are_ignored() {
        let code = "TEMPLATE = '''\ndef fake():\n    pass\n'''\n\ndef real():\n    return TEMPLATE\n";
        let nodes = outline(code).expect("parsed");
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["real"]);
    }

    #[test]
    fn test_hash_inside_default_argument() {
        let code = "def f(x=\"#\", y='a#b'):  # trailing\n    return x\n";
        let nodes = outline(code).expect("parsed");
        assert_eq!(nodes.len(), 1);
        assert_eq!((nodes[0].start_line, nodes[0].end_line), (1, 2));
        assert_eq!(code_part("x = '#'  # note"), "x = '#'  ");
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            outline("def f(:\n    pass\n"),
            Err(FileParseError::Unbalanced { .. })
        ));
        assert!(matches!(
            outline("x = 'open\n"),
            Err(FileParseError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            outline("def g()\n    pass\n"),
            Err(FileParseError::Syntax { line: 1, .. })
        ));
    }
}
