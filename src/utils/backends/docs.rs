//! Doc-comment and code-span text helpers

/// Lines `start..=end` (1-based, inclusive) joined verbatim.
pub fn slice_lines(lines: &[&str], start: usize, end: usize) -> String {
    let from = start.saturating_sub(1).min(lines.len());
    let to = end.min(lines.len()).max(from);
    lines[from..to].join("\n")
}

/// Cuts `text` to `max_chars` characters and records how much was dropped.
pub fn truncate_chars(text: &str, max_chars: usize, label: &str) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let remaining = text[byte_idx..].chars().count();
            format!(
                "{}\n... ({}, {} more characters)",
                &text[..byte_idx],
                label,
                remaining
            )
        }
    }
}

fn strip_string_prefix(s: &str) -> &str {
    let prefix_len = s
        .chars()
        .take(2)
        .take_while(|c| matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B' | 'f' | 'F'))
        .count();
    &s[prefix_len..]
}

/// Docstring starting at the first non-blank line at or after `from` (0-based).
pub fn python_docstring(lines: &[&str], from: usize) -> String {
    let Some((offset, first)) = lines
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, l)| !l.trim().is_empty())
    else {
        return String::new();
    };
    let head = strip_string_prefix(first.trim());

    for marker in ["\"\"\"", "'''"] {
        let Some(rest) = head.strip_prefix(marker) else {
            continue;
        };
        if let Some(end) = rest.find(marker) {
            return rest[..end].trim().to_string();
        }
        let mut body = vec![rest.trim()];
        for line in &lines[offset + 1..] {
            if let Some(end) = line.find(marker) {
                body.push(line[..end].trim());
                return body.join("\n").trim().to_string();
            }
            body.push(line.trim());
        }
        // unterminated block, keep nothing
        return String::new();
    }

    for quote in ['"', '\''] {
        if head.len() >= 2 && head.starts_with(quote) && head.ends_with(quote) {
            return head[1..head.len() - 1].trim().to_string();
        }
    }
    String::new()
}

/// Comment block directly above line `start` (1-based), attributes skipped.
pub fn leading_comment(lines: &[&str], start: usize) -> String {
    let mut collected = Vec::new();
    let mut idx = start.saturating_sub(1).min(lines.len());
    while idx > 0 {
        idx -= 1;
        let t = lines[idx].trim();
        if t.starts_with("#[") || t.starts_with('@') {
            continue;
        }
        let stripped = if let Some(rest) = t.strip_prefix("///").or_else(|| t.strip_prefix("//!")) {
            rest
        } else if let Some(rest) = t.strip_prefix("//") {
            rest
        } else if t.starts_with("/*") || t.starts_with('*') || t.ends_with("*/") {
            t.trim_start_matches("/**")
                .trim_start_matches("/*")
                .trim_end_matches("*/")
                .trim_start_matches('*')
        } else {
            break;
        };
        collected.push(stripped.trim());
    }
    collected.reverse();
    collected.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_marks_remaining() {
        assert_eq!(truncate_chars("short", 10, "truncated"), "short");
        let cut = truncate_chars("héllo world", 5, "truncated");
        assert_eq!(cut, "héllo\n... (truncated, 6 more characters)");
    }

    #[test]
    fn test_python_docstring_forms() {
        let lines: Vec<&str> = "def f():\n    \"\"\"One line.\"\"\"\n    pass".lines().collect();
        assert_eq!(python_docstring(&lines, 1), "One line.");

        let lines: Vec<&str> = "def g():\n    r'''\n    Many\n    lines\n    '''\n".lines().collect();
        assert_eq!(python_docstring(&lines, 1), "Many\nlines");

        let lines: Vec<&str> = "def h():\n    return 1".lines().collect();
        assert_eq!(python_docstring(&lines, 1), "");
    }

    #[test]
    fn test_leading_comment_skips_attributes() {
        let lines: Vec<&str> = "use x;\n\n/// Adds numbers.\n/// Carefully.\n#[inline]\nfn add() {}"
            .lines()
            .collect();
        assert_eq!(leading_comment(&lines, 6), "Adds numbers.\nCarefully.");

        let lines: Vec<&str> = "/**\n * Box type\n */\nclass Box {}".lines().collect();
        assert_eq!(leading_comment(&lines, 4), "Box type");

        let lines: Vec<&str> = "int x;\nint f() {}".lines().collect();
        assert_eq!(leading_comment(&lines, 2), "");
    }

    #[test]
    fn test_slice_lines_clamps() {
        let lines = vec!["a", "b", "c"];
        assert_eq!(slice_lines(&lines, 2, 3), "b\nc");
        assert_eq!(slice_lines(&lines, 3, 9), "c");
    }
}
