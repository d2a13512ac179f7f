//! Core types shared across codepath modules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Events emitted while a repository is turned into a graph
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Scanning has started
    StartScanning,
    /// Number of candidate files discovered
    FilesFound(usize),
    /// A file has been parsed
    FileProcessed(PathBuf),
    /// A file was skipped, with the reason
    FileSkipped(PathBuf, String),
    /// The scan stopped early; carries the number of files left unvisited
    Cancelled(usize),
    /// A pipeline stage finished
    Stage(String),
    /// Graph complete with message
    Complete(String),
    /// Error occurred
    Error(String),
}

/// Languages recognised by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Rust,
    Go,
    C,
    Cpp,
    Java,
    Ruby,
    Php,
    Swift,
    Kotlin,
    CSharp,
    Html,
    Css,
    Json,
    Yaml,
    Bash,
}

impl Language {
    pub const ALL: [Language; 19] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
        Language::Rust,
        Language::Go,
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::Ruby,
        Language::Php,
        Language::Swift,
        Language::Kotlin,
        Language::CSharp,
        Language::Html,
        Language::Css,
        Language::Json,
        Language::Yaml,
        Language::Bash,
    ];

    pub fn from_extension(extension: &str) -> Option<Self> {
        let language = match extension.to_ascii_lowercase().as_str() {
            "py" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "c" => Language::C,
            "h" | "cpp" | "cc" | "cxx" | "hpp" | "hh" => Language::Cpp,
            "java" => Language::Java,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "kt" => Language::Kotlin,
            "cs" => Language::CSharp,
            "html" => Language::Html,
            "css" => Language::Css,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "sh" | "bash" => Language::Bash,
            _ => return None,
        };
        Some(language)
    }

    /// Detects the language of a path; extensionless files are not candidates.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::CSharp => "c_sharp",
            Language::Html => "html",
            Language::Css => "css",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Bash => "bash",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind prefix of a node id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Function,
    Class,
    File,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Function => "function",
            NodeKind::Class => "class",
            NodeKind::File => "file",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "function" => Some(NodeKind::Function),
            "class" => Some(NodeKind::Class),
            "file" => Some(NodeKind::File),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the composite id `<kind>:<name>:<relative_file_path>:<start_line>`.
pub fn node_id(kind: NodeKind, name: &str, file: &str, start_line: usize) -> String {
    format!("{}:{}:{}:{}", kind, name, file, start_line)
}

/// A parsed code entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub code: String,
    #[serde(default, alias = "docstring")]
    pub doc: String,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cyclomatic: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_calls_in: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_calls_out: Option<usize>,
}

impl Node {
    pub fn new(
        kind: NodeKind,
        name: impl Into<String>,
        file: impl Into<String>,
        span: (usize, usize),
        language: Language,
    ) -> Self {
        let name = name.into();
        let file = file.into();
        Self {
            id: node_id(kind, &name, &file, span.0),
            name,
            file,
            start_line: span.0,
            end_line: span.1,
            code: String::new(),
            doc: String::new(),
            language: language.as_str().to_string(),
            loc: None,
            cyclomatic: None,
            num_calls_in: None,
            num_calls_out: None,
        }
    }

    pub fn with_code(mut self, code: String) -> Self {
        self.code = code;
        self
    }

    pub fn with_doc(mut self, doc: String) -> Self {
        self.doc = doc;
        self
    }

    /// Kind encoded in the id prefix.
    pub fn kind(&self) -> Option<NodeKind> {
        self.id.split(':').next().and_then(NodeKind::from_prefix)
    }

    pub fn language(&self) -> Option<Language> {
        Language::from_name(&self.language)
    }

    pub fn is_annotated(&self) -> bool {
        self.loc.is_some()
            && self.cyclomatic.is_some()
            && self.num_calls_in.is_some()
            && self.num_calls_out.is_some()
    }
}

/// Relationship recorded between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Call,
    Import,
    Inherit,
    Ambiguous,
}

impl EdgeType {
    /// `ambiguous` is a flagged `call`.
    pub fn is_call_like(&self) -> bool {
        matches!(self, EdgeType::Call | EdgeType::Ambiguous)
    }

    /// Edges whose endpoints must both be nodes.
    pub fn requires_target_node(&self) -> bool {
        !matches!(self, EdgeType::Import)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Call => "call",
            EdgeType::Import => "import",
            EdgeType::Inherit => "inherit",
            EdgeType::Ambiguous => "ambiguous",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    #[serde(alias = "from")]
    pub source: String,
    #[serde(alias = "to")]
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_type: EdgeType) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type,
        }
    }
}

/// Edge type as reported on an answer path; `unknown` when no record links the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathEdgeType {
    Call,
    Import,
    Inherit,
    Ambiguous,
    Unknown,
}

impl From<EdgeType> for PathEdgeType {
    fn from(edge_type: EdgeType) -> Self {
        match edge_type {
            EdgeType::Call => PathEdgeType::Call,
            EdgeType::Import => PathEdgeType::Import,
            EdgeType::Inherit => PathEdgeType::Inherit,
            EdgeType::Ambiguous => PathEdgeType::Ambiguous,
        }
    }
}

impl fmt::Display for PathEdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathEdgeType::Call => "call",
            PathEdgeType::Import => "import",
            PathEdgeType::Inherit => "inherit",
            PathEdgeType::Ambiguous => "ambiguous",
            PathEdgeType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: PathEdgeType,
}

impl PathEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_type: PathEdgeType) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type,
        }
    }
}

/// Resolver output: ordered node ids plus the edges connecting them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPath {
    pub path_nodes: Vec<String>,
    pub path_edges: Vec<PathEdge>,
}

impl AnswerPath {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bare seed list with no edges.
    pub fn seeds_only(seeds: &[String]) -> Self {
        Self {
            path_nodes: seeds.to_vec(),
            path_edges: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path_nodes.is_empty()
    }
}

/// A candidate file read from disk, ready for the backend chain
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Repository-relative path with forward slashes
    pub relative: String,
    pub language: Language,
    pub content: String,
    /// Original size in bytes when the content was cut at the size cap
    pub truncated_from: Option<u64>,
}

impl SourceFile {
    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated_from.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_format() {
        let node = Node::new(NodeKind::Function, "parse", "src/lib.py", (3, 9), Language::Python);
        assert_eq!(node.id, "function:parse:src/lib.py:3");
        assert_eq!(node.kind(), Some(NodeKind::Function));
        assert_eq!(node.language(), Some(Language::Python));
        assert!(!node.is_annotated());
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("h"), Some(Language::Cpp));
        assert_eq!(Language::from_extension("yml"), Some(Language::Yaml));
        assert_eq!(Language::from_extension("txt"), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
        assert_eq!(Language::from_name("c_sharp"), Some(Language::CSharp));
    }

    #[test]
    fn test_edge_accepts_legacy_keys() -> anyhow::Result<()> {
        let edge: Edge = serde_json::from_str(r#"{"from":"a","to":"b","type":"ambiguous"}"#)?;
        assert_eq!(edge, Edge::new("a", "b", EdgeType::Ambiguous));
        assert!(edge.edge_type.is_call_like());

        let json = serde_json::to_string(&edge)?;
        assert!(json.contains("\"source\":\"a\""));
        assert!(json.contains("\"type\":\"ambiguous\""));
        Ok(())
    }

    #[test]
    fn test_metrics_omitted_until_annotated() -> anyhow::Result<()> {
        let node = Node::new(NodeKind::Class, "Widget", "ui.ts", (1, 4), Language::TypeScript);
        let json = serde_json::to_string(&node)?;
        assert!(!json.contains("cyclomatic"));

        let legacy: Node = serde_json::from_str(
            r#"{"id":"file:a.rs:a.rs:1","name":"a.rs","file":"a.rs","start_line":1,"end_line":1,"docstring":"x"}"#,
        )?;
        assert_eq!(legacy.doc, "x");
        assert_eq!(legacy.kind(), Some(NodeKind::File));
        Ok(())
    }
}
