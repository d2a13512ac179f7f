use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utils::backends::{BackendKind, TextLimits};

pub const CONFIG_FILE: &str = "codepath.toml";

/// Rendering of a resolved answer path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerFormat {
    #[default]
    Json,
    Markdown,
    Mermaid,
}

/// Main configuration for graph construction and resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Repository root to scan
    pub path: PathBuf,
    /// Where the serialized graph is written
    pub output: PathBuf,
    /// Glob patterns to skip (e.g. "*.log", "node_modules")
    pub ignore_patterns: Vec<String>,
    /// Glob patterns to keep; when set, other files are skipped
    pub include_patterns: Vec<String>,
    /// Maximum directory depth to traverse
    pub max_depth: Option<usize>,
    /// Bytes read per file; larger files become truncated whole-file nodes
    pub max_file_size: u64,
    /// Characters kept in a whole-file node
    pub max_snippet_chars: usize,
    /// Characters kept in a function or class node
    pub max_code_chars: usize,
    /// Parser backends in priority order
    pub backends: Vec<BackendKind>,
    /// Worker threads for parsing; rayon's default pool when unset
    pub threads: Option<usize>,
    /// Stop visiting new files after this many seconds
    pub scan_timeout_secs: Option<u64>,
    /// Parse cache location; caching is off when unset
    pub cache: Option<PathBuf>,
    /// Longest shortest-path, in hops, the resolver accepts
    pub max_path_length: Option<usize>,
    /// Debug logging
    pub verbose: bool,
}

impl GraphConfig {
    /// Validates the configuration, ensuring the root exists and the limits are usable.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.path.exists() {
            anyhow::bail!("Path does not exist: {:?}", self.path);
        }
        if self.max_file_size == 0 || self.max_snippet_chars == 0 || self.max_code_chars == 0 {
            anyhow::bail!("Size limits must be greater than zero");
        }
        if self.backends.is_empty() {
            anyhow::bail!("At least one parser backend must be enabled");
        }
        Ok(())
    }

    /// Attempts to load configuration from `codepath.toml` in the current directory.
    pub fn load_from_file() -> Option<Self> {
        std::fs::read_to_string(CONFIG_FILE)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
    }

    pub fn text_limits(&self) -> TextLimits {
        TextLimits {
            max_code_chars: self.max_code_chars,
            max_snippet_chars: self.max_snippet_chars,
        }
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }

    /// Settings that change parser output; part of every parse-cache key.
    pub fn parse_fingerprint(&self) -> String {
        format!(
            "{:?}|{}|{}|{}",
            self.backends, self.max_file_size, self.max_code_chars, self.max_snippet_chars
        )
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        let defaults = vec![
            // Version Control
            ".git",
            ".hg",
            ".svn",
            ".bzr",
            // IDEs
            ".idea",
            ".vscode",
            ".vs",
            // Build / Dependency
            "node_modules",
            "target",
            "dist",
            "build",
            "out",
            "vendor",
            "venv",
            ".venv",
            ".tox",
            "__pycache__",
            ".mypy_cache",
            ".pytest_cache",
            // Lockfiles and generated metadata
            "package-lock.json",
            "pnpm-lock.yaml",
            "*.min.js",
        ];

        Self {
            path: PathBuf::from("."),
            output: PathBuf::from("graph.json"),
            ignore_patterns: defaults.into_iter().map(String::from).collect(),
            include_patterns: Vec::new(),
            max_depth: None,
            max_file_size: 1024 * 1024,
            max_snippet_chars: 2_000,
            max_code_chars: 20_000,
            backends: BackendKind::defaults(),
            threads: None,
            scan_timeout_secs: None,
            cache: None,
            max_path_length: Some(20),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = GraphConfig {
            path: PathBuf::from("non_existent_path_xyz_123"),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GraphConfig {
            backends: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(GraphConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> anyhow::Result<()> {
        let config: GraphConfig = toml::from_str(
            "output = \"out/graph.json\"\nbackends = [\"python_outline\", \"whole_file\"]\nmax_path_length = 6\n",
        )?;
        assert_eq!(config.output, PathBuf::from("out/graph.json"));
        assert_eq!(
            config.backends,
            vec![BackendKind::PythonOutline, BackendKind::WholeFile]
        );
        assert_eq!(config.max_path_length, Some(6));
        assert_eq!(config.max_file_size, 1024 * 1024);
        assert!(config.ignore_patterns.iter().any(|p| p == "node_modules"));
        Ok(())
    }
}
