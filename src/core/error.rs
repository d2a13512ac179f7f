//! Error taxonomy for the graph pipeline
//!
//! Per-item errors (`FileParseError`, `ExtractError`, `ResolveError`) are recovered
//! where they occur. Only `GraphError` leaves the library.

use crate::core::Edge;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single file could not be turned into nodes
#[derive(Debug, Error)]
pub enum FileParseError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("syntax error in {path} near line {line}")]
    Syntax { path: String, line: usize },
    #[error("unbalanced '{delimiter}' in {path} at line {line}")]
    Unbalanced {
        path: String,
        line: usize,
        delimiter: char,
    },
    #[error("no {language} grammar available")]
    Grammar { language: String },
}

/// Relationship or metric extraction failed for one node
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not parse span of {node_id}")]
    Parse { node_id: String },
    #[error("query failed for {language}: {message}")]
    Query { language: String, message: String },
}

/// Internal resolver failures; every variant is absorbed by the degradation ladder
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no path between {from} and {to}")]
    NoPathFound { from: String, to: String },
    #[error("no pair of seeds is connected")]
    NoPairwisePaths,
    #[error("spanning tree construction failed: {0}")]
    SpanningTree(String),
}

/// Persisted graph could not be read or written
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read graph {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse graph {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write graph {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// An edge dropped during assembly because an endpoint is not a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyWarning {
    pub edge: Edge,
    pub missing: String,
}

impl fmt::Display for AssemblyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dropping {} edge {} -> {}: unknown node {}",
            self.edge.edge_type, self.edge.source, self.edge.target, self.missing
        )
    }
}
