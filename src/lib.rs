pub mod config;
pub mod core;
pub mod format;
pub mod fs;
pub mod runner;
pub mod utils;

// Re-export key items for convenience
pub use config::{AnswerFormat, GraphConfig};
pub use core::{AnswerPath, Edge, EdgeType, Node, NodeKind, ScanEvent};
pub use runner::{build_graph, run, run_scan};
pub use utils::analysis::{CodeGraph, GraphStore, PathResolver, resolve};
