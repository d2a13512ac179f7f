//! Code graph construction and querying
//!
//! Contains relationship extraction, metric annotation, graph assembly, publication
//! and query path resolution.

pub mod dependencies;
pub mod graph;
pub mod metrics;
pub mod query;
pub mod store;

// Re-export commonly used items
pub use graph::{CodeGraph, Direction, GraphMetadata, GraphStats, Snippet, Subgraph};
pub use query::{PathResolver, resolve};
pub use store::GraphStore;
