//! Published graph handle
//!
//! Readers take an `Arc` snapshot and keep using it even if a newer graph is
//! published while they work.

use crate::core::{AnswerPath, GraphError};
use crate::utils::analysis::graph::CodeGraph;
use crate::utils::analysis::query::PathResolver;
use std::path::Path;
use std::sync::{Arc, RwLock};

#[derive(Debug)]
pub struct GraphStore {
    current: RwLock<Arc<CodeGraph>>,
    max_hops: Option<usize>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(CodeGraph::empty())
    }
}

impl GraphStore {
    pub fn new(graph: CodeGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(graph)),
            max_hops: None,
        }
    }

    pub fn with_max_hops(mut self, max_hops: Option<usize>) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Startup load; this is the only failure that leaves the graph layer.
    pub fn load_from_file(path: &Path) -> Result<Self, GraphError> {
        let graph = CodeGraph::load(path)?;
        log::info!(
            "Loaded graph {:?}: {} nodes, {} edges",
            path,
            graph.metadata().node_count,
            graph.metadata().edge_count
        );
        Ok(Self::new(graph))
    }

    pub fn snapshot(&self) -> Arc<CodeGraph> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swaps in a new graph and returns the previous one.
    pub fn publish(&self, graph: CodeGraph) -> Arc<CodeGraph> {
        let next = Arc::new(graph);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    /// Resolves seeds against the current snapshot; an empty graph yields an empty path.
    pub fn resolve<S: AsRef<str>>(&self, seed_ids: &[S]) -> AnswerPath {
        let graph = self.snapshot();
        PathResolver::new(&graph)
            .with_max_hops(self.max_hops)
            .resolve(seed_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Language, Node, NodeKind, ScanSummary};
    use std::thread;

    fn one_node_graph(name: &str) -> CodeGraph {
        let node = Node::new(NodeKind::Function, name, "s.rs", (1, 1), Language::Rust);
        CodeGraph::assemble(vec![node], Vec::new(), &ScanSummary::default())
    }

    #[test]
    fn test_empty_store_resolves_empty() {
        let store = GraphStore::default();
        assert!(store.resolve(&["function:a:s.rs:1"]).is_empty());
    }

    #[test]
    fn test_snapshot_survives_publish() {
        let store = GraphStore::new(one_node_graph("old"));
        let before = store.snapshot();

        let previous = store.publish(one_node_graph("new"));
        assert!(previous.contains("function:old:s.rs:1"));
        assert!(before.contains("function:old:s.rs:1"));
        assert!(store.snapshot().contains("function:new:s.rs:1"));
        assert_eq!(
            store.resolve(&["function:new:s.rs:1"]).path_nodes,
            vec!["function:new:s.rs:1".to_string()]
        );
    }

    #[test]
    fn test_concurrent_readers_see_whole_graphs() {
        let store = Arc::new(GraphStore::new(one_node_graph("a")));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let graph = store.snapshot();
                        assert_eq!(graph.nodes().len(), 1);
                        assert_eq!(graph.metadata().node_count, 1);
                    }
                })
            })
            .collect();
        for name in ["b", "c", "d"] {
            store.publish(one_node_graph(name));
        }
        for reader in readers {
            reader.join().expect("reader panicked");
        }
    }
}
