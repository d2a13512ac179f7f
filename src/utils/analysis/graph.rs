//! Assembled code graph
//!
//! `CodeGraph` is built once from scanned nodes and extracted edges and is never
//! mutated afterwards. Traversable edges (both endpoints are nodes) are mirrored into
//! a petgraph `DiGraph` whose node `i` is `nodes[i]` and whose edge weight is the
//! position of the edge in the stored edge list.

use crate::core::{AssemblyWarning, Edge, GraphError, Node, ScanSummary};
use petgraph::Direction as PetDirection;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

pub const SCHEMA_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub dropped_edges: usize,
    pub languages: Vec<String>,
    pub schema_version: String,
    pub generated_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self {
            node_count: 0,
            edge_count: 0,
            files_processed: 0,
            files_skipped: 0,
            dropped_edges: 0,
            languages: Vec::new(),
            schema_version: SCHEMA_VERSION.to_string(),
            generated_by: format!("codepath {}", env!("CARGO_PKG_VERSION")),
            generated_at: None,
        }
    }
}

#[derive(Deserialize)]
struct GraphDocument {
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    metadata: GraphMetadata,
}

#[derive(Serialize)]
struct GraphDocumentRef<'a> {
    nodes: &'a [Node],
    edges: &'a [Edge],
    metadata: &'a GraphMetadata,
}

/// Neighbour direction relative to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Both,
}

/// Code lookup result handed to summarizers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub id: String,
    pub name: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    pub code: String,
    pub doc: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub connected_components: usize,
    pub average_degree: f64,
    pub node_types: BTreeMap<String, usize>,
    pub edge_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct CodeGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    topology: DiGraph<usize, usize>,
    /// (source, target) -> position of the first stored edge for the pair
    pair_index: HashMap<(usize, usize), usize>,
    metadata: GraphMetadata,
}

impl Default for CodeGraph {
    fn default() -> Self {
        Self::empty()
    }
}

impl CodeGraph {
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), GraphMetadata::default()).0
    }

    /// Assembles scanned nodes and extracted edges into a graph.
    ///
    /// Edges with a missing endpoint are dropped with a warning; import edges may
    /// point at external module strings.
    pub fn assemble(nodes: Vec<Node>, edges: Vec<Edge>, summary: &ScanSummary) -> Self {
        let metadata = GraphMetadata {
            files_processed: summary.files_processed,
            files_skipped: summary.files_skipped,
            languages: summary.languages.iter().cloned().collect(),
            generated_at: Some(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };
        let (graph, warnings) = Self::from_parts(nodes, edges, metadata);
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        log::info!(
            "Assembled graph: {} nodes, {} edges ({} dropped)",
            graph.metadata.node_count,
            graph.metadata.edge_count,
            graph.metadata.dropped_edges
        );
        graph
    }

    /// Builds the graph, returning the dropped-edge warnings.
    pub fn from_parts(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        mut metadata: GraphMetadata,
    ) -> (Self, Vec<AssemblyWarning>) {
        let mut kept_nodes = Vec::with_capacity(nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if index.contains_key(&node.id) {
                log::warn!("Duplicate node id {} ignored", node.id);
                continue;
            }
            index.insert(node.id.clone(), kept_nodes.len());
            kept_nodes.push(node);
        }

        let mut topology = DiGraph::with_capacity(kept_nodes.len(), edges.len());
        for idx in 0..kept_nodes.len() {
            topology.add_node(idx);
        }

        let mut kept_edges = Vec::with_capacity(edges.len());
        let mut pair_index = HashMap::new();
        let mut warnings = Vec::new();
        for edge in edges {
            let source = index.get(&edge.source).copied();
            let target = index.get(&edge.target).copied();
            let missing = match (source, target) {
                (None, _) => Some(edge.source.clone()),
                (Some(_), None) if edge.edge_type.requires_target_node() => {
                    Some(edge.target.clone())
                }
                _ => None,
            };
            if let Some(missing) = missing {
                warnings.push(AssemblyWarning { edge, missing });
                continue;
            }

            let position = kept_edges.len();
            if let (Some(s), Some(t)) = (source, target) {
                topology.add_edge(NodeIndex::new(s), NodeIndex::new(t), position);
                pair_index.entry((s, t)).or_insert(position);
            }
            kept_edges.push(edge);
        }

        metadata.node_count = kept_nodes.len();
        metadata.edge_count = kept_edges.len();
        metadata.dropped_edges += warnings.len();
        if metadata.schema_version.is_empty() {
            metadata.schema_version = SCHEMA_VERSION.to_string();
        }

        let graph = Self {
            nodes: kept_nodes,
            index,
            edges: kept_edges,
            topology,
            pair_index,
            metadata,
        };
        (graph, warnings)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn node_at(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    /// Direct successors of node `idx`, in stored edge order.
    pub(crate) fn successors(&self, idx: usize) -> Vec<usize> {
        let mut out: Vec<(usize, usize)> = self
            .topology
            .edges_directed(NodeIndex::new(idx), PetDirection::Outgoing)
            .map(|e| (*e.weight(), e.target().index()))
            .collect();
        out.sort_unstable();
        let mut seen = HashSet::new();
        out.into_iter()
            .filter_map(|(_, t)| seen.insert(t).then_some(t))
            .collect()
    }

    /// First stored edge from `source` to `target`, if any.
    pub(crate) fn edge_between(&self, source: usize, target: usize) -> Option<&Edge> {
        self.pair_index
            .get(&(source, target))
            .map(|&pos| &self.edges[pos])
    }

    pub fn snippet(&self, id: &str) -> Option<Snippet> {
        self.node(id).map(|n| Snippet {
            id: n.id.clone(),
            name: n.name.clone(),
            file: n.file.clone(),
            start_line: n.start_line,
            end_line: n.end_line,
            language: n.language.clone(),
            code: n.code.clone(),
            doc: n.doc.clone(),
        })
    }

    /// Snippets for the ids that exist, in request order.
    pub fn snippets<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Snippet> {
        ids.iter().filter_map(|id| self.snippet(id.as_ref())).collect()
    }

    pub fn neighbors(&self, id: &str, direction: Direction) -> Vec<&Node> {
        let Some(idx) = self.position(id) else {
            return Vec::new();
        };
        let node = NodeIndex::new(idx);
        let mut found: Vec<usize> = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            found.extend(self.successors(idx));
        }
        if matches!(direction, Direction::In | Direction::Both) {
            let mut incoming: Vec<(usize, usize)> = self
                .topology
                .edges_directed(node, PetDirection::Incoming)
                .map(|e| (*e.weight(), e.source().index()))
                .collect();
            incoming.sort_unstable();
            found.extend(incoming.into_iter().map(|(_, s)| s));
        }
        let mut seen = HashSet::new();
        found
            .into_iter()
            .filter(|i| seen.insert(*i))
            .map(|i| &self.nodes[i])
            .collect()
    }

    pub fn nodes_in_file(&self, file: &str) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.file == file).collect()
    }

    /// Nodes whose name contains `pattern`, ignoring case.
    pub fn find_nodes_by_pattern(&self, pattern: &str) -> Vec<&Node> {
        let needle = pattern.to_lowercase();
        self.nodes
            .iter()
            .filter(|n| n.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Induced subgraph over `ids`, optionally grown by one hop in both directions.
    pub fn subgraph<S: AsRef<str>>(&self, ids: &[S], expand_neighbors: bool) -> Subgraph {
        let mut members: Vec<usize> = Vec::new();
        let mut seen = HashSet::new();
        for id in ids {
            if let Some(idx) = self.position(id.as_ref())
                && seen.insert(idx)
            {
                members.push(idx);
            }
        }
        if expand_neighbors {
            let base = members.clone();
            for idx in base {
                for neighbor in self.neighbors(&self.nodes[idx].id, Direction::Both) {
                    if let Some(n) = self.position(&neighbor.id)
                        && seen.insert(n)
                    {
                        members.push(n);
                    }
                }
            }
        }

        let edges = self
            .edges
            .iter()
            .filter(|e| {
                matches!(
                    (self.position(&e.source), self.position(&e.target)),
                    (Some(s), Some(t)) if seen.contains(&s) && seen.contains(&t)
                )
            })
            .cloned()
            .collect();
        Subgraph {
            nodes: members.into_iter().map(|i| self.nodes[i].clone()).collect(),
            edges,
        }
    }

    pub fn stats(&self) -> GraphStats {
        let mut node_types = BTreeMap::new();
        for node in &self.nodes {
            let kind = node.kind().map(|k| k.as_str()).unwrap_or("unknown");
            *node_types.entry(kind.to_string()).or_insert(0) += 1;
        }
        let mut edge_types = BTreeMap::new();
        for edge in &self.edges {
            *edge_types.entry(edge.edge_type.to_string()).or_insert(0) += 1;
        }
        let average_degree = if self.nodes.is_empty() {
            0.0
        } else {
            2.0 * self.topology.edge_count() as f64 / self.nodes.len() as f64
        };

        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            connected_components: petgraph::algo::connected_components(&self.topology),
            average_degree,
            node_types,
            edge_types,
        }
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        let doc = GraphDocumentRef {
            nodes: &self.nodes,
            edges: &self.edges,
            metadata: &self.metadata,
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Parses a serialized graph, applying the same tolerant edge checks as assembly.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let doc: GraphDocument = serde_json::from_str(json)?;
        let (graph, warnings) = Self::from_parts(doc.nodes, doc.edges, doc.metadata);
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        Ok(graph)
    }

    /// Writes the graph next to `path` and renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), GraphError> {
        let json = self.to_json()?;
        let write_err = |source| GraphError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let staging = path.with_extension("json.partial");
        fs::write(&staging, json).map_err(write_err)?;
        fs::rename(&staging, path).map_err(write_err)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let content = fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| GraphError::Load {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EdgeType, Language, NodeKind};
    use tempfile::TempDir;

    fn func(name: &str, line: usize) -> Node {
        Node::new(NodeKind::Function, name, "m.py", (line, line + 1), Language::Python)
    }

    fn sample() -> CodeGraph {
        let (a, b, c) = (func("a", 1), func("b", 4), func("c", 7));
        let edges = vec![
            Edge::new(&a.id, &b.id, EdgeType::Call),
            Edge::new(&b.id, &c.id, EdgeType::Call),
            Edge::new(&a.id, "os", EdgeType::Import),
            Edge::new(&a.id, "function:ghost:m.py:99", EdgeType::Call),
        ];
        CodeGraph::assemble(vec![a, b, c], edges, &ScanSummary::default())
    }

    #[test]
    fn test_dangling_call_edges_dropped() {
        let (_, warnings) = CodeGraph::from_parts(
            vec![func("a", 1)],
            vec![
                Edge::new("function:a:m.py:1", "function:x:m.py:5", EdgeType::Ambiguous),
                Edge::new("function:a:m.py:1", "requests", EdgeType::Import),
            ],
            GraphMetadata::default(),
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].missing, "function:x:m.py:5");

        let graph = sample();
        assert_eq!(graph.metadata().edge_count, 3);
        assert_eq!(graph.metadata().dropped_edges, 1);
        assert_eq!(graph.metadata().schema_version, SCHEMA_VERSION);
        for edge in graph.edges().iter().filter(|e| e.edge_type.is_call_like()) {
            assert!(graph.contains(&edge.source) && graph.contains(&edge.target));
        }
    }

    #[test]
    fn test_neighbors_and_lookup() {
        let graph = sample();
        let out: Vec<&str> = graph
            .neighbors("function:b:m.py:4", Direction::Out)
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(out, vec!["c"]);
        let both: Vec<&str> = graph
            .neighbors("function:b:m.py:4", Direction::Both)
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(both, vec!["c", "a"]);
        assert!(graph.neighbors("missing", Direction::Both).is_empty());

        assert_eq!(graph.find_nodes_by_pattern("B").len(), 1);
        assert_eq!(graph.nodes_in_file("m.py").len(), 3);
        assert_eq!(graph.snippets(&["function:c:m.py:7", "nope"]).len(), 1);
    }

    #[test]
    fn test_subgraph_and_stats() {
        let graph = sample();
        let sub = graph.subgraph(&["function:a:m.py:1"], false);
        assert_eq!(sub.nodes.len(), 1);
        assert!(sub.edges.is_empty());

        let grown = graph.subgraph(&["function:a:m.py:1"], true);
        assert_eq!(grown.nodes.len(), 2);
        assert_eq!(grown.edges.len(), 1);

        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.connected_components, 1);
        assert_eq!(stats.edge_types.get("import"), Some(&1));
        assert_eq!(stats.node_types.get("function"), Some(&3));
    }

    #[test]
    fn test_save_load_round_trip() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out/graph.json");
        let graph = sample();
        graph.save(&path)?;

        let loaded = CodeGraph::load(&path)?;
        assert_eq!(loaded.nodes(), graph.nodes());
        assert_eq!(loaded.edges(), graph.edges());
        assert_eq!(loaded.metadata().node_count, 3);
        Ok(())
    }

    #[test]
    fn test_load_failures() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("graph.json");
        assert!(matches!(CodeGraph::load(&path), Err(GraphError::Io { .. })));

        std::fs::write(&path, "{ not json")?;
        assert!(matches!(CodeGraph::load(&path), Err(GraphError::Load { .. })));

        std::fs::write(
            &path,
            r#"{"nodes":[{"id":"function:a:x.py:1","name":"a","file":"x.py","start_line":1,"end_line":2}],
               "edges":[{"from":"function:a:x.py:1","to":"json","type":"import"}]}"#,
        )?;
        let legacy = CodeGraph::load(&path)?;
        assert_eq!(legacy.edges().len(), 1);
        assert_eq!(legacy.metadata().schema_version, SCHEMA_VERSION);
        Ok(())
    }
}
