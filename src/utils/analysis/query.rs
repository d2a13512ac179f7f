//! Query path resolution
//!
//! Connects the seed nodes returned by an external search with the smallest
//! explanation the call graph offers. Two seeds get a shortest path; three or more
//! get a Steiner-tree approximation (pairwise shortest paths joined by a minimum
//! spanning tree). Every failure degrades to a simpler answer, down to the bare
//! seed list, so `resolve` never fails.

use crate::core::{AnswerPath, PathEdge, PathEdgeType, ResolveError};
use crate::utils::analysis::graph::CodeGraph;
use petgraph::unionfind::UnionFind;
use std::collections::{HashSet, VecDeque};

/// Shortest path between two seeds, by seed position
#[derive(Debug, Clone)]
struct Leg {
    from: usize,
    to: usize,
    cost: usize,
    path: Vec<usize>,
}

pub struct PathResolver<'a> {
    graph: &'a CodeGraph,
    max_hops: Option<usize>,
}

impl<'a> PathResolver<'a> {
    pub fn new(graph: &'a CodeGraph) -> Self {
        Self {
            graph,
            max_hops: None,
        }
    }

    /// Paths longer than `max_hops` edges count as no path.
    pub fn with_max_hops(mut self, max_hops: Option<usize>) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn resolve<S: AsRef<str>>(&self, seed_ids: &[S]) -> AnswerPath {
        let seeds = self.valid_seeds(seed_ids);
        match seeds.as_slice() {
            [] => AnswerPath::empty(),
            [only] => self.seed_answer(&[*only]),
            [s, t] => match self.connect(*s, *t) {
                Ok(path) => AnswerPath {
                    path_nodes: self.ids(&path),
                    path_edges: self.path_edges(&path),
                },
                Err(e) => {
                    log::debug!("{}; returning both seeds unconnected", e);
                    self.seed_answer(&seeds)
                }
            },
            _ => self.connect_many(&seeds),
        }
    }

    /// De-duplicated seeds present in the graph, in caller order.
    fn valid_seeds<S: AsRef<str>>(&self, seed_ids: &[S]) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut seeds = Vec::with_capacity(seed_ids.len());
        for id in seed_ids {
            let id = id.as_ref();
            match self.graph.position(id) {
                Some(idx) if seen.insert(idx) => seeds.push(idx),
                Some(_) => {}
                None => log::debug!("Ignoring unknown seed {}", id),
            }
        }
        seeds
    }

    /// Breadth-first search along stored edge direction.
    fn shortest_path(&self, from: usize, to: usize) -> Result<Vec<usize>, ResolveError> {
        let not_found = || ResolveError::NoPathFound {
            from: self.graph.node_at(from).id.clone(),
            to: self.graph.node_at(to).id.clone(),
        };
        if from == to {
            return Ok(vec![from]);
        }

        let mut parent = vec![None; self.graph.nodes().len()];
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([(from, 0usize)]);
        while let Some((current, depth)) = queue.pop_front() {
            if self.max_hops.is_some_and(|max| depth >= max) {
                continue;
            }
            for next in self.graph.successors(current) {
                if !visited.insert(next) {
                    continue;
                }
                parent[next] = Some(current);
                if next == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(prev) = parent[cursor] {
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Ok(path);
                }
                queue.push_back((next, depth + 1));
            }
        }
        Err(not_found())
    }

    /// Shortest path `s -> t`, else `t -> s`.
    fn connect(&self, s: usize, t: usize) -> Result<Vec<usize>, ResolveError> {
        self.shortest_path(s, t).or_else(|_| self.shortest_path(t, s))
    }

    fn connect_many(&self, seeds: &[usize]) -> AnswerPath {
        let legs = self.pairwise_legs(seeds);
        if legs.is_empty() {
            log::debug!("{}; returning seeds only", ResolveError::NoPairwisePaths);
            return self.seed_answer(seeds);
        }

        match spanning_tree(seeds.len(), &legs) {
            Ok(selected) => self.union_answer(seeds, selected.iter().map(|&i| &legs[i].path)),
            Err(e) => {
                log::warn!("{}; falling back to the shortest pairwise path", e);
                self.fallback_answer(seeds, &legs)
            }
        }
    }

    /// Ladder below the spanning tree: shortest leg, first connected consecutive
    /// pair, bare seeds.
    ///
    /// `connect_many` always passes at least one leg, so the consecutive rung is
    /// only reached with an empty `legs`.
    fn fallback_answer(&self, seeds: &[usize], legs: &[Leg]) -> AnswerPath {
        if let Some(best) = legs.iter().min_by_key(|leg| leg.cost) {
            return self.union_answer(seeds, std::iter::once(&best.path));
        }
        match self.connect_consecutive(seeds) {
            Ok(path) => self.union_answer(seeds, std::iter::once(&path)),
            Err(e) => {
                log::debug!("{}; returning seeds only", e);
                self.seed_answer(seeds)
            }
        }
    }

    /// Shortest paths for every unordered seed pair that is connected either way.
    fn pairwise_legs(&self, seeds: &[usize]) -> Vec<Leg> {
        let mut legs = Vec::new();
        for i in 0..seeds.len() {
            for j in (i + 1)..seeds.len() {
                match self.connect(seeds[i], seeds[j]) {
                    Ok(path) => legs.push(Leg {
                        from: i,
                        to: j,
                        cost: path.len() - 1,
                        path,
                    }),
                    Err(e) => log::debug!("{}", e),
                }
            }
        }
        legs
    }

    /// First adjacent seed pair, in input order, that connects.
    fn connect_consecutive(&self, seeds: &[usize]) -> Result<Vec<usize>, ResolveError> {
        for pair in seeds.windows(2) {
            if let Ok(path) = self.connect(pair[0], pair[1]) {
                return Ok(path);
            }
        }
        Err(ResolveError::NoPairwisePaths)
    }

    /// Seeds first, then path-interior nodes in first-visit order; edges de-duplicated
    /// by ordered (source, target).
    fn union_answer<'p>(
        &self,
        seeds: &[usize],
        paths: impl Iterator<Item = &'p Vec<usize>>,
    ) -> AnswerPath {
        let mut nodes: Vec<usize> = seeds.to_vec();
        let mut seen_nodes: HashSet<usize> = seeds.iter().copied().collect();
        let mut seen_edges = HashSet::new();
        let mut path_edges = Vec::new();

        for path in paths {
            for &idx in path {
                if seen_nodes.insert(idx) {
                    nodes.push(idx);
                }
            }
            for pair in path.windows(2) {
                if seen_edges.insert((pair[0], pair[1])) {
                    path_edges.push(self.path_edge(pair[0], pair[1]));
                }
            }
        }

        AnswerPath {
            path_nodes: self.ids(&nodes),
            path_edges,
        }
    }

    fn path_edges(&self, path: &[usize]) -> Vec<PathEdge> {
        path.windows(2)
            .map(|pair| self.path_edge(pair[0], pair[1]))
            .collect()
    }

    /// Edge for a consecutive pair, typed from the stored edge in either direction.
    fn path_edge(&self, a: usize, b: usize) -> PathEdge {
        let edge_type = self
            .graph
            .edge_between(a, b)
            .or_else(|| self.graph.edge_between(b, a))
            .map(|e| PathEdgeType::from(e.edge_type))
            .unwrap_or(PathEdgeType::Unknown);
        PathEdge::new(
            self.graph.node_at(a).id.as_str(),
            self.graph.node_at(b).id.as_str(),
            edge_type,
        )
    }

    fn seed_answer(&self, seeds: &[usize]) -> AnswerPath {
        AnswerPath::seeds_only(&self.ids(seeds))
    }

    fn ids(&self, nodes: &[usize]) -> Vec<String> {
        nodes
            .iter()
            .map(|&idx| self.graph.node_at(idx).id.clone())
            .collect()
    }
}

/// Kruskal over the auxiliary seed graph. Equal costs keep discovery order.
/// Returns indices into `legs`; disconnected seed groups yield a spanning forest.
fn spanning_tree(seed_count: usize, legs: &[Leg]) -> Result<Vec<usize>, ResolveError> {
    let mut order: Vec<usize> = (0..legs.len()).collect();
    order.sort_by_key(|&i| legs[i].cost);

    let mut components = UnionFind::<usize>::new(seed_count);
    let mut selected = Vec::new();
    for i in order {
        let leg = &legs[i];
        if leg.from >= seed_count || leg.to >= seed_count {
            return Err(ResolveError::SpanningTree(format!(
                "leg {}-{} outside {} seeds",
                leg.from, leg.to, seed_count
            )));
        }
        if components.union(leg.from, leg.to) {
            selected.push(i);
        }
    }

    if selected.is_empty() {
        return Err(ResolveError::SpanningTree("no edge selected".to_string()));
    }
    Ok(selected)
}

/// Resolves seeds against `graph` with no hop limit.
pub fn resolve<S: AsRef<str>>(graph: &CodeGraph, seed_ids: &[S]) -> AnswerPath {
    PathResolver::new(graph).resolve(seed_ids)
}
