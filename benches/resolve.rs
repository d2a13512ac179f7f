use codepath::core::{Edge, EdgeType, Language, Node, NodeKind, ScanSummary};
use codepath::{CodeGraph, PathResolver};
use criterion::{Criterion, criterion_group, criterion_main};

/// Layered call graph: every node calls two nodes in the next layer.
fn layered_graph(layers: usize, width: usize) -> (CodeGraph, Vec<String>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let id = |l: usize, w: usize| format!("function:f_{}_{}:gen.py:1", l, w);

    for l in 0..layers {
        for w in 0..width {
            let name = format!("f_{}_{}", l, w);
            nodes.push(Node::new(NodeKind::Function, name, "gen.py", (1, 2), Language::Python));
            if l + 1 < layers {
                edges.push(Edge::new(id(l, w), id(l + 1, w), EdgeType::Call));
                edges.push(Edge::new(id(l, w), id(l + 1, (w + 1) % width), EdgeType::Call));
            }
        }
    }

    let seeds = vec![
        id(0, 0),
        id(layers / 2, width / 2),
        id(layers - 1, width - 1),
        id(layers - 1, 0),
    ];
    (CodeGraph::assemble(nodes, edges, &ScanSummary::default()), seeds)
}

fn resolve_benchmark(c: &mut Criterion) {
    let (graph, seeds) = layered_graph(40, 50);
    let resolver = PathResolver::new(&graph);

    let mut group = c.benchmark_group("resolve");
    group.bench_function("two_seeds", |b| b.iter(|| resolver.resolve(&seeds[..2])));
    group.bench_function("steiner_four_seeds", |b| b.iter(|| resolver.resolve(&seeds)));
    group.finish();
}

criterion_group!(benches, resolve_benchmark);
criterion_main!(benches);
