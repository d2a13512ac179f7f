use codepath::core::{EdgeType, ScanControl};
use codepath::utils::analysis::graph::CodeGraph;
use codepath::{GraphConfig, GraphStore, build_graph, run_scan};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_repo(root: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(root.join("pkg"))?;
    fs::create_dir_all(root.join("web"))?;
    fs::create_dir_all(root.join("node_modules/dep"))?;

    fs::write(
        root.join("pkg/shapes.py"),
        r#"import math


class Shape:
    """Base shape."""

    def area(self):
        return 0


class Circle(Shape):
    def __init__(self, r):
        self.r = r

    def area(self):
        if self.r < 0:
            return 0
        return math.pi * self.r ** 2


def total_area(shapes):
    return sum(s.area() for s in shapes)
"#,
    )?;
    fs::write(
        root.join("pkg/report.py"),
        "from pkg.shapes import total_area\n\n\ndef report(shapes):\n    print(total_area(shapes))\n",
    )?;
    fs::write(
        root.join("web/app.js"),
        "// Entry point\nfunction start() {\n  return render();\n}\n\nconst render = () => {\n  return 1;\n};\n",
    )?;
    fs::write(root.join("pkg/broken.py"), "def broken(:\n    pass\n")?;
    fs::write(root.join("config.yaml"), "name: demo\n")?;
    fs::write(root.join("node_modules/dep/index.js"), "function dep() {}\n")?;
    fs::write(root.join("NOTES"), "no extension")?;
    Ok(())
}

fn config_for(root: &Path, out: &Path) -> GraphConfig {
    GraphConfig {
        path: root.to_path_buf(),
        output: out.join("graph.json"),
        ..Default::default()
    }
}

#[test]
fn test_end_to_end_scan() -> anyhow::Result<()> {
    let repo = TempDir::new()?;
    let out = TempDir::new()?;
    write_repo(repo.path())?;

    let graph = run_scan(config_for(repo.path(), out.path()), None)?;

    let ids: HashSet<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids.len(), graph.nodes().len(), "node ids are unique");
    for expected in [
        "class:Shape:pkg/shapes.py:4",
        "class:Circle:pkg/shapes.py:11",
        "function:total_area:pkg/shapes.py:21",
        "function:report:pkg/report.py:4",
        "function:start:web/app.js:2",
        "function:render:web/app.js:6",
        "file:config.yaml:config.yaml:1",
    ] {
        assert!(ids.contains(expected), "missing {}", expected);
    }
    assert!(!ids.iter().any(|id| id.contains("broken") || id.contains("node_modules")));

    for edge in graph.edges() {
        if edge.edge_type.requires_target_node() {
            assert!(graph.contains(&edge.source) && graph.contains(&edge.target));
        }
    }
    let has = |s: &str, t: &str, ty: EdgeType| {
        graph
            .edges()
            .iter()
            .any(|e| e.source == s && e.target == t && e.edge_type == ty)
    };
    assert!(has("function:report:pkg/report.py:4", "function:total_area:pkg/shapes.py:21", EdgeType::Call));
    assert!(has("function:start:web/app.js:2", "function:render:web/app.js:6", EdgeType::Call));
    assert!(has("class:Circle:pkg/shapes.py:11", "class:Shape:pkg/shapes.py:4", EdgeType::Inherit));
    assert!(
        graph
            .edges()
            .iter()
            .filter(|e| e.source == "function:total_area:pkg/shapes.py:21")
            .all(|e| e.edge_type == EdgeType::Ambiguous)
    );

    let meta = graph.metadata();
    assert_eq!(meta.files_skipped, 1);
    assert_eq!(meta.files_processed, 4);
    assert_eq!(meta.languages, vec!["javascript", "python", "yaml"]);
    assert!(graph.nodes().iter().all(|n| n.is_annotated()));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("graph.json"))?)?;
    assert_eq!(written["metadata"]["schema_version"], "2.0");
    assert_eq!(written["metadata"]["node_count"], graph.nodes().len());
    assert!(written["edges"][0]["source"].is_string());
    assert!(written["nodes"][0]["cyclomatic"].is_number());
    Ok(())
}

#[test]
fn test_rescan_is_idempotent() -> anyhow::Result<()> {
    let repo = TempDir::new()?;
    write_repo(repo.path())?;
    let config = GraphConfig {
        path: repo.path().to_path_buf(),
        output: repo.path().join("graph.json"),
        ..Default::default()
    };

    let first = run_scan(config.clone(), None)?;
    // the written graph sits inside the root and must not be picked up
    let second = build_graph(&config, &ScanControl::new(), &None)?;

    let ids = |g: &CodeGraph| g.nodes().iter().map(|n| n.id.clone()).collect::<HashSet<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.edges().len(), second.edges().len());
    Ok(())
}

#[test]
fn test_round_trip_and_resolve() -> anyhow::Result<()> {
    let repo = TempDir::new()?;
    let out = TempDir::new()?;
    write_repo(repo.path())?;
    let config = config_for(repo.path(), out.path());
    let built = run_scan(config.clone(), None)?;

    let store = GraphStore::load_from_file(&config.output)?;
    let loaded = store.snapshot();
    assert_eq!(loaded.nodes().len(), built.nodes().len());
    assert_eq!(loaded.edges().len(), built.edges().len());
    let ids = |g: &CodeGraph| g.nodes().iter().map(|n| n.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&loaded), ids(&built));

    let answer = store.resolve(&["function:report:pkg/report.py:4", "function:total_area:pkg/shapes.py:21"]);
    assert_eq!(answer.path_nodes.len(), 2);
    assert_eq!(answer.path_edges.len(), 1);

    let missing = store.resolve(&["function:nope:x.py:1"]);
    assert!(missing.is_empty());
    Ok(())
}

#[test]
fn test_cancelled_scan_still_assembles() -> anyhow::Result<()> {
    let repo = TempDir::new()?;
    write_repo(repo.path())?;
    let control = ScanControl::new();
    control.cancel();

    let graph = build_graph(&config_for(repo.path(), repo.path()), &control, &None)?;
    assert!(graph.is_empty());
    assert_eq!(graph.metadata().files_processed, 0);
    Ok(())
}

#[test]
fn test_load_rejects_corrupt_graph() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("graph.json");
    fs::write(&path, "{\"nodes\": 3}")?;
    assert!(GraphStore::load_from_file(&path).is_err());
    Ok(())
}
