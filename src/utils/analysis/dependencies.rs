//! Relationship extraction
//!
//! Re-parses every node's own code span and links name references to nodes with the
//! same name. Resolution is purely by name: a reference with several candidates links
//! to all of them and every such edge is flagged `ambiguous`.

use crate::core::{Edge, EdgeType, ExtractError, Language, Node, NodeKind};
use crate::utils::ast;
use rayon::prelude::*;
use std::collections::HashMap;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Query, QueryCursor, Tree};

/// Name references found inside one node
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct References {
    /// Callee names, first occurrence order
    pub calls: Vec<String>,
    /// Base classes of a class definition
    pub bases: Vec<String>,
    pub imports: Vec<String>,
}

/// name -> indices of nodes carrying that name, in node order
pub struct NameIndex<'a> {
    by_name: HashMap<&'a str, Vec<usize>>,
}

impl<'a> NameIndex<'a> {
    pub fn build(nodes: &'a [Node]) -> Self {
        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            by_name.entry(node.name.as_str()).or_default().push(idx);
        }
        Self { by_name }
    }

    pub fn candidates(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Extracts import statements from a parsed tree.
/// Returns the imported module names/paths with quotes and aliases removed.
pub fn extract_imports(
    tree: &Tree,
    content: &str,
    language: Language,
) -> Result<Vec<String>, ExtractError> {
    let (Some(profile), Some(grammar)) = (language.profile(), language.grammar()) else {
        return Ok(Vec::new());
    };
    let query = Query::new(&grammar, profile.import_query).map_err(|e| ExtractError::Query {
        language: language.to_string(),
        message: e.to_string(),
    })?;

    let mut imports = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root_node(), content.as_bytes());

    while let Some(m) = matches.next() {
        for capture in m.captures {
            // JS require() also captures @func
            let capture_name = query.capture_names()[capture.index as usize];
            if capture_name != "import" {
                continue;
            }

            if let Ok(text) = capture.node.utf8_text(content.as_bytes()) {
                let mut clean_text = text
                    .trim_matches(|c| c == '"' || c == '\'' || c == '`' || c == '<' || c == '>')
                    .to_string();
                if language == Language::Python
                    && let Some(idx) = clean_text.find(" as ")
                {
                    clean_text.truncate(idx);
                }
                if !clean_text.is_empty() && !imports.contains(&clean_text) {
                    imports.push(clean_text);
                }
            }
        }
    }

    Ok(imports)
}

/// Strips the common leading indentation so nested Python code parses standalone.
pub(crate) fn dedent(code: &str) -> String {
    let indent = code
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    if indent == 0 {
        return code.to_string();
    }
    code.lines()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collects call, base-class and import references from a node's code span.
pub fn collect_references(node: &Node) -> Result<References, ExtractError> {
    let Some(language) = node.language() else {
        return Ok(References::default());
    };
    let Some(profile) = language.profile() else {
        return Ok(References::default());
    };
    let code = if language == Language::Python {
        dedent(&node.code)
    } else {
        node.code.clone()
    };
    let tree = ast::parse(language, &code).ok_or_else(|| ExtractError::Parse {
        node_id: node.id.clone(),
    })?;
    let source = code.as_bytes();

    let mut refs = References::default();
    let mut own_definition_seen = false;
    for syntax_node in ast::descendants(tree.root_node()) {
        if profile.call_kinds.contains(&syntax_node.kind()) {
            if let Some(callee) = ast::callee_name(syntax_node, source)
                && !refs.calls.contains(&callee)
            {
                refs.calls.push(callee);
            }
            continue;
        }
        if node.kind() == Some(NodeKind::Class)
            && !own_definition_seen
            && let Some((NodeKind::Class, _)) = ast::classify_definition(syntax_node, source, profile)
        {
            own_definition_seen = true;
            refs.bases = ast::base_class_names(syntax_node, source, profile);
        }
    }
    refs.imports = extract_imports(&tree, &code, language)?;
    Ok(refs)
}

fn edges_for_node(
    idx: usize,
    node: &Node,
    nodes: &[Node],
    index: &NameIndex,
    refs: References,
) -> Vec<Edge> {
    let mut edges = Vec::new();

    for callee in &refs.calls {
        let candidates: Vec<usize> = index
            .candidates(callee)
            .iter()
            .copied()
            .filter(|&c| c != idx)
            .collect();
        let edge_type = if candidates.len() > 1 {
            EdgeType::Ambiguous
        } else {
            EdgeType::Call
        };
        for c in candidates {
            edges.push(Edge::new(node.id.as_str(), nodes[c].id.as_str(), edge_type));
        }
    }

    for base in &refs.bases {
        for &c in index.candidates(base) {
            if c != idx && nodes[c].kind() == Some(NodeKind::Class) {
                edges.push(Edge::new(node.id.as_str(), nodes[c].id.as_str(), EdgeType::Inherit));
            }
        }
    }

    for import in refs.imports {
        edges.push(Edge::new(node.id.as_str(), import, EdgeType::Import));
    }

    edges
}

/// Produces call, inherit and import edges for the full node list.
///
/// Extraction failures are local to a node: it contributes no edges and the batch continues.
pub fn extract_relationships(nodes: &[Node]) -> Vec<Edge> {
    let index = NameIndex::build(nodes);

    let per_node: Vec<Vec<Edge>> = nodes
        .par_iter()
        .enumerate()
        .map(|(idx, node)| match collect_references(node) {
            Ok(refs) => edges_for_node(idx, node, nodes, &index, refs),
            Err(e) => {
                log::warn!("Skipping relationships of {}: {}", node.id, e);
                Vec::new()
            }
        })
        .collect();

    let edges: Vec<Edge> = per_node.into_iter().flatten().collect();
    log::info!("Extracted {} edges from {} nodes", edges.len(), nodes.len());
    edges
}
