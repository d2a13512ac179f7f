//! Derived node metrics
//!
//! Runs once after all edges are known and before the graph is assembled.

use crate::core::{Edge, ExtractError, Language, Node};
use crate::utils::ast;
use super::dependencies::dedent;
use rayon::prelude::*;
use std::collections::HashMap;

/// Heuristic McCabe complexity of a code span.
///
/// 1 + branch/loop/handler constructs + short-circuit operators + comprehensions.
pub fn cyclomatic_complexity(code: &str, language: Language) -> Result<usize, ExtractError> {
    let Some(profile) = language.profile() else {
        return Ok(1);
    };
    let tree = ast::parse(language, code).ok_or_else(|| ExtractError::Parse {
        node_id: format!("<{} span>", language),
    })?;
    let source = code.as_bytes();

    let mut complexity = 1;
    for node in ast::descendants(tree.root_node()) {
        let kind = node.kind();
        if profile.branch_kinds.contains(&kind)
            || profile.comprehension_kinds.contains(&kind)
            || ast::is_short_circuit(node, source)
        {
            complexity += 1;
        }
    }
    Ok(complexity)
}

fn node_complexity(node: &Node) -> usize {
    let Some(language) = node.language() else {
        return 1;
    };
    let code = if language == Language::Python {
        dedent(&node.code)
    } else {
        node.code.clone()
    };
    cyclomatic_complexity(&code, language).unwrap_or_else(|e| {
        log::debug!("Complexity of {} defaulted: {}", node.id, e);
        1
    })
}

/// Attaches `loc`, `cyclomatic`, `num_calls_in` and `num_calls_out` to every node.
///
/// Only call-like edges (`call`, `ambiguous`) are counted.
pub fn annotate(nodes: &mut [Node], edges: &[Edge]) {
    let mut calls_out: HashMap<&str, usize> = HashMap::new();
    let mut calls_in: HashMap<&str, usize> = HashMap::new();
    for edge in edges.iter().filter(|e| e.edge_type.is_call_like()) {
        *calls_out.entry(edge.source.as_str()).or_default() += 1;
        *calls_in.entry(edge.target.as_str()).or_default() += 1;
    }

    nodes.par_iter_mut().for_each(|node| {
        node.loc = Some((node.end_line + 1).saturating_sub(node.start_line).max(1));
        node.cyclomatic = Some(node_complexity(node));
    });

    for node in nodes.iter_mut() {
        node.num_calls_out = Some(calls_out.get(node.id.as_str()).copied().unwrap_or(0));
        node.num_calls_in = Some(calls_in.get(node.id.as_str()).copied().unwrap_or(0));
    }
}
