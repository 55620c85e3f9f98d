use std::collections::{BTreeSet, VecDeque};

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::error::GraphError;
use crate::graph::CallGraph;
use crate::types::ObjectKind;

/// In/out degree of a node. Self-loops count once in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeDegrees {
    pub in_degree: usize,
    pub out_degree: usize,
    pub total: usize,
}

/// Nodes nothing calls (in-degree 0), sorted.
pub fn find_entry_points(graph: &CallGraph) -> Vec<String> {
    let g = graph.inner();
    let mut ids: Vec<String> = g
        .node_indices()
        .filter(|&idx| g.edges_directed(idx, Direction::Incoming).next().is_none())
        .map(|idx| graph.id_at(idx).to_string())
        .collect();
    ids.sort();
    ids
}

/// Nodes that call nothing (out-degree 0), sorted.
///
/// With `exclude_unresolved`, nodes of kind [`ObjectKind::Unknown`] are left
/// out.
pub fn find_terminal_nodes(graph: &CallGraph, exclude_unresolved: bool) -> Vec<String> {
    let g = graph.inner();
    let mut ids: Vec<String> = g
        .node_indices()
        .filter(|&idx| g.edges_directed(idx, Direction::Outgoing).next().is_none())
        .filter(|&idx| !(exclude_unresolved && g[idx].kind == ObjectKind::Unknown))
        .map(|idx| graph.id_at(idx).to_string())
        .collect();
    ids.sort();
    ids
}

pub fn get_node_degrees(graph: &CallGraph, id: &str) -> Result<NodeDegrees, GraphError> {
    let in_degree = graph.in_degree(id)?;
    let out_degree = graph.out_degree(id)?;
    Ok(NodeDegrees {
        in_degree,
        out_degree,
        total: in_degree + out_degree,
    })
}

/// Every node that can reach `id` within `depth_limit` hops (`None` means
/// unlimited). The node itself is never included.
pub fn get_ancestors(
    graph: &CallGraph,
    id: &str,
    depth_limit: Option<usize>,
) -> Result<BTreeSet<String>, GraphError> {
    let start = graph.require(id)?;
    Ok(reachable(graph, start, Direction::Incoming, depth_limit))
}

/// Every node reachable from `id` within `depth_limit` hops (`None` means
/// unlimited). The node itself is never included.
pub fn get_descendants(
    graph: &CallGraph,
    id: &str,
    depth_limit: Option<usize>,
) -> Result<BTreeSet<String>, GraphError> {
    let start = graph.require(id)?;
    Ok(reachable(graph, start, Direction::Outgoing, depth_limit))
}

/// Breadth-first search in one direction with a hop limit.
pub(crate) fn reachable(
    graph: &CallGraph,
    start: NodeIndex,
    dir: Direction,
    depth_limit: Option<usize>,
) -> BTreeSet<String> {
    let g = graph.inner();
    let mut visited = vec![false; g.node_count()];
    visited[start.index()] = true;
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut found = BTreeSet::new();

    while let Some((node, depth)) = queue.pop_front() {
        if depth_limit.is_some_and(|limit| depth >= limit) {
            continue;
        }
        for next in g.neighbors_directed(node, dir) {
            if visited[next.index()] {
                continue;
            }
            visited[next.index()] = true;
            found.insert(graph.id_at(next).to_string());
            queue.push_back((next, depth + 1));
        }
    }
    found
}

// ── Tests ──────────────────────────────────────────────────────────
