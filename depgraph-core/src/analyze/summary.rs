#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use super::components::get_connected_components;
use super::traversal::{find_entry_points, find_terminal_nodes};
use crate::graph::CallGraph;

/// Headline numbers for a call graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub self_loops: usize,
    /// `edges / (nodes * (nodes - 1))`; zero for fewer than two nodes.
    pub density: f64,
    pub entry_points: usize,
    pub terminal_nodes: usize,
    /// Strongly-connected components that contain a cycle (size > 1 or a
    /// self-loop).
    pub cyclic_components: usize,
    pub weak_components: usize,
    pub largest_weak_component: usize,
    pub populated_nodes: usize,
    pub placeholder_nodes: usize,
}

pub fn summarize(graph: &CallGraph) -> GraphSummary {
    let nodes = graph.node_count();
    let edges = graph.edge_count();
    let loops: Vec<String> = graph
        .edges()
        .into_iter()
        .filter(|(a, b)| a == b)
        .map(|(a, _)| a)
        .collect();

    let density = if nodes < 2 {
        0.0
    } else {
        edges as f64 / (nodes as f64 * (nodes - 1) as f64)
    };

    let cyclic_components = get_connected_components(graph, true)
        .iter()
        .filter(|scc| scc.len() > 1 || loops.contains(&scc[0]))
        .count();

    let weak = get_connected_components(graph, false);
    let populated = graph.populated_count();

    GraphSummary {
        nodes,
        edges,
        self_loops: loops.len(),
        density,
        entry_points: find_entry_points(graph).len(),
        terminal_nodes: find_terminal_nodes(graph, false).len(),
        cyclic_components,
        weak_components: weak.len(),
        largest_weak_component: weak.iter().map(Vec::len).max().unwrap_or(0),
        populated_nodes: populated,
        placeholder_nodes: nodes - populated,
    }
}
