//! Read-only analyses over a [`CallGraph`](crate::graph::CallGraph).
//!
//! Every function takes `&CallGraph` and returns sorted, deterministic
//! results. Id-taking functions fail with
//! [`GraphError::NodeNotFound`](crate::error::GraphError::NodeNotFound);
//! "nothing found" is always an empty collection.

pub mod centrality;
pub mod classify;
pub mod components;
pub mod cycles;
pub mod paths;
pub mod summary;
pub mod traversal;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use centrality::{CentralityConfig, compute_betweenness, compute_pagerank};
pub use classify::{
    ClassifyConfig, Classification, NodeMetrics, NodeRole, annotate_roles, classify_nodes,
    classify_nodes_with,
};
pub use components::get_connected_components;
pub use cycles::{
    Cycle, CycleSearch, find_circular_dependencies, find_circular_dependencies_within,
};
pub use paths::find_all_paths;
pub use summary::{GraphSummary, summarize};
pub use traversal::{
    NodeDegrees, find_entry_points, find_terminal_nodes, get_ancestors, get_descendants,
    get_node_degrees,
};

/// Bounds for the exponential searches (paths and cycles).
///
/// `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// Maximum path length in edges for `find_all_paths`.
    pub path_cutoff: Option<usize>,
    /// Longest cycle (in nodes) to report.
    pub max_cycle_length: Option<usize>,
    /// Stop after this many cycles.
    pub max_cycles: Option<usize>,
}

impl SearchLimits {
    pub fn is_unbounded(&self) -> bool {
        self.max_cycle_length.is_none() && self.max_cycles.is_none()
    }

    /// Every bound that is set must be at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("search.path_cutoff", self.path_cutoff),
            ("search.max_cycle_length", self.max_cycle_length),
            ("search.max_cycles", self.max_cycles),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use crate::graph::{CallGraph, GraphNode};
    use crate::types::ObjectKind;

    /// Structure-only graph with the given ids and edges.
    pub(crate) fn graph_of(ids: &[&str], edges: &[(&str, &str)]) -> CallGraph {
        let mut g = CallGraph::new();
        for id in ids {
            g.add_node(GraphNode::placeholder(*id, *id, "", ObjectKind::Procedure));
        }
        for (a, b) in edges {
            g.add_edge(a, b).unwrap();
        }
        g
    }

    /// Random graph with up to `max_nodes` nodes (`n0`, `n1`, ...) and up to
    /// `max_edges` edges, self-loops included.
    pub(crate) fn arb_graph(max_nodes: usize, max_edges: usize) -> impl Strategy<Value = CallGraph> {
        (1..=max_nodes)
            .prop_flat_map(move |n| (Just(n), proptest::collection::vec((0..n, 0..n), 0..=max_edges)))
            .prop_map(|(n, edges)| {
                let ids: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
                let mut g = CallGraph::new();
                for id in &ids {
                    g.add_node(GraphNode::placeholder(id.as_str(), id.as_str(), "", ObjectKind::Procedure));
                }
                for (a, b) in edges {
                    g.add_edge(&ids[a], &ids[b]).unwrap();
                }
                g
            })
    }
}
