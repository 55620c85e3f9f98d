//! Focused views of a call graph around one node.

use std::collections::BTreeSet;

use petgraph::Direction;
use tracing::debug;

use crate::analyze::traversal::reachable;
use crate::error::GraphError;
use crate::graph::CallGraph;

/// The neighbourhood of `focus`: its callers up to `upstream_depth` hops,
/// its callees up to `downstream_depth` hops (`None` means unlimited), and
/// every original edge between the selected nodes.
pub fn generate_subgraph(
    graph: &CallGraph,
    focus: &str,
    upstream_depth: usize,
    downstream_depth: Option<usize>,
) -> Result<CallGraph, GraphError> {
    let start = graph.require(focus)?;

    let mut keep: BTreeSet<String> = BTreeSet::new();
    keep.insert(focus.to_string());
    keep.extend(reachable(graph, start, Direction::Incoming, Some(upstream_depth)));
    keep.extend(reachable(graph, start, Direction::Outgoing, downstream_depth));

    let sub = graph.induced_subgraph(&keep);
    debug!(
        focus,
        upstream_depth,
        downstream_depth = ?downstream_depth,
        nodes = sub.node_count(),
        edges = sub.edge_count(),
        "Generated subgraph"
    );
    Ok(sub)
}

/// Builder over [`generate_subgraph`].
///
/// Defaults: one hop upstream, unlimited downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubgraphRequest {
    focus: String,
    upstream: usize,
    downstream: Option<usize>,
}

impl SubgraphRequest {
    pub fn new(focus: impl Into<String>) -> Self {
        Self {
            focus: focus.into(),
            upstream: 1,
            downstream: None,
        }
    }

    #[must_use]
    pub fn upstream(mut self, depth: usize) -> Self {
        self.upstream = depth;
        self
    }

    #[must_use]
    pub fn downstream(mut self, depth: Option<usize>) -> Self {
        self.downstream = depth;
        self
    }

    pub fn focus(&self) -> &str {
        &self.focus
    }

    pub fn generate(&self, graph: &CallGraph) -> Result<CallGraph, GraphError> {
        generate_subgraph(graph, &self.focus, self.upstream, self.downstream)
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::tests::{arb_graph, graph_of};
    use crate::analyze::{get_ancestors, get_descendants};

    fn scenario() -> CallGraph {
        graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("d", "b")],
        )
    }

    fn chain() -> CallGraph {
        graph_of(
            &["top", "mid", "focus", "low", "bottom"],
            &[("top", "mid"), ("mid", "focus"), ("focus", "low"), ("low", "bottom")],
        )
    }

    #[test]
    fn induced_edges_are_kept() {
        let sub = generate_subgraph(&scenario(), "b", 1, Some(1)).unwrap();
        assert_eq!(sub.node_ids(), vec!["a", "b", "c", "d"]);
        assert!(sub.has_edge("c", "a"));
        assert_eq!(sub.edge_count(), 4);
    }

    #[test]
    fn depths_bound_each_direction() {
        let g = chain();
        let sub = generate_subgraph(&g, "focus", 0, Some(0)).unwrap();
        assert_eq!(sub.node_ids(), vec!["focus"]);
        assert_eq!(sub.edge_count(), 0);

        let sub = generate_subgraph(&g, "focus", 1, Some(1)).unwrap();
        assert_eq!(sub.node_ids(), vec!["focus", "low", "mid"]);

        let sub = generate_subgraph(&g, "focus", 0, None).unwrap();
        assert_eq!(sub.node_ids(), vec!["bottom", "focus", "low"]);
    }

    #[test]
    fn missing_focus_is_not_found() {
        let err = generate_subgraph(&chain(), "nope", 1, None).unwrap_err();
        assert_eq!(err, GraphError::NodeNotFound("nope".into()));
    }

    #[test]
    fn request_builder_matches_function() {
        let g = chain();
        let request = SubgraphRequest::new("focus").upstream(2).downstream(Some(1));
        assert_eq!(request.focus(), "focus");
        assert_eq!(
            request.generate(&g).unwrap(),
            generate_subgraph(&g, "focus", 2, Some(1)).unwrap()
        );
        let defaults = SubgraphRequest::new("focus").generate(&g).unwrap();
        assert_eq!(defaults.node_ids(), vec!["bottom", "focus", "low", "mid"]);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn subgraph_is_contained_and_induced(
                g in arb_graph(12, 24),
                pick in any::<proptest::sample::Index>(),
                up in 0usize..4,
                down in proptest::option::of(0usize..4),
            ) {
                let ids = g.node_ids();
                let focus = &ids[pick.index(ids.len())];
                let sub = generate_subgraph(&g, focus, up, down).unwrap();

                let mut expected = get_ancestors(&g, focus, Some(up)).unwrap();
                expected.extend(get_descendants(&g, focus, down).unwrap());
                expected.insert(focus.clone());
                let got: BTreeSet<String> = sub.node_ids().into_iter().collect();
                prop_assert_eq!(&got, &expected);

                for (a, b) in g.edges() {
                    let inside = got.contains(&a) && got.contains(&b);
                    prop_assert_eq!(sub.has_edge(&a, &b), inside);
                }
            }
        }
    }
}
