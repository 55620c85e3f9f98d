use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use crate::graph::CallGraph;

/// Partition the graph into connected components.
///
/// `strongly` selects strongly-connected components (Tarjan); otherwise
/// edge direction is ignored. Each component is sorted, and the list is
/// sorted by first member.
pub fn get_connected_components(graph: &CallGraph, strongly: bool) -> Vec<Vec<String>> {
    let groups: Vec<Vec<usize>> = if strongly {
        tarjan_scc(graph.inner())
            .into_iter()
            .map(|scc| scc.into_iter().map(|idx| idx.index()).collect())
            .collect()
    } else {
        weak_groups(graph)
    };

    let g = graph.inner();
    let mut components: Vec<Vec<String>> = groups
        .into_iter()
        .map(|group| {
            let mut ids: Vec<String> = group
                .into_iter()
                .map(|i| g[petgraph::graph::NodeIndex::new(i)].id.clone())
                .collect();
            ids.sort();
            ids
        })
        .collect();
    components.sort();
    components
}

fn weak_groups(graph: &CallGraph) -> Vec<Vec<usize>> {
    let g = graph.inner();
    let mut uf = UnionFind::<usize>::new(g.node_count());
    for e in g.edge_references() {
        uf.union(e.source().index(), e.target().index());
    }
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..g.node_count() {
        groups.entry(uf.find(i)).or_default().push(i);
    }
    groups.into_values().collect()
}

/// Size of each node's weakly-connected component, keyed by id.
pub(crate) fn weak_component_sizes(graph: &CallGraph) -> HashMap<String, usize> {
    let g = graph.inner();
    let mut sizes = HashMap::with_capacity(g.node_count());
    for group in weak_groups(graph) {
        let size = group.len();
        for i in group {
            sizes.insert(g[petgraph::graph::NodeIndex::new(i)].id.clone(), size);
        }
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::tests::{arb_graph, graph_of};

    fn sample() -> CallGraph {
        graph_of(
            &["a", "b", "c", "d", "e", "f"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("d", "b"), ("e", "f")],
        )
    }

    #[test]
    fn weak_components() {
        let comps = get_connected_components(&sample(), false);
        assert_eq!(
            comps,
            vec![
                vec!["a", "b", "c", "d"],
                vec!["e", "f"],
            ]
        );
    }

    #[test]
    fn strong_components() {
        let comps = get_connected_components(&sample(), true);
        assert_eq!(
            comps,
            vec![
                vec!["a", "b", "c"],
                vec!["d"],
                vec!["e"],
                vec!["f"],
            ]
        );
    }

    #[test]
    fn empty_graph_has_no_components() {
        assert!(get_connected_components(&CallGraph::new(), true).is_empty());
        assert!(get_connected_components(&CallGraph::new(), false).is_empty());
    }

    #[test]
    fn sizes_by_node() {
        let sizes = weak_component_sizes(&sample());
        assert_eq!(sizes["d"], 4);
        assert_eq!(sizes["f"], 2);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn components_partition_the_nodes(g in arb_graph(15, 20), strongly in any::<bool>()) {
                let comps = get_connected_components(&g, strongly);
                let mut all: Vec<String> = comps.into_iter().flatten().collect();
                all.sort();
                prop_assert_eq!(all, g.node_ids());
            }

            #[test]
            fn strong_components_refine_weak_ones(g in arb_graph(15, 20)) {
                let weak = weak_component_sizes(&g);
                for scc in get_connected_components(&g, true) {
                    let size = weak[&scc[0]];
                    prop_assert!(scc.iter().all(|id| weak[id] == size));
                    prop_assert!(scc.len() <= size);
                }
            }
        }
    }
}
