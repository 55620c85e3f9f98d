use petgraph::graph::NodeIndex;

use crate::error::GraphError;
use crate::graph::CallGraph;

/// All simple paths from `source` to `target`, each listed as node ids.
///
/// `cutoff` bounds the path length in edges. A node is its own trivial path
/// (`[[source]]`); unreachable targets give an empty list. Paths are sorted.
pub fn find_all_paths(
    graph: &CallGraph,
    source: &str,
    target: &str,
    cutoff: Option<usize>,
) -> Result<Vec<Vec<String>>, GraphError> {
    let src = graph.require(source)?;
    let dst = graph.require(target)?;
    if src == dst {
        return Ok(vec![vec![source.to_string()]]);
    }

    let cutoff = cutoff.unwrap_or(usize::MAX);
    if cutoff == 0 {
        return Ok(Vec::new());
    }

    let g = graph.inner();
    let children = |n: NodeIndex| -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = g.neighbors(n).filter(|&m| m != n).collect();
        out.sort_by(|a, b| graph.id_at(*b).cmp(graph.id_at(*a)));
        out.dedup();
        out
    };

    let mut on_path = vec![false; g.node_count()];
    on_path[src.index()] = true;
    let mut path = vec![src];
    // Remaining children to try at each depth, popped from the back in id order.
    let mut stack = vec![children(src)];
    let mut found: Vec<Vec<String>> = Vec::new();

    while let Some(pending) = stack.last_mut() {
        if let Some(next) = pending.pop() {
            if next == dst {
                // `path` has one node per edge walked so far, plus `next`.
                if path.len() <= cutoff {
                    found.push(
                        path.iter()
                            .chain(std::iter::once(&next))
                            .map(|&n| graph.id_at(n).to_string())
                            .collect(),
                    );
                }
            } else if !on_path[next.index()] && path.len() < cutoff {
                on_path[next.index()] = true;
                path.push(next);
                stack.push(children(next));
            }
        } else {
            stack.pop();
            if let Some(done) = path.pop() {
                on_path[done.index()] = false;
            }
        }
    }

    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::tests::graph_of;

    fn p(ids: &[&str]) -> Vec<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    fn diamond() -> CallGraph {
        graph_of(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "a"), ("a", "d")],
        )
    }

    #[test]
    fn finds_every_simple_path() {
        let paths = find_all_paths(&diamond(), "a", "d", None).unwrap();
        assert_eq!(paths, vec![p(&["a", "b", "d"]), p(&["a", "c", "d"]), p(&["a", "d"])]);
    }

    #[test]
    fn cutoff_limits_edges() {
        let g = diamond();
        assert_eq!(find_all_paths(&g, "a", "d", Some(1)).unwrap(), vec![p(&["a", "d"])]);
        assert_eq!(find_all_paths(&g, "a", "d", Some(2)).unwrap().len(), 3);
        assert!(find_all_paths(&g, "a", "d", Some(0)).unwrap().is_empty());
    }

    #[test]
    fn trivial_and_unreachable() {
        let g = diamond();
        assert_eq!(find_all_paths(&g, "b", "b", None).unwrap(), vec![p(&["b"])]);
        assert!(find_all_paths(&g, "a", "e", None).unwrap().is_empty());
        assert_eq!(
            find_all_paths(&g, "a", "x", None).unwrap_err(),
            GraphError::NodeNotFound("x".into())
        );
    }

    #[test]
    fn paths_through_cycles_stay_simple() {
        let g = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "a"), ("b", "c"), ("b", "b")]);
        assert_eq!(find_all_paths(&g, "a", "c", None).unwrap(), vec![p(&["a", "b", "c"])]);
    }
}
