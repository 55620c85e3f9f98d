// Elementary cycle enumeration.
//
// The exhaustive search is Johnson's algorithm run iteratively: each strongly
// connected component is searched from its smallest node, which is then
// removed before the remaining components are recomputed. Nodes are ranked
// by id up front, so every cycle is found exactly once and already starts at
// its smallest id.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use serde::Serialize;
use tracing::{debug, info};

use crate::graph::CallGraph;

use super::SearchLimits;

/// One elementary cycle, rotated to start at its smallest id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Cycle(pub Vec<String>);

impl Cycle {
    pub fn nodes(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|n| n == id)
    }

    /// Rotate so the smallest id comes first.
    pub fn canonical(mut ids: Vec<String>) -> Self {
        if let Some(pos) = ids
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
        {
            ids.rotate_left(pos);
        }
        Self(ids)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in &self.0 {
            write!(f, "{id} -> ")?;
        }
        match self.0.first() {
            Some(first) => f.write_str(first),
            None => Ok(()),
        }
    }
}

/// Result of a bounded cycle search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSearch {
    pub cycles: Vec<Cycle>,
    /// The `max_cycles` cap stopped the search before it finished.
    pub truncated: bool,
}

/// Every elementary cycle in the graph, sorted. Self-loops are one-node cycles.
pub fn find_circular_dependencies(graph: &CallGraph) -> Vec<Cycle> {
    find_circular_dependencies_within(graph, &SearchLimits::default()).cycles
}

/// Cycle enumeration bounded by `limits.max_cycle_length` (in nodes) and
/// `limits.max_cycles`.
pub fn find_circular_dependencies_within(graph: &CallGraph, limits: &SearchLimits) -> CycleSearch {
    if limits.max_cycle_length == Some(0) {
        info!("Cycle length bound is 0, nothing to search");
        return CycleSearch::default();
    }

    let ranked = RankedGraph::new(graph);
    let mut sink = CycleSink::new(limits.max_cycles);

    for v in 0..ranked.len() {
        if ranked.self_loop[v] && !sink.push(vec![v]) {
            break;
        }
    }

    if !sink.full {
        match limits.max_cycle_length {
            Some(max_len) => bounded_search(&ranked, max_len, &mut sink),
            None => johnson(&ranked, &mut sink),
        }
    }

    let mut cycles: Vec<Cycle> = sink
        .found
        .into_iter()
        .map(|c| Cycle(c.into_iter().map(|v| ranked.ids[v].clone()).collect()))
        .collect();
    cycles.sort();

    info!(
        cycles = cycles.len(),
        truncated = sink.truncated,
        "Cycle search complete"
    );
    CycleSearch {
        cycles,
        truncated: sink.truncated,
    }
}

// ── Internals ──────────────────────────────────────────────────────

/// The call graph re-indexed by id rank, without self-loops.
struct RankedGraph {
    ids: Vec<String>,
    succ: Vec<Vec<usize>>,
    self_loop: Vec<bool>,
}

impl RankedGraph {
    fn new(graph: &CallGraph) -> Self {
        let ids = graph.node_ids();
        let rank: std::collections::HashMap<&str, usize> =
            ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
        let mut succ = vec![Vec::new(); ids.len()];
        let mut self_loop = vec![false; ids.len()];
        for (a, b) in graph.edges() {
            let (ra, rb) = (rank[a.as_str()], rank[b.as_str()]);
            if ra == rb {
                self_loop[ra] = true;
            } else {
                succ[ra].push(rb);
            }
        }
        for list in &mut succ {
            list.sort_unstable();
            list.dedup();
        }
        Self {
            ids,
            succ,
            self_loop,
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    /// Non-trivial strongly connected components of the subgraph induced by
    /// `members`.
    fn sccs_within(&self, members: &BTreeSet<usize>) -> Vec<BTreeSet<usize>> {
        let mut sub: DiGraph<usize, ()> = DiGraph::with_capacity(members.len(), members.len());
        let mut local = std::collections::HashMap::with_capacity(members.len());
        for &v in members {
            local.insert(v, sub.add_node(v));
        }
        for &v in members {
            for w in &self.succ[v] {
                if let Some(&lw) = local.get(w) {
                    sub.add_edge(local[&v], lw, ());
                }
            }
        }
        tarjan_scc(&sub)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().map(|idx| sub[idx]).collect())
            .collect()
    }
}

struct CycleSink {
    found: Vec<Vec<usize>>,
    limit: Option<usize>,
    full: bool,
    truncated: bool,
}

impl CycleSink {
    fn new(limit: Option<usize>) -> Self {
        Self {
            found: Vec::new(),
            limit,
            full: limit == Some(0),
            truncated: false,
        }
    }

    /// Record a cycle. Returns `false` once the search should stop.
    fn push(&mut self, cycle: Vec<usize>) -> bool {
        if self.full {
            self.truncated = true;
            return false;
        }
        self.found.push(cycle);
        if self.limit.is_some_and(|l| self.found.len() >= l) {
            self.full = true;
        }
        true
    }
}

fn johnson(graph: &RankedGraph, sink: &mut CycleSink) {
    let all: BTreeSet<usize> = (0..graph.len()).collect();
    let mut pending = graph.sccs_within(&all);

    while let Some(scc) = pending.pop() {
        let Some(&start) = scc.first() else {
            continue;
        };
        let in_scc = |v: usize| scc.contains(&v);
        let neighbours =
            |v: usize| -> Vec<usize> { graph.succ[v].iter().copied().filter(|&w| in_scc(w)).collect() };

        let mut path = vec![start];
        let mut blocked: HashSet<usize> = HashSet::from([start]);
        let mut closed: HashSet<usize> = HashSet::new();
        let mut b_map: std::collections::HashMap<usize, HashSet<usize>> =
            std::collections::HashMap::new();
        let mut stack: Vec<(usize, Vec<usize>)> = vec![(start, neighbours(start))];

        while let Some((this, nbrs)) = stack.last_mut() {
            let this = *this;
            if let Some(next) = nbrs.pop() {
                if next == start {
                    if !sink.push(path.clone()) {
                        return;
                    }
                    closed.extend(path.iter().copied());
                } else if !blocked.contains(&next) {
                    path.push(next);
                    stack.push((next, neighbours(next)));
                    closed.remove(&next);
                    blocked.insert(next);
                    continue;
                }
            }

            if stack.last().is_some_and(|(_, n)| n.is_empty()) {
                if closed.contains(&this) {
                    unblock(this, &mut blocked, &mut b_map);
                } else {
                    for w in neighbours(this) {
                        b_map.entry(w).or_default().insert(this);
                    }
                }
                stack.pop();
                path.pop();
            }
        }

        let mut rest = scc.clone();
        rest.remove(&start);
        pending.extend(graph.sccs_within(&rest));
        debug!(start = %graph.ids[start], remaining = pending.len(), "Finished cycle search root");
    }
}

fn unblock(
    node: usize,
    blocked: &mut HashSet<usize>,
    b_map: &mut std::collections::HashMap<usize, HashSet<usize>>,
) {
    let mut stack = vec![node];
    while let Some(v) = stack.pop() {
        if blocked.remove(&v) {
            if let Some(waiting) = b_map.get_mut(&v) {
                stack.extend(waiting.drain());
            }
        }
    }
}

/// Depth-first enumeration of cycles with at most `max_len` nodes. Each
/// cycle is rooted at its smallest node and only visits larger ones.
fn bounded_search(graph: &RankedGraph, max_len: usize, sink: &mut CycleSink) {
    if max_len < 2 {
        return;
    }
    for start in 0..graph.len() {
        let mut path = vec![start];
        let mut on_path = vec![false; graph.len()];
        on_path[start] = true;
        let mut stack: Vec<std::slice::Iter<'_, usize>> = vec![graph.succ[start].iter()];

        while let Some(iter) = stack.last_mut() {
            match iter.next() {
                Some(&next) if next == start => {
                    if !sink.push(path.clone()) {
                        return;
                    }
                }
                Some(&next) => {
                    if next > start && !on_path[next] && path.len() < max_len {
                        on_path[next] = true;
                        path.push(next);
                        stack.push(graph.succ[next].iter());
                    }
                }
                None => {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        on_path[done] = false;
                    }
                }
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::tests::{arb_graph, graph_of};

    fn cycle(ids: &[&str]) -> Cycle {
        Cycle(ids.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn finds_the_scenario_cycle() {
        let g = graph_of(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "A"), ("D", "B")]);
        assert_eq!(find_circular_dependencies(&g), vec![cycle(&["A", "B", "C"])]);
    }

    #[test]
    fn overlapping_cycles_and_self_loops() {
        let g = graph_of(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "a"), ("b", "c"), ("c", "a"), ("c", "c"), ("d", "a")],
        );
        assert_eq!(
            find_circular_dependencies(&g),
            vec![cycle(&["a", "b"]), cycle(&["a", "b", "c"]), cycle(&["c"])]
        );
    }

    #[test]
    fn zero_length_bound_reports_no_cycles() {
        let g = graph_of(&["a", "b"], &[("a", "a"), ("a", "b"), ("b", "a")]);
        let limits = SearchLimits {
            max_cycle_length: Some(0),
            ..SearchLimits::default()
        };
        let search = find_circular_dependencies_within(&g, &limits);
        assert!(search.cycles.is_empty());
        assert!(!search.truncated);

        let limits = SearchLimits {
            max_cycle_length: Some(1),
            ..SearchLimits::default()
        };
        let search = find_circular_dependencies_within(&g, &limits);
        assert_eq!(search.cycles, vec![cycle(&["a"])]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let g = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(find_circular_dependencies(&g).is_empty());
        assert!(find_circular_dependencies(&CallGraph::new()).is_empty());
    }

    #[test]
    fn complete_graph_cycle_count() {
        // K4 has 6 two-cycles + 8 three-cycles + 6 four-cycles.
        let ids = ["a", "b", "c", "d"];
        let edges: Vec<(&str, &str)> = ids
            .iter()
            .flat_map(|a| ids.iter().filter(move |b| *b != a).map(move |b| (*a, *b)))
            .collect();
        let g = graph_of(&ids, &edges);
        let cycles = find_circular_dependencies(&g);
        assert_eq!(cycles.len(), 20);
        assert!(cycles.iter().all(|c| c.nodes()[0] == "a" || !c.contains("a")));
    }

    #[test]
    fn length_and_count_limits() {
        let ids = ["a", "b", "c", "d"];
        let edges: Vec<(&str, &str)> = ids
            .iter()
            .flat_map(|a| ids.iter().filter(move |b| *b != a).map(move |b| (*a, *b)))
            .collect();
        let g = graph_of(&ids, &edges);

        let short = find_circular_dependencies_within(
            &g,
            &SearchLimits {
                max_cycle_length: Some(2),
                ..SearchLimits::default()
            },
        );
        assert_eq!(short.cycles.len(), 6);
        assert!(!short.truncated);

        let capped = find_circular_dependencies_within(
            &g,
            &SearchLimits {
                max_cycles: Some(5),
                ..SearchLimits::default()
            },
        );
        assert_eq!(capped.cycles.len(), 5);
        assert!(capped.truncated);

        let exact = find_circular_dependencies_within(
            &g,
            &SearchLimits {
                max_cycles: Some(20),
                ..SearchLimits::default()
            },
        );
        assert_eq!(exact.cycles.len(), 20);
        assert!(!exact.truncated);
    }

    #[test]
    fn display_closes_the_loop() {
        assert_eq!(cycle(&["a", "b"]).to_string(), "a -> b -> a");
        assert_eq!(Cycle::canonical(vec!["c".into(), "a".into(), "b".into()]), cycle(&["a", "b", "c"]));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn is_cycle(g: &CallGraph, c: &Cycle) -> bool {
            let n = c.nodes();
            let distinct: HashSet<&String> = n.iter().collect();
            distinct.len() == n.len()
                && (0..n.len()).all(|i| g.has_edge(&n[i], &n[(i + 1) % n.len()]))
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn cycles_are_canonical_unique_and_real(g in arb_graph(7, 16)) {
                let cycles = find_circular_dependencies(&g);
                let unique: HashSet<&Cycle> = cycles.iter().collect();
                prop_assert_eq!(unique.len(), cycles.len());
                for c in &cycles {
                    prop_assert!(is_cycle(&g, c), "not a cycle: {}", c);
                    prop_assert_eq!(c, &Cycle::canonical(c.0.clone()));
                }
            }

            #[test]
            fn bounded_search_agrees_with_johnson(g in arb_graph(7, 16), max_len in 1usize..8) {
                let all = find_circular_dependencies(&g);
                let expected: Vec<Cycle> = all.into_iter().filter(|c| c.len() <= max_len).collect();
                let bounded = find_circular_dependencies_within(
                    &g,
                    &SearchLimits { max_cycle_length: Some(max_len), ..SearchLimits::default() },
                );
                prop_assert_eq!(bounded.cycles, expected);
            }
        }
    }
}
