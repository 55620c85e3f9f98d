use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::BuildError;
use crate::graph::{CallGraph, GraphNode};
use crate::progress::{NoopReporter, ProgressReporter};
use crate::store::{CodeObjectStore, LoadOptions};
use crate::types::CodeObject;

use super::resolve::{Resolution, ResolutionIndex, resolve_call};

// ── Build records ──────────────────────────────────────────────────

/// A call site that matched no known object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedCall {
    pub caller: String,
    pub callee_name: String,
    pub line: u32,
}

impl UnresolvedCall {
    pub fn to_error(&self) -> BuildError {
        BuildError::UnresolvedReference {
            caller: self.caller.clone(),
            callee: self.callee_name.clone(),
        }
    }
}

/// A call site whose target was picked from several overloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousCall {
    pub caller: String,
    pub callee_name: String,
    pub line: u32,
    pub chosen: String,
    pub candidates: Vec<String>,
}

/// An input object that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedObject {
    pub id: String,
    pub reason: String,
}

impl MalformedObject {
    pub fn to_error(&self) -> BuildError {
        BuildError::MalformedInput {
            id: self.id.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// Statistics from one graph build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    pub nodes_added: usize,
    pub edges_added: usize,
    pub call_sites: usize,
    pub self_loops: usize,
    pub unresolved: Vec<UnresolvedCall>,
    pub ambiguous: Vec<AmbiguousCall>,
    pub malformed: Vec<MalformedObject>,
    #[serde(skip)]
    pub duration: Duration,
}

/// The constructed graph together with its build statistics.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub graph: CallGraph,
    pub stats: BuildStats,
}

// ── Builder ────────────────────────────────────────────────────────

/// Builds a [`CallGraph`] from extracted code objects.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    reporter: Arc<dyn ProgressReporter>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            reporter: Arc::new(NoopReporter),
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Build a graph: one node per well-formed object, one edge per distinct
    /// resolved caller → callee pair.
    ///
    /// Objects are processed in id order, so the graph does not depend on the
    /// order of `objects`. Malformed objects and unresolved calls are skipped
    /// and recorded in the returned stats; construction never fails.
    pub fn build(&self, objects: &[CodeObject]) -> BuildOutcome {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        let mut ordered: Vec<&CodeObject> = objects.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));

        let accepted = Self::validate(ordered, &mut stats);
        let index = ResolutionIndex::new(accepted.iter().copied());

        let mut graph = CallGraph::with_capacity(accepted.len(), accepted.len() * 2);
        for obj in &accepted {
            graph.add_node(GraphNode::from_object((*obj).clone()));
        }
        stats.nodes_added = graph.node_count();

        self.reporter
            .start("Resolving calls", Some(accepted.len() as u64));
        for caller in &accepted {
            for call in &caller.calls {
                stats.call_sites += 1;
                let target = match resolve_call(&index, caller, call) {
                    Resolution::Resolved { target, .. } => target,
                    Resolution::Ambiguous {
                        target, candidates, ..
                    } => {
                        warn!(
                            caller = %caller.id,
                            callee = %call.callee_name,
                            line = call.line,
                            chosen = %target,
                            candidates = candidates.len(),
                            "Ambiguous overloaded call, picked first candidate"
                        );
                        stats.ambiguous.push(AmbiguousCall {
                            caller: caller.id.clone(),
                            callee_name: call.callee_name.clone(),
                            line: call.line,
                            chosen: target.clone(),
                            candidates,
                        });
                        target
                    }
                    Resolution::Unresolved => {
                        let record = UnresolvedCall {
                            caller: caller.id.clone(),
                            callee_name: call.callee_name.clone(),
                            line: call.line,
                        };
                        debug!(line = call.line, "{}", record.to_error());
                        stats.unresolved.push(record);
                        continue;
                    }
                };

                match graph.add_edge(&caller.id, &target) {
                    Ok(true) => {
                        stats.edges_added += 1;
                        if caller.id == target {
                            stats.self_loops += 1;
                        }
                    }
                    Ok(false) => {}
                    Err(err) => debug!(caller = %caller.id, error = %err, "Skipping edge"),
                }
            }
            self.reporter.advance(1);
        }
        self.reporter.finish();

        stats.duration = start.elapsed();
        info!(
            nodes = stats.nodes_added,
            edges = stats.edges_added,
            unresolved = stats.unresolved.len(),
            ambiguous = stats.ambiguous.len(),
            malformed = stats.malformed.len(),
            duration = ?stats.duration,
            "Call graph built"
        );

        BuildOutcome { graph, stats }
    }

    /// Load every object from `store` and build the graph.
    pub async fn build_from_store(
        &self,
        store: &dyn CodeObjectStore,
        options: LoadOptions,
    ) -> crate::error::Result<BuildOutcome> {
        let objects = store.load_objects(options).await?;
        info!(objects = objects.len(), "Loaded code objects");
        Ok(self.build(&objects))
    }

    /// Drop objects with an empty id or an id (case-insensitively) already
    /// taken by an earlier object in id order.
    fn validate<'a>(ordered: Vec<&'a CodeObject>, stats: &mut BuildStats) -> Vec<&'a CodeObject> {
        let mut seen: HashSet<String> = HashSet::with_capacity(ordered.len());
        let mut accepted = Vec::with_capacity(ordered.len());
        for obj in ordered {
            if obj.id.trim().is_empty() {
                let record = MalformedObject {
                    id: obj.id.clone(),
                    reason: "empty id".into(),
                };
                error!(name = %obj.name, package = %obj.package_name, "{}", record.to_error());
                stats.malformed.push(record);
                continue;
            }
            if !seen.insert(obj.id.to_lowercase()) {
                let record = MalformedObject {
                    id: obj.id.clone(),
                    reason: "duplicate id".into(),
                };
                warn!("{}", record.to_error());
                stats.malformed.push(record);
                continue;
            }
            accepted.push(obj);
        }
        accepted
    }
}

/// Build a call graph with default settings, discarding the stats.
pub fn build_graph(objects: &[CodeObject]) -> CallGraph {
    GraphBuilder::new().build(objects).graph
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::IndicatifReporter;
    use crate::store::MemoryStore;
    use crate::types::{CallReference, ObjectKind, Parameter};

    fn obj(pkg: &str, name: &str, calls: &[&str]) -> CodeObject {
        CodeObject::new(pkg, name, ObjectKind::Procedure)
            .with_calls(calls.iter().map(|c| CallReference::new(*c)).collect())
    }

    fn pairs(edges: &[(&str, &str)]) -> Vec<(String, String)> {
        edges
            .iter()
            .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
            .collect()
    }

    #[test]
    fn builds_nodes_and_edges() {
        let objects = vec![
            obj("pkg", "a", &["b", "pkg.c"]),
            obj("pkg", "b", &["c"]),
            obj("pkg", "c", &[]),
        ];
        let outcome = GraphBuilder::new().build(&objects);
        assert_eq!(outcome.graph.node_count(), 3);
        assert_eq!(
            outcome.graph.edges(),
            pairs(&[("pkg.a", "pkg.b"), ("pkg.a", "pkg.c"), ("pkg.b", "pkg.c")])
        );
        assert_eq!(outcome.stats.edges_added, 3);
        assert_eq!(outcome.stats.call_sites, 3);
        assert!(outcome.graph.node("pkg.a").unwrap().is_populated());
    }

    #[test]
    fn duplicate_calls_collapse_and_recursion_loops() {
        let objects = vec![obj("pkg", "a", &["b", "B", "pkg.b", "a"]), obj("pkg", "b", &[])];
        let outcome = GraphBuilder::new().build(&objects);
        assert_eq!(outcome.graph.edge_count(), 2);
        assert!(outcome.graph.has_edge("pkg.a", "pkg.a"));
        assert_eq!(outcome.stats.self_loops, 1);
        assert_eq!(outcome.stats.call_sites, 4);
    }

    #[test]
    fn unresolved_calls_add_nothing() {
        let objects = vec![obj("pkg", "a", &["dbms_output.put_line", "b"])];
        let outcome = GraphBuilder::new().build(&objects);
        assert_eq!(outcome.graph.node_count(), 1);
        assert_eq!(outcome.graph.edge_count(), 0);
        assert_eq!(outcome.stats.unresolved.len(), 2);
        assert_eq!(outcome.stats.unresolved[0].callee_name, "dbms_output.put_line");
        assert_eq!(
            outcome.stats.unresolved[0].to_error(),
            BuildError::UnresolvedReference {
                caller: "pkg.a".into(),
                callee: "dbms_output.put_line".into()
            }
        );
    }

    #[test]
    fn malformed_objects_are_skipped() {
        let objects = vec![
            obj("pkg", "a", &["b"]),
            obj("pkg", "b", &[]),
            obj("pkg", "dup", &[]).with_id("pkg.a"),
            obj("pkg", "blank", &[]).with_id("  "),
        ];
        let outcome = GraphBuilder::new().build(&objects);
        assert_eq!(outcome.graph.node_ids(), vec!["pkg.a", "pkg.b"]);
        assert_eq!(outcome.stats.malformed.len(), 2);
        let reasons: Vec<&str> = outcome
            .stats
            .malformed
            .iter()
            .map(|m| m.reason.as_str())
            .collect();
        assert!(reasons.contains(&"empty id"));
        assert!(reasons.contains(&"duplicate id"));
    }

    #[test]
    fn ambiguous_overloads_are_recorded() {
        let log = |id: &str, params: usize| {
            CodeObject::new("util", "log", ObjectKind::Procedure)
                .with_id(id)
                .overloaded()
                .with_parameters(
                    (0..params)
                        .map(|i| Parameter::new(format!("p{i}"), "VARCHAR2"))
                        .collect(),
                )
        };
        let caller = obj("app", "main", &[]).with_calls(vec![
            CallReference::new("util.log").with_positional(["'a'"]).at_line(3),
            CallReference::new("util.log").at_line(7),
        ]);
        let objects = vec![log("util.log-1", 1), log("util.log-2", 2), caller];

        let outcome = GraphBuilder::new().build(&objects);
        assert!(outcome.graph.has_edge("app.main", "util.log-1"));
        assert_eq!(outcome.stats.ambiguous.len(), 1);
        let amb = &outcome.stats.ambiguous[0];
        assert_eq!(amb.line, 7);
        assert_eq!(amb.chosen, "util.log-1");
        assert_eq!(amb.candidates, vec!["util.log-1", "util.log-2"]);
    }

    #[test]
    fn reporter_sees_every_object() {
        let reporter = Arc::new(IndicatifReporter::hidden());
        let objects = vec![obj("pkg", "a", &[]), obj("pkg", "b", &[])];
        GraphBuilder::new()
            .with_reporter(reporter.clone())
            .build(&objects);
        assert_eq!(reporter.completed(), 2);
    }

    #[tokio::test]
    async fn builds_from_store() {
        let store = MemoryStore::from_objects(vec![obj("pkg", "a", &["b"]), obj("pkg", "b", &[])]);
        let outcome = GraphBuilder::new()
            .build_from_store(&store, LoadOptions::lightweight())
            .await
            .unwrap();
        assert_eq!(outcome.graph.edges(), pairs(&[("pkg.a", "pkg.b")]));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn arb_objects() -> impl Strategy<Value = Vec<CodeObject>> {
            // Up to 12 procedures in two packages, each calling a few others
            // by a mix of qualified and unqualified names.
            proptest::collection::vec(proptest::collection::vec(0usize..14, 0..5), 1..12).prop_map(
                |call_lists| {
                    let n = call_lists.len();
                    call_lists
                        .into_iter()
                        .enumerate()
                        .map(|(i, targets)| {
                            let pkg = if i % 2 == 0 { "even" } else { "odd" };
                            let calls = targets
                                .into_iter()
                                .map(|t| {
                                    let tpkg = if t % 2 == 0 { "even" } else { "odd" };
                                    if t >= n {
                                        CallReference::new(format!("missing_{t}"))
                                    } else if tpkg == pkg {
                                        CallReference::new(format!("p{t}"))
                                    } else {
                                        CallReference::new(format!("{tpkg}.p{t}"))
                                    }
                                })
                                .collect();
                            CodeObject::new(pkg, &format!("p{i}"), ObjectKind::Procedure)
                                .with_calls(calls)
                        })
                        .collect()
                },
            )
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn construction_ignores_input_order(
                (objects, shuffled) in arb_objects().prop_flat_map(|objs| {
                    let shuffled = Just(objs.clone()).prop_shuffle();
                    (Just(objs), shuffled)
                })
            ) {
                let a = build_graph(&objects);
                let b = build_graph(&shuffled);
                prop_assert_eq!(a, b);
            }

            #[test]
            fn every_node_is_an_input_object(objects in arb_objects()) {
                let outcome = GraphBuilder::new().build(&objects);
                prop_assert_eq!(outcome.graph.node_count(), objects.len());
                prop_assert!(outcome.stats.edges_added <= outcome.stats.call_sites);
                for (src, dst) in outcome.graph.edges() {
                    prop_assert!(objects.iter().any(|o| o.id == src));
                    prop_assert!(objects.iter().any(|o| o.id == dst));
                }
            }
        }
    }
}
