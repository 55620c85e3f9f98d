//! Resolution, build statistics and classification over the order system.

use depgraph_core::analyze::{
    ClassifyConfig, NodeRole, classify_nodes, find_circular_dependencies, find_entry_points,
    find_terminal_nodes, get_connected_components,
};
use depgraph_core::construct::{BuildOutcome, GraphBuilder};
use depgraph_core::types::CodeObject;
use depgraph_test::order_system;

fn build() -> BuildOutcome {
    GraphBuilder::new().build(&order_system())
}

#[test]
fn build_stats_account_for_every_call_site() {
    let BuildOutcome { graph, stats } = build();

    assert_eq!(stats.nodes_added, 10);
    assert_eq!(stats.edges_added, 12);
    assert_eq!(graph.edge_count(), 12);
    assert_eq!(stats.call_sites, 13);
    assert_eq!(stats.self_loops, 1);
    assert!(stats.malformed.is_empty());

    assert_eq!(stats.unresolved.len(), 1);
    assert_eq!(stats.unresolved[0].caller, "pkg_orders.place_order");
    assert_eq!(stats.unresolved[0].callee_name, "dbms_output.put_line");
    assert_eq!(stats.unresolved[0].line, 7);

    assert_eq!(stats.ambiguous.len(), 1);
    let ambiguous = &stats.ambiguous[0];
    assert_eq!(ambiguous.caller, "pkg_stock.reserve");
    assert_eq!(ambiguous.chosen, "pkg_log.log_event-a1");
    assert_eq!(
        ambiguous.candidates,
        ["pkg_log.log_event-a1", "pkg_log.log_event-b2"]
    );
}

#[test]
fn calls_resolve_to_the_expected_targets() {
    let graph = build().graph;
    let callees = |id: &str| graph.successors(id).unwrap();

    assert_eq!(
        callees("pkg_orders.place_order"),
        [
            "audit_trail",
            "pkg_log.log_event-a1",
            "pkg_orders.validate_order",
            "pkg_stock.reserve",
        ]
    );
    assert_eq!(callees("pkg_orders.validate_order"), ["pkg_log.log_event-b2"]);
    assert_eq!(
        callees("pkg_orders.cancel_order"),
        [
            "pkg_invoice.void_invoice",
            "pkg_log.log_event-a1",
            "pkg_stock.release",
        ]
    );
    assert_eq!(callees("pkg_stock.release"), ["pkg_stock.release"]);
    assert_eq!(callees("pkg_invoice.void_invoice"), ["audit_trail"]);
    assert_eq!(callees("trg_orders_audit"), ["pkg_orders.cancel_order"]);
}

#[test]
fn input_order_does_not_change_the_graph() {
    let forward = build().graph;
    let mut reversed = order_system();
    reversed.reverse();
    let backward = GraphBuilder::new().build(&reversed).graph;

    assert_eq!(forward.node_ids(), backward.node_ids());
    assert_eq!(forward.edges(), backward.edges());
}

#[test]
fn duplicate_ids_keep_the_first_in_id_order() {
    let mut objects = order_system();
    objects.push(
        CodeObject::new("", "AUDIT_TRAIL", depgraph_core::ObjectKind::Function).with_id("AUDIT_TRAIL"),
    );
    let outcome = GraphBuilder::new().build(&objects);

    assert_eq!(outcome.stats.nodes_added, 10);
    assert_eq!(outcome.stats.malformed.len(), 1);
    assert_eq!(outcome.stats.malformed[0].reason, "duplicate id");
    assert!(outcome.graph.contains("AUDIT_TRAIL"));
    assert!(!outcome.graph.contains("audit_trail"));
}

#[test]
fn structural_analysis() {
    let graph = build().graph;

    assert_eq!(
        find_entry_points(&graph),
        ["pkg_orders.place_order", "trg_orders_audit"]
    );
    assert_eq!(
        find_terminal_nodes(&graph, false),
        ["audit_trail", "pkg_log.log_event-a1", "pkg_log.log_event-b2"]
    );

    let cycles = find_circular_dependencies(&graph);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes(), ["pkg_stock.release"]);

    let weak = get_connected_components(&graph, false);
    assert_eq!(weak.len(), 1);
    assert_eq!(weak[0].len(), 10);
}

#[test]
fn classification_roles() {
    let graph = build().graph;
    let classification = classify_nodes(&graph, &ClassifyConfig::default()).unwrap();

    assert!(classification.nodes_with(NodeRole::Orphan).is_empty());
    assert_eq!(
        classification.nodes_with(NodeRole::Hub),
        [
            "pkg_invoice.void_invoice",
            "pkg_orders.cancel_order",
            "pkg_orders.place_order",
        ]
    );
    assert_eq!(
        classification.nodes_with(NodeRole::EntryPoint),
        ["trg_orders_audit"]
    );
    assert_eq!(
        classification.nodes_with(NodeRole::Terminal),
        ["audit_trail", "pkg_log.log_event-a1", "pkg_log.log_event-b2"]
    );
    assert_eq!(classification.roles.len(), 10);

    let release = &classification.metrics["pkg_stock.release"];
    assert_eq!((release.in_degree, release.out_degree), (2, 1));
    assert!(release.betweenness.abs() < f64::EPSILON);
}
