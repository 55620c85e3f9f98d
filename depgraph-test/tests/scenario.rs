//! The four-procedure walkthrough: build from a store, analyze, cut a
//! subgraph, persist it, and read it back.

use depgraph_core::analyze::{
    find_all_paths, find_circular_dependencies, find_entry_points, find_terminal_nodes,
    get_connected_components, get_node_degrees,
};
use depgraph_core::construct::GraphBuilder;
use depgraph_core::persist::{self, GraphFormat, PersistMode};
use depgraph_core::store::LoadOptions;
use depgraph_core::subgraph::{SubgraphRequest, generate_subgraph};
use depgraph_test::{TestStore, scenario_objects};

#[tokio::test]
async fn build_and_analyze_from_store() {
    let fixture = TestStore::with_objects(&scenario_objects()).await;
    let outcome = GraphBuilder::new()
        .build_from_store(&fixture.store, LoadOptions::default())
        .await
        .unwrap();
    let graph = outcome.graph;

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 4);
    assert!(outcome.stats.unresolved.is_empty());
    assert!(outcome.stats.ambiguous.is_empty());

    assert_eq!(find_entry_points(&graph), vec!["app.d"]);
    assert!(find_terminal_nodes(&graph, false).is_empty());

    let cycles = find_circular_dependencies(&graph);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes(), ["app.a", "app.b", "app.c"]);

    let b = get_node_degrees(&graph, "app.b").unwrap();
    assert_eq!((b.in_degree, b.out_degree), (2, 1));

    let strong = get_connected_components(&graph, true);
    assert!(strong.contains(&vec!["app.a".to_string(), "app.b".into(), "app.c".into()]));
    assert_eq!(get_connected_components(&graph, false).len(), 1);

    let paths = find_all_paths(&graph, "app.d", "app.a", None).unwrap();
    assert_eq!(paths, vec![vec!["app.d", "app.b", "app.c", "app.a"]]);
}

#[tokio::test]
async fn subgraph_around_b_keeps_the_back_edge() {
    let fixture = TestStore::with_objects(&scenario_objects()).await;
    let graph = GraphBuilder::new()
        .build_from_store(&fixture.store, LoadOptions::default())
        .await
        .unwrap()
        .graph;

    let sub = generate_subgraph(&graph, "app.b", 1, Some(1)).unwrap();
    assert_eq!(sub.node_ids(), ["app.a", "app.b", "app.c", "app.d"]);
    assert!(sub.has_edge("app.c", "app.a"));
    assert_eq!(sub.edge_count(), 4);

    let narrow = SubgraphRequest::new("app.b")
        .upstream(0)
        .downstream(Some(1))
        .generate(&graph)
        .unwrap();
    assert_eq!(narrow.node_ids(), ["app.b", "app.c"]);
    assert_eq!(narrow.edges(), [("app.b".to_string(), "app.c".to_string())]);
}

#[tokio::test]
async fn saved_subgraph_reloads_and_rehydrates() {
    let fixture = TestStore::with_objects(&scenario_objects()).await;
    let graph = GraphBuilder::new()
        .build_from_store(&fixture.store, LoadOptions::default())
        .await
        .unwrap()
        .graph;
    let sub = generate_subgraph(&graph, "app.c", 1, Some(0)).unwrap();
    assert_eq!(sub.node_ids(), ["app.b", "app.c"]);

    let path = fixture.path().join("around_c.graphml");
    persist::save(&sub, &path, GraphFormat::GraphMl, PersistMode::StructureOnly).unwrap();

    let (loaded, stats) = persist::load_and_populate(&path, GraphFormat::GraphMl, &fixture.store)
        .await
        .unwrap();
    assert_eq!(stats.requested, 2);
    assert_eq!(stats.populated, 2);
    assert!(stats.gaps.is_empty());
    assert_eq!(loaded.edges(), sub.edges());
    assert_eq!(loaded.nodes(), sub.nodes());
}
