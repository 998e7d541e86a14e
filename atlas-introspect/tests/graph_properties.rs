//! Property tests for bounded graph traversal and cycle detection.

use atlas_introspect::{
    DependencyEdge, DependencyGraph, DependencyNode, NodeKind, TraversalOptions, detect_cycles,
    subgraph,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn graph_from(n: usize, pairs: &[(usize, usize)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..n {
        let id = format!("n{i}");
        graph.add_node(DependencyNode::new(&id, &id, NodeKind::Resource));
    }
    let mut seen = HashSet::new();
    for &(a, b) in pairs {
        if a == b {
            continue;
        }
        if seen.insert((a, b)) {
            graph.add_edge(DependencyEdge::new(
                format!("n{a}"),
                format!("n{b}"),
                "uses",
            ));
        }
    }
    graph
}

proptest! {
    #[test]
    fn depth_bounded_node_sets_are_nested(
        n in 2usize..10,
        pairs in proptest::collection::vec((0usize..10, 0usize..10), 0..30),
    ) {
        let pairs: Vec<(usize, usize)> =
            pairs.into_iter().map(|(a, b)| (a % n, b % n)).collect();
        let graph = graph_from(n, &pairs);

        let nodes_at = |depth: usize| -> HashSet<String> {
            let options = TraversalOptions { depth, ..Default::default() };
            let sub = subgraph(&graph, "n0", &options).unwrap();
            sub.nodes.keys().cloned().collect()
        };

        let unlimited = nodes_at(0);
        let mut previous = nodes_at(1);
        for depth in 2..5 {
            let current = nodes_at(depth);
            prop_assert!(previous.is_subset(&current));
            prop_assert!(current.is_subset(&unlimited));
            previous = current;
        }
        prop_assert!(unlimited.contains("n0"));
    }

    #[test]
    fn subgraph_edges_reference_contained_nodes(
        n in 2usize..10,
        pairs in proptest::collection::vec((0usize..10, 0usize..10), 0..30),
    ) {
        let pairs: Vec<(usize, usize)> =
            pairs.into_iter().map(|(a, b)| (a % n, b % n)).collect();
        let graph = graph_from(n, &pairs);

        let sub = subgraph(&graph, "n0", &TraversalOptions::default()).unwrap();
        for edge in &sub.edges {
            prop_assert!(sub.contains_node(&edge.from));
            prop_assert!(sub.contains_node(&edge.to));
        }
    }

    #[test]
    fn acyclic_graphs_report_no_cycles(
        n in 2usize..10,
        pairs in proptest::collection::vec((0usize..10, 0usize..10), 0..30),
    ) {
        // orienting every edge from the lower index to the higher one
        // rules out directed cycles
        let pairs: Vec<(usize, usize)> = pairs
            .into_iter()
            .map(|(a, b)| (a % n, b % n))
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        let graph = graph_from(n, &pairs);
        prop_assert!(detect_cycles(&graph).is_empty());
    }

    #[test]
    fn self_loop_is_always_a_cycle(n in 1usize..6) {
        let mut graph = graph_from(n, &[]);
        graph.add_edge(DependencyEdge::new("n0", "n0", "uses"));
        let cycles = detect_cycles(&graph);
        prop_assert_eq!(cycles.len(), 1);
        prop_assert_eq!(cycles[0].entities.clone(), vec!["n0".to_string()]);
    }

    #[test]
    fn traversal_terminates_on_rings(n in 2usize..8) {
        let pairs: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        let graph = graph_from(n, &pairs);
        let sub = subgraph(&graph, "n0", &TraversalOptions::default()).unwrap();
        prop_assert_eq!(sub.node_count(), n);
    }
}
