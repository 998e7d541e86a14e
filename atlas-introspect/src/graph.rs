//! Dependency graph construction and bounded traversal.
//!
//! The engine materializes one directed graph per registration: resources,
//! middleware entries, and functions referenced by hook bodies become nodes;
//! relationships and usages become labelled edges. Queries are answered by
//! breadth-first traversal with depth bounds, direction control, and edge
//! label filters, plus an advisory cycle detector.

use crate::schema::{DependencyEdge, DependencyGraph, DependencyNode, NodeKind, Schema};
use atlas_core::{AtlasError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Matches an identifier followed by an opening parenthesis in a hook body.
static CALL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("call pattern is valid"));

/// Control-flow keywords that look like calls to the pattern above.
const NON_CALL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "match", "return", "catch"];

/// Options for a bounded subgraph query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraversalOptions {
    /// Maximum hop distance from the start node; 0 means unlimited
    #[serde(default)]
    pub depth: usize,
    /// Walk incoming edges (who depends on the start) instead of outgoing
    #[serde(default)]
    pub reverse: bool,
    /// Restrict traversal to edges whose relationship label is in this set;
    /// empty means no restriction
    #[serde(default)]
    pub types: Vec<String>,
}

impl TraversalOptions {
    /// Canonical cache key for this query. The type filter is sorted so that
    /// equivalent filters produce the same key.
    pub fn cache_key(&self, start: &str) -> String {
        let direction = if self.reverse { "rev" } else { "fwd" };
        let mut types = self.types.clone();
        types.sort();
        format!(
            "dep:{start}:d{}:{direction}:{}",
            self.depth,
            types.join(",")
        )
    }
}

/// Severity of a dependency cycle, derived from its length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CycleSeverity {
    Low,
    Medium,
    High,
}

impl CycleSeverity {
    fn from_len(len: usize) -> Self {
        if len > 5 {
            CycleSeverity::High
        } else if len > 3 {
            CycleSeverity::Medium
        } else {
            CycleSeverity::Low
        }
    }
}

/// A directed cycle reported by [`detect_cycles`].
///
/// Cycles are advisory: they never block registration or queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cycle {
    /// Node IDs from the first occurrence of the closing node through the
    /// back edge, in traversal order
    pub entities: Vec<String>,
    pub severity: CycleSeverity,
}

/// Extract called function names from a hook body, in first-occurrence order.
fn extract_function_calls(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut calls = Vec::new();
    for capture in CALL_PATTERN.captures_iter(body) {
        let name = capture[1].to_string();
        if NON_CALL_KEYWORDS.contains(&name.as_str()) {
            continue;
        }
        if seen.insert(name.clone()) {
            calls.push(name);
        }
    }
    calls
}

fn middleware_node_id(entry: &str) -> String {
    format!("middleware:{entry}")
}

fn function_node_id(name: &str) -> String {
    format!("function:{name}")
}

fn push_edge(
    graph: &mut DependencyGraph,
    seen: &mut HashSet<(String, String, String)>,
    edge: DependencyEdge,
) {
    let key = (
        edge.from.clone(),
        edge.to.clone(),
        edge.relationship.clone(),
    );
    if seen.insert(key) {
        graph.add_edge(edge);
    }
}

/// Build the complete dependency graph for a schema.
///
/// The payload-provided graph is merged in first; nodes and edges derived
/// from the schema model are then added idempotently, so re-encountering an
/// ID never duplicates a node.
pub fn build_graph(schema: &Schema) -> DependencyGraph {
    let mut graph = schema.dependencies.clone();
    let mut edge_keys: HashSet<(String, String, String)> = graph
        .edges
        .iter()
        .map(|e| (e.from.clone(), e.to.clone(), e.relationship.clone()))
        .collect();

    for resource in &schema.resources {
        graph.add_node(DependencyNode::new(
            &resource.name,
            &resource.name,
            NodeKind::Resource,
        ));
    }

    for resource in &schema.resources {
        for rel in &resource.relationships {
            // placeholder node for targets declared elsewhere (or nowhere)
            graph.add_node(DependencyNode::new(
                &rel.target,
                &rel.target,
                NodeKind::Resource,
            ));
            push_edge(
                &mut graph,
                &mut edge_keys,
                DependencyEdge::new(&resource.name, &rel.target, rel.kind.to_string()),
            );
        }

        for chain in resource.middleware.values() {
            for entry in chain {
                let id = middleware_node_id(entry);
                graph.add_node(DependencyNode::new(&id, entry, NodeKind::Middleware));
                push_edge(
                    &mut graph,
                    &mut edge_keys,
                    DependencyEdge::new(&resource.name, &id, "uses"),
                );
            }
        }

        for hook in &resource.hooks {
            for call in extract_function_calls(&hook.body) {
                let id = function_node_id(&call);
                graph.add_node(DependencyNode::new(&id, &call, NodeKind::Function));
                push_edge(
                    &mut graph,
                    &mut edge_keys,
                    DependencyEdge::new(&resource.name, &id, "calls"),
                );
            }
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built dependency graph"
    );
    graph
}

/// Extract the bounded subgraph reachable from `start`.
///
/// Breadth-first, first-discovery-wins: a node is visited at most once, at
/// its shortest hop distance. The result is an independent copy containing
/// the visited nodes and the edges used to discover them; the start node is
/// always present even when nothing matches.
pub fn subgraph(
    graph: &DependencyGraph,
    start: &str,
    options: &TraversalOptions,
) -> Result<DependencyGraph> {
    let start_node = graph
        .nodes
        .get(start)
        .ok_or_else(|| AtlasError::not_found("node", start))?;

    let type_filter: Option<HashSet<&str>> = if options.types.is_empty() {
        None
    } else {
        Some(options.types.iter().map(String::as_str).collect())
    };

    // Adjacency over edge indices, keyed by the endpoint traversal leaves
    // from. Label filtering happens here, before any depth or visited
    // bookkeeping, so filtered-out edges never extend the frontier.
    let mut adjacency: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, edge) in graph.edges.iter().enumerate() {
        if let Some(filter) = &type_filter {
            if !filter.contains(edge.relationship.as_str()) {
                continue;
            }
        }
        let source = if options.reverse {
            edge.to.as_str()
        } else {
            edge.from.as_str()
        };
        adjacency.entry(source).or_default().push(idx);
    }

    let mut result = DependencyGraph::new();
    result.add_node(start_node.clone());

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start);
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    queue.push_back((start, 0));

    while let Some((current, dist)) = queue.pop_front() {
        if options.depth != 0 && dist >= options.depth {
            continue;
        }
        let Some(edge_indices) = adjacency.get(current) else {
            continue;
        };
        for &idx in edge_indices {
            let edge = &graph.edges[idx];
            let neighbor = if options.reverse {
                edge.from.as_str()
            } else {
                edge.to.as_str()
            };
            if visited.contains(neighbor) {
                continue;
            }
            // edges pointing at IDs the node map never declared are skipped
            let Some(node) = graph.nodes.get(neighbor) else {
                continue;
            };
            visited.insert(neighbor);
            result.add_node(node.clone());
            result.add_edge(edge.clone());
            queue.push_back((neighbor, dist + 1));
        }
    }

    debug!(
        start,
        depth = options.depth,
        reverse = options.reverse,
        nodes = result.node_count(),
        "extracted dependency subgraph"
    );
    Ok(result)
}

/// Detect directed cycles with a depth-first search and recursion stack.
///
/// Each back edge into a node still on the stack yields one cycle, rebuilt
/// as the path slice from that node's first occurrence. Fully explored
/// nodes are never re-explored, so disjoint cycles are each reported once.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        adjacency
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
    }

    let mut cycles = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = Vec::new();

    for node in graph.nodes.keys() {
        if !visited.contains(node.as_str()) {
            dfs_visit(
                node.as_str(),
                &adjacency,
                &mut visited,
                &mut stack,
                &mut path,
                &mut cycles,
            );
        }
    }

    if !cycles.is_empty() {
        debug!(count = cycles.len(), "detected dependency cycles");
    }
    cycles
}

fn dfs_visit<'a>(
    node: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    cycles: &mut Vec<Cycle>,
) {
    visited.insert(node);
    stack.insert(node);
    path.push(node);

    if let Some(neighbors) = adjacency.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                dfs_visit(neighbor, adjacency, visited, stack, path, cycles);
            } else if stack.contains(neighbor) {
                if let Some(pos) = path.iter().position(|&n| n == neighbor) {
                    let entities: Vec<String> =
                        path[pos..].iter().map(|s| (*s).to_string()).collect();
                    cycles.push(Cycle {
                        severity: CycleSeverity::from_len(entities.len()),
                        entities,
                    });
                }
            }
        }
    }

    path.pop();
    stack.remove(node);
}

/// Shortest hop distances from `start` to every reachable declared node.
fn bfs_distances<'a>(
    graph: &'a DependencyGraph,
    start: &str,
    reverse: bool,
) -> Result<HashMap<&'a str, usize>> {
    let start_key = graph
        .nodes
        .get_key_value(start)
        .map(|(k, _)| k.as_str())
        .ok_or_else(|| AtlasError::not_found("node", start))?;

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        let (src, dst) = if reverse {
            (edge.to.as_str(), edge.from.as_str())
        } else {
            (edge.from.as_str(), edge.to.as_str())
        };
        adjacency.entry(src).or_default().push(dst);
    }

    let mut distances: HashMap<&str, usize> = HashMap::new();
    distances.insert(start_key, 0);
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(start_key);

    while let Some(current) = queue.pop_front() {
        let dist = distances[current];
        if let Some(neighbors) = adjacency.get(current) {
            for &neighbor in neighbors {
                if distances.contains_key(neighbor) || !graph.nodes.contains_key(neighbor) {
                    continue;
                }
                distances.insert(neighbor, dist + 1);
                queue.push_back(neighbor);
            }
        }
    }

    Ok(distances)
}

/// Longest shortest-hop distance from `start` to any reachable node.
pub fn dependency_depth(graph: &DependencyGraph, start: &str) -> Result<usize> {
    let distances = bfs_distances(graph, start, false)?;
    Ok(distances.values().copied().max().unwrap_or(0))
}

/// Number of nodes reachable from `start` along outgoing edges.
pub fn count_dependencies(graph: &DependencyGraph, start: &str) -> Result<usize> {
    let distances = bfs_distances(graph, start, false)?;
    Ok(distances.len() - 1)
}

/// Number of nodes that can reach `start`, i.e. reverse reachability.
pub fn count_dependents(graph: &DependencyGraph, start: &str) -> Result<usize> {
    let distances = bfs_distances(graph, start, true)?;
    Ok(distances.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Hook, Relationship, RelationshipKind, Resource};
    use std::collections::BTreeMap;

    fn resource(name: &str) -> Resource {
        Resource {
            name: name.to_string(),
            fields: vec![],
            relationships: vec![],
            middleware: BTreeMap::new(),
            hooks: vec![],
            validations: vec![],
            constraints: vec![],
        }
    }

    fn belongs_to(target: &str) -> Relationship {
        Relationship {
            kind: RelationshipKind::BelongsTo,
            target: target.to_string(),
            foreign_key: None,
            on_delete: None,
            on_update: None,
        }
    }

    fn blog_schema() -> Schema {
        let mut post = resource("Post");
        post.relationships.push(belongs_to("User"));
        let mut comment = resource("Comment");
        comment.relationships.push(belongs_to("Post"));
        comment.relationships.push(belongs_to("User"));

        Schema {
            version: "1.0".to_string(),
            generated: "2026-01-15T10:30:00Z".parse().unwrap(),
            source_hash: "abc".to_string(),
            resources: vec![resource("User"), post, comment],
            routes: vec![],
            patterns: vec![],
            dependencies: DependencyGraph::new(),
        }
    }

    #[test]
    fn test_build_emits_resource_nodes_and_relationship_edges() {
        let graph = build_graph(&blog_schema());
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.contains_node("Comment"));
        assert!(
            graph
                .edges
                .iter()
                .any(|e| e.from == "Post" && e.to == "User" && e.relationship == "belongs_to")
        );
    }

    #[test]
    fn test_build_creates_placeholder_target_nodes() {
        let mut orphan = resource("Invoice");
        orphan.relationships.push(belongs_to("Account"));
        let mut schema = blog_schema();
        schema.resources = vec![orphan];

        let graph = build_graph(&schema);
        assert!(graph.contains_node("Account"));
        assert_eq!(graph.nodes["Account"].kind, NodeKind::Resource);
    }

    #[test]
    fn test_build_emits_middleware_and_function_nodes() {
        let mut user = resource("User");
        user.middleware
            .insert("create".to_string(), vec!["auth".to_string(), "log".to_string()]);
        user.middleware
            .insert("update".to_string(), vec!["auth".to_string()]);
        user.hooks.push(Hook {
            event: "before_create".to_string(),
            body: "hash_password(user.password); audit_log(user)".to_string(),
        });
        let mut schema = blog_schema();
        schema.resources = vec![user];

        let graph = build_graph(&schema);
        assert!(graph.contains_node("middleware:auth"));
        assert!(graph.contains_node("middleware:log"));
        assert!(graph.contains_node("function:hash_password"));
        assert!(graph.contains_node("function:audit_log"));
        assert_eq!(graph.nodes["middleware:auth"].kind, NodeKind::Middleware);
        assert_eq!(graph.nodes["function:audit_log"].kind, NodeKind::Function);

        // auth is used by two operations but emits one node and one edge
        let auth_edges: Vec<_> = graph
            .edges
            .iter()
            .filter(|e| e.to == "middleware:auth")
            .collect();
        assert_eq!(auth_edges.len(), 1);
        assert_eq!(auth_edges[0].relationship, "uses");
    }

    #[test]
    fn test_build_merges_payload_graph() {
        let mut schema = blog_schema();
        schema
            .dependencies
            .add_node(DependencyNode::new("job:cleanup", "cleanup", NodeKind::Function));
        schema.dependencies.add_edge(DependencyEdge::new(
            "User",
            "job:cleanup",
            "calls",
        ));

        let graph = build_graph(&schema);
        assert!(graph.contains_node("job:cleanup"));
        assert!(
            graph
                .edges
                .iter()
                .any(|e| e.from == "User" && e.to == "job:cleanup")
        );
        // User is declared both by the payload graph and the resource list
        assert_eq!(graph.nodes["User"].kind, NodeKind::Resource);
    }

    #[test]
    fn test_extract_function_calls_skips_keywords() {
        let calls = extract_function_calls("if (x) { notify(x); } while (y) { notify(y); }");
        assert_eq!(calls, vec!["notify".to_string()]);
    }

    #[test]
    fn test_subgraph_depth_one_includes_direct_neighbors() {
        let graph = build_graph(&blog_schema());
        let options = TraversalOptions {
            depth: 1,
            ..Default::default()
        };
        let sub = subgraph(&graph, "Comment", &options).unwrap();

        let mut ids: Vec<_> = sub.nodes.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["Comment", "Post", "User"]);
        assert_eq!(sub.edge_count(), 2);
    }

    #[test]
    fn test_subgraph_type_filter_happens_before_depth() {
        let graph = build_graph(&blog_schema());
        let options = TraversalOptions {
            depth: 1,
            types: vec!["belongs_to".to_string()],
            ..Default::default()
        };
        let sub = subgraph(&graph, "Comment", &options).unwrap();
        assert_eq!(sub.node_count(), 3);

        let none = subgraph(
            &graph,
            "Comment",
            &TraversalOptions {
                depth: 1,
                types: vec!["uses".to_string()],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(none.node_count(), 1);
        assert!(none.contains_node("Comment"));
        assert_eq!(none.edge_count(), 0);
    }

    #[test]
    fn test_subgraph_reverse_walks_incoming_edges() {
        let graph = build_graph(&blog_schema());
        let sub = subgraph(
            &graph,
            "User",
            &TraversalOptions {
                reverse: true,
                ..Default::default()
            },
        )
        .unwrap();

        let mut ids: Vec<_> = sub.nodes.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["Comment", "Post", "User"]);
    }

    #[test]
    fn test_subgraph_unknown_start_is_not_found() {
        let graph = build_graph(&blog_schema());
        let err = subgraph(&graph, "Missing", &TraversalOptions::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_subgraph_is_an_independent_copy() {
        let graph = build_graph(&blog_schema());
        let mut sub = subgraph(&graph, "Comment", &TraversalOptions::default()).unwrap();
        sub.nodes.clear();
        sub.edges.clear();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_subgraph_terminates_on_cycles_with_unlimited_depth() {
        let mut graph = DependencyGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(DependencyNode::new(id, id, NodeKind::Resource));
        }
        graph.add_edge(DependencyEdge::new("a", "b", "uses"));
        graph.add_edge(DependencyEdge::new("b", "c", "uses"));
        graph.add_edge(DependencyEdge::new("c", "a", "uses"));

        let sub = subgraph(&graph, "a", &TraversalOptions::default()).unwrap();
        assert_eq!(sub.node_count(), 3);
    }

    #[test]
    fn test_detect_cycles_empty_for_acyclic_graph() {
        let graph = build_graph(&blog_schema());
        assert!(detect_cycles(&graph).is_empty());
    }

    #[test]
    fn test_detect_cycles_reports_disjoint_cycles() {
        let mut graph = DependencyGraph::new();
        for id in ["a", "b", "x", "y", "z"] {
            graph.add_node(DependencyNode::new(id, id, NodeKind::Resource));
        }
        graph.add_edge(DependencyEdge::new("a", "b", "uses"));
        graph.add_edge(DependencyEdge::new("b", "a", "uses"));
        graph.add_edge(DependencyEdge::new("x", "y", "uses"));
        graph.add_edge(DependencyEdge::new("y", "z", "uses"));
        graph.add_edge(DependencyEdge::new("z", "x", "uses"));

        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 2);

        let lengths: Vec<usize> = {
            let mut v: Vec<usize> = cycles.iter().map(|c| c.entities.len()).collect();
            v.sort();
            v
        };
        assert_eq!(lengths, vec![2, 3]);
        assert!(cycles.iter().all(|c| c.severity == CycleSeverity::Low));
    }

    #[test]
    fn test_cycle_severity_thresholds() {
        assert_eq!(CycleSeverity::from_len(3), CycleSeverity::Low);
        assert_eq!(CycleSeverity::from_len(4), CycleSeverity::Medium);
        assert_eq!(CycleSeverity::from_len(5), CycleSeverity::Medium);
        assert_eq!(CycleSeverity::from_len(6), CycleSeverity::High);
    }

    #[test]
    fn test_depth_and_count_utilities() {
        let graph = build_graph(&blog_schema());
        assert_eq!(dependency_depth(&graph, "Comment").unwrap(), 1);
        assert_eq!(dependency_depth(&graph, "User").unwrap(), 0);
        assert_eq!(count_dependencies(&graph, "Comment").unwrap(), 2);
        assert_eq!(count_dependencies(&graph, "User").unwrap(), 0);
        assert_eq!(count_dependents(&graph, "User").unwrap(), 2);
        assert_eq!(count_dependents(&graph, "Comment").unwrap(), 0);
    }

    #[test]
    fn test_depth_is_the_longest_shortest_hop() {
        let mut chain = DependencyGraph::new();
        for id in ["a", "b", "c"] {
            chain.add_node(DependencyNode::new(id, id, NodeKind::Resource));
        }
        chain.add_edge(DependencyEdge::new("a", "b", "uses"));
        chain.add_edge(DependencyEdge::new("b", "c", "uses"));

        assert_eq!(dependency_depth(&chain, "a").unwrap(), 2);
    }

    #[test]
    fn test_cache_key_is_canonical() {
        let a = TraversalOptions {
            depth: 2,
            reverse: false,
            types: vec!["uses".to_string(), "calls".to_string()],
        };
        let b = TraversalOptions {
            depth: 2,
            reverse: false,
            types: vec!["calls".to_string(), "uses".to_string()],
        };
        assert_eq!(a.cache_key("User"), b.cache_key("User"));
        assert_ne!(
            a.cache_key("User"),
            TraversalOptions::default().cache_key("User")
        );
    }
}
