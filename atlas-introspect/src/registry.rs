//! Indexed registry over the active schema snapshot.
//!
//! The registry owns the current [`Schema`] and answers point queries from
//! indexes built once per registration. A single reader/writer lock guards
//! the snapshot: registration swaps the whole snapshot (schema, graph, and
//! every index) under the write path, so readers observe either the entire
//! old state or the entire new one. Expensive graph queries go through the
//! query cache, which carries its own lock.

use crate::cache::{CacheStats, QueryCache};
use crate::graph::{self, Cycle, TraversalOptions};
use crate::patterns::PatternExtractor;
use crate::schema::{
    DependencyGraph, Pattern, PatternCategory, RelationshipRef, Resource, Route, Schema,
};
use atlas_core::{AtlasError, ExtractorConfig, IntrospectConfig, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Conjunction filter for route queries. Absent fields don't constrain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RouteFilter {
    pub method: Option<String>,
    pub path: Option<String>,
    pub resource: Option<String>,
}

impl RouteFilter {
    fn matches(&self, route: &Route) -> bool {
        self.method
            .as_deref()
            .map_or(true, |method| route.method.eq_ignore_ascii_case(method))
            && self.path.as_deref().map_or(true, |path| route.path == path)
            && self
                .resource
                .as_deref()
                .map_or(true, |resource| route.resource == resource)
    }
}

/// Counts describing the registered snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrySummary {
    pub version: Option<String>,
    pub resources: usize,
    pub routes: usize,
    pub patterns: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}

/// Everything derived from one registration. Replaced wholesale; never
/// mutated in place.
struct Snapshot {
    schema: Schema,
    graph: DependencyGraph,
    resource_index: HashMap<String, usize>,
    routes_by_path: HashMap<String, Vec<usize>>,
    routes_by_method: HashMap<String, Vec<usize>>,
    pattern_index: HashMap<String, usize>,
    reverse_relationships: HashMap<String, Vec<RelationshipRef>>,
}

impl Snapshot {
    /// One linear pass over each collection; no lookup during the build
    /// scans a full collection.
    fn build(schema: Schema) -> Self {
        let graph = graph::build_graph(&schema);

        let mut resource_index = HashMap::with_capacity(schema.resources.len());
        let mut reverse_relationships: HashMap<String, Vec<RelationshipRef>> = HashMap::new();
        for (idx, resource) in schema.resources.iter().enumerate() {
            resource_index.insert(resource.name.clone(), idx);
            for relationship in &resource.relationships {
                reverse_relationships
                    .entry(relationship.target.clone())
                    .or_default()
                    .push(RelationshipRef {
                        source_resource: resource.name.clone(),
                        relationship: relationship.clone(),
                    });
            }
        }

        let mut routes_by_path: HashMap<String, Vec<usize>> = HashMap::new();
        let mut routes_by_method: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, route) in schema.routes.iter().enumerate() {
            routes_by_path
                .entry(route.path.clone())
                .or_default()
                .push(idx);
            routes_by_method
                .entry(route.method.to_ascii_uppercase())
                .or_default()
                .push(idx);
        }

        let mut pattern_index = HashMap::with_capacity(schema.patterns.len());
        for (idx, pattern) in schema.patterns.iter().enumerate() {
            pattern_index.insert(pattern.name.clone(), idx);
        }

        Self {
            schema,
            graph,
            resource_index,
            routes_by_path,
            routes_by_method,
            pattern_index,
            reverse_relationships,
        }
    }
}

/// The introspection registry.
///
/// Constructed explicitly and populated by [`Registry::register`]; there is
/// no process-wide instance and no implicit first-call initialization.
pub struct Registry {
    state: RwLock<Option<Snapshot>>,
    cache: QueryCache<DependencyGraph>,
    extractor_config: ExtractorConfig,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(IntrospectConfig::default())
    }

    pub fn with_config(config: IntrospectConfig) -> Self {
        Self {
            state: RwLock::new(None),
            cache: QueryCache::new(&config.cache),
            extractor_config: config.extractor,
        }
    }

    /// Deserialize a registration payload and atomically replace the active
    /// snapshot. Malformed input fails before the lock is taken, so prior
    /// state stays untouched.
    pub fn register(&self, payload: &str) -> Result<()> {
        let schema: Schema = serde_json::from_str(payload)?;
        let snapshot = Snapshot::build(schema);
        info!(
            version = %snapshot.schema.version,
            resources = snapshot.schema.resources.len(),
            routes = snapshot.schema.routes.len(),
            graph_nodes = snapshot.graph.node_count(),
            "registered schema"
        );
        *self.state.write() = Some(snapshot);
        // cached subgraphs belong to the replaced snapshot
        self.cache.clear();
        Ok(())
    }

    /// Look up a resource by name. The returned value is an owned copy;
    /// mutating it cannot affect the registry.
    pub fn resource(&self, name: &str) -> Result<Resource> {
        let state = self.state.read();
        let snapshot = state
            .as_ref()
            .ok_or_else(|| AtlasError::not_found("resource", name))?;
        snapshot
            .resource_index
            .get(name)
            .map(|&idx| snapshot.schema.resources[idx].clone())
            .ok_or_else(|| AtlasError::not_found("resource", name))
    }

    /// All registered resources; empty before the first registration.
    pub fn resources(&self) -> Vec<Resource> {
        self.state
            .read()
            .as_ref()
            .map(|snapshot| snapshot.schema.resources.clone())
            .unwrap_or_default()
    }

    /// Routes matching the filter conjunction; empty before the first
    /// registration.
    pub fn routes(&self, filter: &RouteFilter) -> Vec<Route> {
        let state = self.state.read();
        let Some(snapshot) = state.as_ref() else {
            return Vec::new();
        };

        let candidates: Vec<usize> = if let Some(path) = &filter.path {
            snapshot.routes_by_path.get(path).cloned().unwrap_or_default()
        } else if let Some(method) = &filter.method {
            snapshot
                .routes_by_method
                .get(&method.to_ascii_uppercase())
                .cloned()
                .unwrap_or_default()
        } else {
            (0..snapshot.schema.routes.len()).collect()
        };

        candidates
            .into_iter()
            .map(|idx| &snapshot.schema.routes[idx])
            .filter(|route| filter.matches(route))
            .cloned()
            .collect()
    }

    /// Registered patterns, optionally restricted to one category; empty
    /// before the first registration.
    pub fn patterns(&self, category: Option<PatternCategory>) -> Vec<Pattern> {
        let state = self.state.read();
        let Some(snapshot) = state.as_ref() else {
            return Vec::new();
        };
        snapshot
            .schema
            .patterns
            .iter()
            .filter(|pattern| category.map_or(true, |c| pattern.category == c))
            .cloned()
            .collect()
    }

    /// Look up a registered pattern by name.
    pub fn pattern(&self, name: &str) -> Result<Pattern> {
        let state = self.state.read();
        let snapshot = state
            .as_ref()
            .ok_or_else(|| AtlasError::not_found("pattern", name))?;
        snapshot
            .pattern_index
            .get(name)
            .map(|&idx| snapshot.schema.patterns[idx].clone())
            .ok_or_else(|| AtlasError::not_found("pattern", name))
    }

    /// All (source resource, relationship) pairs targeting the named
    /// resource, from the reverse index.
    pub fn relationships_to(&self, resource_name: &str) -> Vec<RelationshipRef> {
        self.state
            .read()
            .as_ref()
            .and_then(|snapshot| snapshot.reverse_relationships.get(resource_name).cloned())
            .unwrap_or_default()
    }

    /// Bounded dependency subgraph for a node, served from the query cache
    /// when possible.
    pub fn dependencies(
        &self,
        name: &str,
        options: &TraversalOptions,
    ) -> Result<DependencyGraph> {
        let key = options.cache_key(name);

        let state = self.state.read();
        let snapshot = state.as_ref().ok_or(AtlasError::NotInitialized)?;

        if let Some(cached) = self.cache.get(&key) {
            debug!(%key, "dependency query served from cache");
            return Ok(cached);
        }

        let result = graph::subgraph(&snapshot.graph, name, options)?;
        drop(state);
        self.cache.set(key, result.clone());
        Ok(result)
    }

    /// Full copy of the active schema, or `None` before registration.
    pub fn schema(&self) -> Option<Schema> {
        self.state
            .read()
            .as_ref()
            .map(|snapshot| snapshot.schema.clone())
    }

    /// Advisory cycle report over the full dependency graph.
    pub fn detect_cycles(&self) -> Vec<Cycle> {
        self.state
            .read()
            .as_ref()
            .map(|snapshot| graph::detect_cycles(&snapshot.graph))
            .unwrap_or_default()
    }

    /// Longest hop distance from the named node to anything reachable.
    pub fn dependency_depth(&self, name: &str) -> Result<usize> {
        let state = self.state.read();
        let snapshot = state.as_ref().ok_or(AtlasError::NotInitialized)?;
        graph::dependency_depth(&snapshot.graph, name)
    }

    /// How many nodes the named node reaches along outgoing edges.
    pub fn count_dependencies(&self, name: &str) -> Result<usize> {
        let state = self.state.read();
        let snapshot = state.as_ref().ok_or(AtlasError::NotInitialized)?;
        graph::count_dependencies(&snapshot.graph, name)
    }

    /// How many nodes can reach the named node.
    pub fn count_dependents(&self, name: &str) -> Result<usize> {
        let state = self.state.read();
        let snapshot = state.as_ref().ok_or(AtlasError::NotInitialized)?;
        graph::count_dependents(&snapshot.graph, name)
    }

    /// Run the pattern extractor over the active schema; empty before the
    /// first registration.
    pub fn extract_patterns(&self) -> Vec<Pattern> {
        let state = self.state.read();
        let Some(snapshot) = state.as_ref() else {
            return Vec::new();
        };
        PatternExtractor::new(self.extractor_config.clone()).extract(&snapshot.schema)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn summary(&self) -> RegistrySummary {
        let state = self.state.read();
        match state.as_ref() {
            Some(snapshot) => RegistrySummary {
                version: Some(snapshot.schema.version.clone()),
                resources: snapshot.schema.resources.len(),
                routes: snapshot.schema.routes.len(),
                patterns: snapshot.schema.patterns.len(),
                graph_nodes: snapshot.graph.node_count(),
                graph_edges: snapshot.graph.edge_count(),
            },
            None => RegistrySummary::default(),
        }
    }

    /// Clear all registered state and the query cache (test/ops utility).
    pub fn reset(&self) {
        *self.state.write() = None;
        self.cache.clear();
        info!("registry reset");
    }
}
