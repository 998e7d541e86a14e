//! Passive schema model produced by deserializing a registration payload.
//!
//! These types mirror the structural description emitted by the application
//! compiler: resources with their fields, relationships and middleware
//! chains, the route table, previously mined patterns, and the dependency
//! graph. The model is a snapshot: created once per registration, never
//! mutated, with queries handing out owned copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level immutable snapshot of a compiled application's structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    /// Payload format version
    pub version: String,
    /// When the compiler generated this snapshot
    pub generated: DateTime<Utc>,
    /// Hash of the application source the snapshot was derived from
    pub source_hash: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub dependencies: DependencyGraph,
}

/// A named structural entity with fields, relationships, hooks, and
/// per-operation middleware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    /// Unique resource name
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Operation name to ordered middleware chain
    #[serde(default)]
    pub middleware: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub hooks: Vec<Hook>,
    #[serde(default)]
    pub validations: Vec<Validation>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

/// A single resource field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<String>,
}

/// Kind of a directed resource-to-resource reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    BelongsTo,
    HasMany,
    HasManyThrough,
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationshipKind::BelongsTo => write!(f, "belongs_to"),
            RelationshipKind::HasMany => write!(f, "has_many"),
            RelationshipKind::HasManyThrough => write!(f, "has_many_through"),
        }
    }
}

/// A typed, directed reference from an owning resource to a target resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub kind: RelationshipKind,
    /// Name of the target resource
    pub target: String,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
}

/// A reverse-index entry: which resource points at the queried one, and how.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipRef {
    pub source_resource: String,
    pub relationship: Relationship,
}

/// A lifecycle hook attached to a resource.
///
/// Function calls referenced by the hook body become `function` nodes in the
/// dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hook {
    /// Lifecycle event, e.g. `before_create`
    pub event: String,
    #[serde(default)]
    pub body: String,
}

/// A field-level validation rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Validation {
    pub field: String,
    pub rule: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// A resource-level constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expression: String,
}

/// An HTTP route mapped to a resource operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub resource: String,
    pub operation: String,
    #[serde(default)]
    pub middleware: Vec<String>,
}

/// Category assigned to a mined middleware pattern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Authentication,
    Caching,
    RateLimiting,
    Cors,
    General,
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternCategory::Authentication => write!(f, "authentication"),
            PatternCategory::Caching => write!(f, "caching"),
            PatternCategory::RateLimiting => write!(f, "rate_limiting"),
            PatternCategory::Cors => write!(f, "cors"),
            PatternCategory::General => write!(f, "general"),
        }
    }
}

/// A recurring middleware chain discovered by the pattern extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    pub name: String,
    pub category: PatternCategory,
    /// The chain rendered in declared order
    pub template: String,
    #[serde(default)]
    pub examples: Vec<String>,
    /// Total usage count, independent of how many examples were retained
    pub frequency: u32,
    /// Frequency-derived score in [0, 1]
    pub confidence: f64,
}

/// Kind of a dependency graph node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Resource,
    Middleware,
    Function,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Resource => write!(f, "resource"),
            NodeKind::Middleware => write!(f, "middleware"),
            NodeKind::Function => write!(f, "function"),
        }
    }
}

/// Graph node representing a resource, middleware entry, or function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

impl DependencyNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Graph edge representing a relationship or usage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    /// Edge label: a relationship kind, `uses`, or `calls`
    pub relationship: String,
    #[serde(default = "default_edge_weight")]
    pub weight: f64,
}

fn default_edge_weight() -> f64 {
    1.0
}

impl DependencyEdge {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relationship: relationship.into(),
            weight: 1.0,
        }
    }
}

/// Directed graph over resources, middleware, and functions.
///
/// Every edge's endpoints must name nodes present in the same graph, except
/// while a subgraph is being extracted incrementally.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependencyGraph {
    #[serde(default)]
    pub nodes: BTreeMap<String, DependencyNode>,
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Insert a node unless one with the same ID already exists.
    pub fn add_node(&mut self, node: DependencyNode) {
        self.nodes.entry(node.id.clone()).or_insert(node);
    }

    pub fn add_edge(&mut self, edge: DependencyEdge) {
        self.edges.push(edge);
    }
}
