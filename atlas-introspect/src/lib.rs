//! Atlas Introspect - Runtime Application Introspection
//!
//! An in-memory, indexed metadata store that answers structural queries
//! about a compiled application:
//! - Resource, route, and relationship lookups from O(1) indexes
//! - Dependency graph construction with bounded, directional, type-filtered
//!   subgraph queries and advisory cycle detection
//! - A dual-bounded (entry count and estimated memory) LRU cache in front
//!   of expensive graph queries, with hit/miss accounting
//! - Pattern mining over recurring, order-sensitive middleware chains
//!
//! # Quick Start
//!
//! ```
//! use atlas_introspect::{Registry, TraversalOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let payload = r#"{
//!     "version": "1.0",
//!     "generated": "2026-01-15T10:30:00Z",
//!     "source_hash": "3e5b",
//!     "resources": [
//!         {"name": "User"},
//!         {"name": "Post", "relationships": [{"kind": "belongs_to", "target": "User"}]}
//!     ]
//! }"#;
//!
//! let registry = Registry::new();
//! registry.register(payload)?;
//!
//! assert_eq!(registry.resources().len(), 2);
//! let deps = registry.dependencies("Post", &TraversalOptions::default())?;
//! assert!(deps.contains_node("User"));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`schema`] - Passive schema model deserialized from the registration
//!   payload
//! - [`registry`] - Snapshot ownership, index construction, and the public
//!   query surface
//! - [`graph`] - Dependency graph construction and traversal
//! - [`cache`] - Memoization of graph queries
//! - [`patterns`] - Middleware chain mining
//!
//! All operations are synchronous, bounded, in-memory computations. The
//! registry is an explicit value: construct it, call
//! [`Registry::register`], query it.

pub mod cache;
pub mod graph;
pub mod patterns;
pub mod registry;
pub mod schema;

pub use atlas_core::{AtlasError, CacheConfig, ExtractorConfig, IntrospectConfig, Result};
pub use cache::{CacheStats, EstimateSize, QueryCache};
pub use graph::{
    Cycle, CycleSeverity, TraversalOptions, build_graph, count_dependencies, count_dependents,
    dependency_depth, detect_cycles, subgraph,
};
pub use patterns::{PatternExtractor, canonical_chain_key};
pub use registry::{Registry, RegistrySummary, RouteFilter};
pub use schema::{
    Constraint, DependencyEdge, DependencyGraph, DependencyNode, Field, Hook, NodeKind, Pattern,
    PatternCategory, Relationship, RelationshipKind, RelationshipRef, Resource, Route, Schema,
    Validation,
};
