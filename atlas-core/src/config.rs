//! Configuration for the introspection subsystem.
//!
//! Configuration is plain data: construct it, override fields, and hand it
//! to [`crate::config::IntrospectConfig`] consumers. There is no global
//! configuration state.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the introspection subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntrospectConfig {
    /// Query cache bounds
    pub cache: CacheConfig,
    /// Pattern extractor thresholds
    pub extractor: ExtractorConfig,
}

/// Bounds for the dependency query cache.
///
/// Both bounds are enforced together: an insert evicts least-recently-used
/// entries until the entry count and the estimated memory footprint are
/// within limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    pub max_entries: usize,
    /// Maximum estimated memory footprint in bytes
    pub max_memory_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_memory_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Thresholds and output options for the pattern extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Minimum number of usages before a chain becomes a candidate pattern
    pub min_frequency: u32,
    /// Candidates scoring below this confidence are dropped
    pub min_confidence: f64,
    /// Maximum number of usage examples retained per pattern
    pub max_examples: usize,
    /// Include parameter details and the dominant operation in pattern names
    pub verbose_names: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_frequency: 3,
            min_confidence: 0.0,
            max_examples: 5,
            verbose_names: false,
        }
    }
}
