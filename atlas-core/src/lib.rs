//! Core types and configuration for the Atlas introspection system.
//!
//! This crate provides the foundational error handling and configuration
//! types used across all Atlas components.

pub mod config;
pub mod error;

pub use config::{CacheConfig, ExtractorConfig, IntrospectConfig};
pub use error::{AtlasError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{CacheConfig, ExtractorConfig, IntrospectConfig};
    pub use crate::error::{AtlasError, Result};
}
