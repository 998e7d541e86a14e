//! Error types for the Atlas introspection system.

/// Result type alias for Atlas operations.
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Main error type for the Atlas introspection system.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// Registration payload failed to deserialize
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Query for a name that does not exist
    #[error("Not found: {kind} '{name}'")]
    NotFound { kind: String, name: String },

    /// Query issued before any successful registration
    #[error("Registry not initialized: no schema has been registered")]
    NotInitialized,

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapped anyhow errors for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AtlasError {
    /// Create a new not found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a not initialized error
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }

    /// Check if this is a deserialization error
    pub fn is_deserialization(&self) -> bool {
        matches!(self, Self::Deserialization(_))
    }
}
