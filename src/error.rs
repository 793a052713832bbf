//! Error types for the zine document store and its projections.

use thiserror::Error;

/// Result type alias for zine operations.
pub type ZineResult<T> = Result<T, ZineError>;

/// Errors that can occur while editing, loading or exporting a zine.
#[derive(Error, Debug)]
pub enum ZineError {
    /// Automerge error while building or reading a blob.
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Autosurgeon hydration error.
    #[error("Hydration error: {0}")]
    Hydrate(#[from] autosurgeon::HydrateError),

    /// Autosurgeon reconcile error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] autosurgeon::ReconcileError),

    /// A path (or its parent) does not exist in the document.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A mutation was attempted with an empty key path.
    #[error("Key path must not be empty")]
    EmptyPath,

    /// `load` was called on a store that already holds entries.
    #[error("Cannot load into non-empty zine ({entries} entries present)")]
    NotEmpty { entries: usize },

    /// The panel is not part of the storyboard's live set.
    #[error("Panel not found: {0}")]
    PanelNotFound(String),

    /// The layer is not part of the panel's live set.
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// The projection object was already torn down.
    #[error("Projection destroyed: {0}")]
    Destroyed(String),

    /// The blob does not start with the zine magic bytes.
    #[error("Invalid magic bytes: expected {expected:?}")]
    InvalidMagic { expected: &'static str },

    /// Schema violation - blob structure is invalid.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Compression or decompression of a field failed.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Configuration value out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// I/O error (compression streams, config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ZineError {
    /// Creates a KeyNotFound error from a key path.
    pub fn key_not_found<K: AsRef<str>>(path: &[K]) -> Self {
        let joined: Vec<&str> = path.iter().map(|k| k.as_ref()).collect();
        Self::KeyNotFound(joined.join(", "))
    }

    /// Creates a PanelNotFound error.
    pub fn panel_not_found(what: impl Into<String>) -> Self {
        Self::PanelNotFound(what.into())
    }

    /// Creates a LayerNotFound error.
    pub fn layer_not_found(what: impl Into<String>) -> Self {
        Self::LayerNotFound(what.into())
    }

    /// Creates a Destroyed error.
    pub fn destroyed(what: impl Into<String>) -> Self {
        Self::Destroyed(what.into())
    }

    /// Creates a SchemaViolation error.
    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    /// Creates a Compression error.
    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    /// Returns true for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound(_) | Self::PanelNotFound(_) | Self::LayerNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_found_joins_path() {
        let err = ZineError::key_not_found(&["panel-1", "layer-2"]);
        assert_eq!(err.to_string(), "Key not found: panel-1, layer-2");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_not_empty_message() {
        let err = ZineError::NotEmpty { entries: 3 };
        assert!(err.to_string().contains("non-empty"));
        assert!(!err.is_not_found());
    }
}
