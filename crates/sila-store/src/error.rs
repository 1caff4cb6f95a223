use std::time::Duration;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete within the configured timeout.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A field path is malformed or addresses a protected field.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Two operations in one update address overlapping paths.
    #[error("conflicting update paths: {first} and {second}")]
    ConflictingPaths { first: String, second: String },

    /// A path traverses or targets a value of the wrong type.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    PathType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An array index in a path is past the end of the array.
    #[error("index {index} out of bounds at {path} (len {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// A document without a string `id` was inserted.
    #[error("document inserted into {collection} has no string id")]
    MissingId { collection: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for connection and timeout failures, which callers may
    /// choose to retry. The store itself never does.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
