//! Error types for the storage trait abstractions.

use thiserror::Error;

/// Errors for the storage trait abstractions (`EnvelopeLedger`, `KnowledgeStore`).
#[derive(Error, Debug)]
pub enum StorageError {
    /// No envelope/pattern found under the given id.
    #[error("not found: {id}")]
    NotFound { id: String },

    /// Invalid digest string (not valid 64-char hex).
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    /// Attempted to mutate a field a ledger guarantees is immutable.
    #[error("immutable field violated: {field}")]
    ImmutableField { field: String },

    /// Backend I/O error.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
