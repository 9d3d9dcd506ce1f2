//! Error taxonomy for the code-healing orchestrator.
//!
//! [`HealError`] covers the *fatal* path — conditions that abort a healing
//! session outright (ground-truth tampering, a malformed envelope, a caller
//! that ignores the rate limit). The *soft-gating* outcomes a session can
//! reach on a perfectly healthy path — stop, roll back, escalate to a human —
//! are not errors at all; they are [`crate::orchestrator::Decision`] values
//! returned alongside `Ok(_)`.

/// Fatal errors raised by the healing pipeline.
#[derive(Debug, thiserror::Error)]
pub enum HealError {
    #[error("ground truth tampered: expected hash {expected}, found {actual}")]
    GroundTruthTampered { expected: String, actual: String },

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("taxonomy load failed: {0}")]
    TaxonomyLoad(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] Box<crate::sandbox::SandboxError>),
}

/// Result type for healing-pipeline operations.
pub type Result<T> = std::result::Result<T, HealError>;
