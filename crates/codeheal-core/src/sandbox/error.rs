//! Error types for the sandbox module.

/// Errors produced by the sandbox layer.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("resource limits exceeded: {reason}")]
    ResourceLimitExceeded { reason: String },

    #[error("invalid sandbox configuration: {0}")]
    InvalidConfig(String),

    #[error("heal error: {0}")]
    Heal(#[from] crate::error::HealError),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
