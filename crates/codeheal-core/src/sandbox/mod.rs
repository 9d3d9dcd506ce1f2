//! C7 — the sandbox contract: a pluggable backend that runs a candidate
//! patch through a fixed five-test battery under a chosen isolation level,
//! without ever executing real code (see the crate's Non-goals).
//!
//! # Modules
//!
//! - [`contract`] — `SandboxRequest`, `SandboxOutcome`, `TestResult`,
//!   `IsolationLevel`, the `SandboxBackend` trait
//! - [`local`]     — `LocalSandbox`, the only shipped backend
//! - [`error`]     — `SandboxError` / `SandboxResult`

pub mod contract;
pub mod error;
pub mod local;

pub use contract::{
    IsolationLevel, ResourceLimits, SandboxBackend, SandboxOutcome, SandboxRequest, TestResult,
    TestType,
};
pub use error::{SandboxError, SandboxResult};
pub use local::LocalSandbox;
