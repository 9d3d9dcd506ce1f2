//! codeheal-storage: persistence traits for the code-healing orchestrator.
//!
//! Two storage abstractions back the core's audit trail and cross-run
//! learning:
//!
//! - [`storage_traits::EnvelopeLedger`] — append-only patch envelope history.
//! - [`storage_traits::KnowledgeStore`] — durable success-pattern storage
//!   with cluster/error-code/family lookups, the cold tier of the knowledge
//!   base (the hot tier is an in-memory ring owned by `codeheal-core`).
//!
//! Both traits are backend-agnostic; [`fakes`] ships in-memory
//! implementations suitable for tests and for running the orchestrator with
//! no external database configured.

pub mod error;
pub mod fakes;
pub mod storage_traits;

pub use error::StorageError;
pub use storage_traits::{
    ContentDigest, EnvelopeLedger, EnvelopeRecord, KnowledgeStore, PatternRecord, StorageResult,
};

/// Result type for codeheal-storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
