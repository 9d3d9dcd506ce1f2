//! codeheal-core
//!
//! The code-healing orchestrator's decision pipeline: turns raw diagnostic
//! tool output into a gated PROMOTE / RETRY / ROLLBACK / STOP / HUMAN_REVIEW
//! decision for a candidate patch, with a full audit trail.
//!
//! # Pipeline
//!
//! 1. [`taxonomy`] + [`classifier`] — raw output -> [`packet::DiagnosticPacket`]
//! 2. [`delta`] — how the current packet relates to the previous attempt's
//! 3. [`confidence`] — temperature-scaled, calibrated confidence scoring
//! 4. [`breaker`] — dual syntax/logic circuit breaker lanes
//! 5. [`cascade`] — degenerating-retry-chain detection
//! 6. [`sandbox`] — pluggable isolated test-battery execution
//! 7. [`envelope`] — the audit record threaded through every attempt
//! 8. [`knowledge_base`] — hot/cold success-pattern storage and lookup
//! 9. [`orchestrator`] — composes 1-8 into one gated attempt
//! 10. [`retry_loop`] — drives the orchestrator across attempts with backoff
//! 11. [`chat_history`] — the append-only session transcript

pub mod breaker;
pub mod canonical;
pub mod cascade;
pub mod chat_history;
pub mod classifier;
pub mod config;
pub mod confidence;
pub mod delta;
pub mod envelope;
pub mod error;
pub mod knowledge_base;
pub mod orchestrator;
pub mod packet;
pub mod retry_loop;
pub mod sandbox;
pub mod taxonomy;
pub mod telemetry;

pub use breaker::{BreakerState, DualCircuitBreaker};
pub use cascade::{CascadeEntry, CascadeHandler, StopReason};
pub use chat_history::{ChatHistory, ChatMessage, MessageMetadata, Role};
pub use classifier::{classify_blob, ClassifierConfig};
pub use config::HealerConfig;
pub use confidence::{ConfidenceComponents, ConfidenceScore, ConfidenceScorer, ErrorClass};
pub use delta::{compute_delta, ErrorDelta};
pub use envelope::{AttemptRecord, PatchEnvelope, TimelineEvent, TrendMetadata};
pub use error::{HealError, Result};
pub use knowledge_base::{
    CompactionPolicy, CompactionResult, CompactionStrategy, HotRing, KnowledgeBase, SuccessPattern,
};
pub use orchestrator::{Decision, HealRequest, Orchestrator};
pub use packet::{DiagnosticEntry, DiagnosticPacket, PacketStatus, Severity};
pub use retry_loop::{run_retry_loop, BackoffPolicy, RetryOutcome, ToolRunner};
pub use sandbox::{
    IsolationLevel, LocalSandbox, ResourceLimits, SandboxBackend, SandboxError, SandboxOutcome,
    SandboxRequest, SandboxResult, TestResult, TestType,
};
pub use taxonomy::{compile_detectors, CompiledDetector, Taxonomy};

/// codeheal-core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
