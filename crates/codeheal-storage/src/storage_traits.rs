//! Storage trait definitions for the code-healing orchestrator.
//!
//! - `ContentDigest`: SHA-256 content digest, shared by envelope hashing and
//!   knowledge-base pattern ids.
//! - `EnvelopeLedger`: append-only persistence for `PatchEnvelope` audit
//!   records, keyed by `patch_id`.
//! - `KnowledgeStore`: the cold tier of the knowledge base — durable
//!   `SuccessPattern` storage with cluster/error-code/family lookups and
//!   value-weighted garbage collection.
//!
//! Both traits are async and backend-agnostic. In-memory fakes are provided
//! for testing and zero-config operation via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EnvelopeLedger — append-only patch envelope audit trail
// ---------------------------------------------------------------------------

/// One stored revision of a patch envelope.
///
/// `envelope_json` is the envelope's full `to_dict()`-equivalent
/// serialization at the time it was written; `revision` increments on every
/// `put_envelope` call for the same `patch_id` so the ledger can preserve
/// prior states instead of overwriting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    pub patch_id: String,
    pub revision: u64,
    pub envelope_json: serde_json::Value,
    pub written_at: DateTime<Utc>,
}

/// Append-only persistence for patch envelopes.
///
/// Guarantees:
/// - `put_envelope` never deletes a prior revision; it appends a new one.
/// - `get_latest` returns the highest-revision record for a `patch_id`.
/// - `history` returns every revision, oldest first.
#[async_trait]
pub trait EnvelopeLedger: Send + Sync {
    /// Append a new revision of the envelope for `patch_id`.
    async fn put_envelope(
        &self,
        patch_id: &str,
        envelope_json: serde_json::Value,
    ) -> StorageResult<EnvelopeRecord>;

    /// Fetch the most recent revision for `patch_id`.
    async fn get_latest(&self, patch_id: &str) -> StorageResult<EnvelopeRecord>;

    /// Fetch the full revision history for `patch_id`, oldest first.
    async fn history(&self, patch_id: &str) -> StorageResult<Vec<EnvelopeRecord>>;

    /// List the latest revision of every envelope in the ledger.
    async fn list_latest(&self) -> StorageResult<Vec<EnvelopeRecord>>;
}

// ---------------------------------------------------------------------------
// KnowledgeStore — cold tier of the knowledge base
// ---------------------------------------------------------------------------

/// A durable record in the cold knowledge-base tier.
///
/// `pattern_json` holds the serialized `SuccessPattern`; the indexing fields
/// are duplicated out of the JSON payload so a backend can query without
/// deserializing every row. `success_count`/`avg_confidence`/`tags`/
/// `last_success_at` drive ranking and garbage collection; `stored_at` is
/// the record's creation time, kept distinct from `last_success_at` so GC's
/// staleness rules can key off recency of use rather than age of the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    pub pattern_id: String,
    pub error_code: String,
    pub cluster_id: Option<String>,
    pub family: String,
    pub success_count: u32,
    pub avg_confidence: f64,
    pub tags: Vec<String>,
    pub last_success_at: DateTime<Utc>,
    pub pattern_json: serde_json::Value,
    pub stored_at: DateTime<Utc>,
}

/// Durable knowledge-base storage.
///
/// Guarantees:
/// - `put_pattern` upserts by `pattern_id` (a pattern is refined in place as
///   its outcome statistics accumulate; see `crate` docs on the knowledge
///   base's hot/cold split — only the hot ring is append-and-evict).
/// - `delete_pattern` is the sole mechanism by which garbage collection
///   removes entries, and only the GC routine calls it.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Insert or update a pattern record.
    async fn put_pattern(&self, record: PatternRecord) -> StorageResult<()>;

    /// Remove a pattern record. No-op if absent.
    async fn delete_pattern(&self, pattern_id: &str) -> StorageResult<()>;

    /// Exact cluster-id lookup (first fallback level).
    async fn query_by_cluster(&self, cluster_id: &str) -> StorageResult<Vec<PatternRecord>>;

    /// Error-code lookup (second fallback level).
    async fn query_by_error_code(&self, error_code: &str) -> StorageResult<Vec<PatternRecord>>;

    /// Family lookup (third, broadest fallback level).
    async fn query_by_family(&self, family: &str) -> StorageResult<Vec<PatternRecord>>;

    /// List every stored pattern (used by the GC routine to score and sweep).
    async fn list_all(&self) -> StorageResult<Vec<PatternRecord>>;
}
