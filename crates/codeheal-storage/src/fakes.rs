//! In-memory fakes for storage traits (testing and zero-config operation).
//!
//! Provides `MemoryEnvelopeLedger` and `MemoryKnowledgeStore` that satisfy
//! the trait contracts without any external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryEnvelopeLedger
// ---------------------------------------------------------------------------

/// In-memory envelope ledger backed by a `HashMap<patch_id, Vec<EnvelopeRecord>>`.
#[derive(Debug, Default)]
pub struct MemoryEnvelopeLedger {
    revisions: Mutex<HashMap<String, Vec<EnvelopeRecord>>>,
}

impl MemoryEnvelopeLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnvelopeLedger for MemoryEnvelopeLedger {
    async fn put_envelope(
        &self,
        patch_id: &str,
        envelope_json: serde_json::Value,
    ) -> StorageResult<EnvelopeRecord> {
        let mut revisions = self.revisions.lock().unwrap();
        let history = revisions.entry(patch_id.to_string()).or_default();
        let record = EnvelopeRecord {
            patch_id: patch_id.to_string(),
            revision: history.len() as u64 + 1,
            envelope_json,
            written_at: Utc::now(),
        };
        history.push(record.clone());
        Ok(record)
    }

    async fn get_latest(&self, patch_id: &str) -> StorageResult<EnvelopeRecord> {
        let revisions = self.revisions.lock().unwrap();
        revisions
            .get(patch_id)
            .and_then(|h| h.last().cloned())
            .ok_or_else(|| StorageError::NotFound {
                id: patch_id.to_string(),
            })
    }

    async fn history(&self, patch_id: &str) -> StorageResult<Vec<EnvelopeRecord>> {
        let revisions = self.revisions.lock().unwrap();
        Ok(revisions.get(patch_id).cloned().unwrap_or_default())
    }

    async fn list_latest(&self) -> StorageResult<Vec<EnvelopeRecord>> {
        let revisions = self.revisions.lock().unwrap();
        Ok(revisions
            .values()
            .filter_map(|h| h.last().cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryKnowledgeStore
// ---------------------------------------------------------------------------

/// In-memory knowledge store backed by a `HashMap<pattern_id, PatternRecord>`.
#[derive(Debug, Default)]
pub struct MemoryKnowledgeStore {
    patterns: Mutex<HashMap<String, PatternRecord>>,
}

impl MemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KnowledgeStore for MemoryKnowledgeStore {
    async fn put_pattern(&self, record: PatternRecord) -> StorageResult<()> {
        let mut patterns = self.patterns.lock().unwrap();
        patterns.insert(record.pattern_id.clone(), record);
        Ok(())
    }

    async fn delete_pattern(&self, pattern_id: &str) -> StorageResult<()> {
        let mut patterns = self.patterns.lock().unwrap();
        patterns.remove(pattern_id);
        Ok(())
    }

    async fn query_by_cluster(&self, cluster_id: &str) -> StorageResult<Vec<PatternRecord>> {
        let patterns = self.patterns.lock().unwrap();
        Ok(patterns
            .values()
            .filter(|p| p.cluster_id.as_deref() == Some(cluster_id))
            .cloned()
            .collect())
    }

    async fn query_by_error_code(&self, error_code: &str) -> StorageResult<Vec<PatternRecord>> {
        let patterns = self.patterns.lock().unwrap();
        Ok(patterns
            .values()
            .filter(|p| p.error_code == error_code)
            .cloned()
            .collect())
    }

    async fn query_by_family(&self, family: &str) -> StorageResult<Vec<PatternRecord>> {
        let patterns = self.patterns.lock().unwrap();
        Ok(patterns
            .values()
            .filter(|p| p.family == family)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> StorageResult<Vec<PatternRecord>> {
        let patterns = self.patterns.lock().unwrap();
        Ok(patterns.values().cloned().collect())
    }
}
