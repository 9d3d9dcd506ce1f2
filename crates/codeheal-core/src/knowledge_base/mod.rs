//! C9 — the knowledge base: a hot in-memory ring of recently successful
//! patterns backed by a durable cold tier, queried with a three-level
//! fallback (cluster -> error code -> family) and swept by value-weighted
//! garbage collection.
//!
//! # Modules
//!
//! - [`pattern`]  — `SuccessPattern`, the unit of stored knowledge
//! - [`hot_ring`] — `HotRing`, the bounded in-memory cache
//! - [`gc`]       — `CompactionPolicy` / `compact`, the cold-tier sweep
//!
//! The split mirrors the teacher's hot/cold retention split: cheap recent
//! lookups never touch the backing store; only a cache miss falls through
//! to `KnowledgeStore`.

pub mod gc;
pub mod hot_ring;
pub mod pattern;

pub use gc::{CompactionPolicy, CompactionResult, CompactionStrategy};
pub use hot_ring::HotRing;
pub use pattern::SuccessPattern;

use std::sync::Arc;

use codeheal_storage::{KnowledgeStore, PatternRecord, StorageResult};

/// The knowledge base: a hot ring in front of a durable `KnowledgeStore`.
pub struct KnowledgeBase<S: KnowledgeStore> {
    hot: HotRing,
    cold: Arc<S>,
}

impl<S: KnowledgeStore> KnowledgeBase<S> {
    pub fn new(hot_ring_capacity: usize, cold: Arc<S>) -> Self {
        Self {
            hot: HotRing::new(hot_ring_capacity),
            cold,
        }
    }

    /// Record a newly successful pattern: push onto the hot ring and
    /// persist to the cold tier so it survives process restarts.
    pub async fn record_success(&mut self, pattern: SuccessPattern) -> StorageResult<()> {
        self.hot.push(pattern.clone());
        self.cold.put_pattern(pattern.to_record()).await
    }

    /// Query known patterns with the three-level fallback: an exact
    /// cluster-id match, then error-code, then the broadest family match.
    /// The hot ring is checked first at each level; a cold-tier lookup only
    /// runs when the hot ring has nothing for that level.
    pub async fn query(
        &self,
        cluster_id: Option<&str>,
        error_code: &str,
        family: &str,
        min_confidence: f64,
        limit: usize,
    ) -> StorageResult<Vec<SuccessPattern>> {
        if let Some(cluster_id) = cluster_id {
            let hits = self.hot.by_cluster(cluster_id);
            let hits = if hits.is_empty() {
                self.cold
                    .query_by_cluster(cluster_id)
                    .await?
                    .into_iter()
                    .map(SuccessPattern::from_record)
                    .collect()
            } else {
                hits
            };
            let filtered = filter_and_rank(hits, min_confidence, limit);
            if !filtered.is_empty() {
                return Ok(filtered);
            }
        }

        let hits = self.hot.by_error_code(error_code);
        let hits = if hits.is_empty() {
            self.cold
                .query_by_error_code(error_code)
                .await?
                .into_iter()
                .map(SuccessPattern::from_record)
                .collect()
        } else {
            hits
        };
        let filtered = filter_and_rank(hits, min_confidence, limit);
        if !filtered.is_empty() {
            return Ok(filtered);
        }

        let hits = self.hot.by_family(family);
        let hits = if hits.is_empty() {
            self.cold
                .query_by_family(family)
                .await?
                .into_iter()
                .map(SuccessPattern::from_record)
                .collect()
        } else {
            hits
        };
        Ok(filter_and_rank(hits, min_confidence, limit))
    }

    /// Run value-weighted garbage collection over the cold tier.
    pub async fn compact(&self, policy: &CompactionPolicy) -> StorageResult<CompactionResult> {
        let records: Vec<PatternRecord> = self.cold.list_all().await?;
        gc::compact(self.cold.as_ref(), records, policy).await
    }
}

fn filter_and_rank(
    mut patterns: Vec<SuccessPattern>,
    min_confidence: f64,
    limit: usize,
) -> Vec<SuccessPattern> {
    patterns.retain(|p| p.avg_confidence >= min_confidence);
    patterns.sort_by(|a, b| {
        b.success_count
            .cmp(&a.success_count)
            .then(b.avg_confidence.partial_cmp(&a.avg_confidence).unwrap())
    });
    patterns.truncate(limit);
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use codeheal_storage::fakes::MemoryKnowledgeStore;

    fn pattern(id: &str, cluster: &str, code: &str, family: &str, score: f64) -> SuccessPattern {
        let now = Utc::now();
        SuccessPattern {
            pattern_id: id.to_string(),
            error_code: code.to_string(),
            cluster_id: Some(cluster.to_string()),
            family: family.to_string(),
            fix_description: "reorder imports".to_string(),
            fix_diff: "diff --git a b".to_string(),
            confidence_at_fix: score,
            success_count: 1,
            avg_confidence: score,
            tags: pattern::recompute_tags(score),
            last_success_at: now,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_record_and_query_by_cluster_hits_hot_ring() {
        let mut kb = KnowledgeBase::new(20, Arc::new(MemoryKnowledgeStore::new()));
        kb.record_success(pattern("p1", "SYN001:foo", "SYN001", "syntax", 0.9))
            .await
            .unwrap();

        let results = kb
            .query(Some("SYN001:foo"), "SYN001", "syntax", 0.0, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pattern_id, "p1");
    }

    #[tokio::test]
    async fn test_query_falls_back_through_levels() {
        let mut kb = KnowledgeBase::new(20, Arc::new(MemoryKnowledgeStore::new()));
        kb.record_success(pattern("p1", "SYN001:other", "SYN001", "syntax", 0.9))
            .await
            .unwrap();

        // no cluster match, but error_code matches
        let results = kb
            .query(Some("SYN001:nomatch"), "SYN001", "syntax", 0.0, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_query_respects_min_confidence() {
        let mut kb = KnowledgeBase::new(20, Arc::new(MemoryKnowledgeStore::new()));
        kb.record_success(pattern("p1", "SYN001:foo", "SYN001", "syntax", 0.2))
            .await
            .unwrap();

        let results = kb
            .query(Some("SYN001:foo"), "SYN001", "syntax", 0.5, 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cold_tier_survives_hot_ring_eviction() {
        let store = Arc::new(MemoryKnowledgeStore::new());
        let mut kb = KnowledgeBase::new(1, store.clone());
        kb.record_success(pattern("p1", "SYN001:foo", "SYN001", "syntax", 0.9))
            .await
            .unwrap();
        // capacity 1: this push evicts p1 from the hot ring, but the cold
        // store still has it.
        kb.record_success(pattern("p2", "RES001:bar", "RES001", "resolution", 0.9))
            .await
            .unwrap();

        let results = kb
            .query(Some("SYN001:foo"), "SYN001", "syntax", 0.0, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pattern_id, "p1");
    }
}
