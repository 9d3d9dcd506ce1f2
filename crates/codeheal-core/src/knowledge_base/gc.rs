//! Garbage collection over the knowledge base's cold tier.
//!
//! Three strategies trade recall for storage pressure, mirroring the
//! teacher's three-phase retention sweep: conservative only removes a
//! pattern that has worked exactly once and gone stale, aggressive drops
//! anything thin on confirmed successes once it's aged past a shorter
//! window, and nuclear drops anything thin on successes outright and then
//! enforces a hard entry cap. A protection rule overrides every strategy:
//! a pattern with 10 or more confirmed successes, or one tagged
//! `GOLD_STANDARD`, is never deleted.

use chrono::Utc;
use codeheal_storage::{KnowledgeStore, PatternRecord, StorageResult};

use crate::knowledge_base::pattern::GOLD_STANDARD_TAG;

/// Below this confirmed-success count, the protection rule does not apply
/// on `success_count` alone (a `GOLD_STANDARD` tag can still protect it).
const PROTECTED_SUCCESS_COUNT: u32 = 10;

/// How hard the sweep leans on age vs. confirmed usage when deciding what
/// to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionStrategy {
    /// Remove entries with exactly one success older than 90 days.
    Conservative,
    /// Remove entries with fewer than 3 successes older than 60 days.
    Aggressive,
    /// Remove entries with fewer than 5 successes outright, then enforce
    /// `max_entries` against the survivors.
    Nuclear,
}

/// Parameters governing one compaction pass.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompactionPolicy {
    pub max_age_days: i64,
    pub max_entries: usize,
    pub strategy: CompactionStrategy,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: 90,
            max_entries: 5_000,
            strategy: CompactionStrategy::Conservative,
        }
    }
}

/// What one compaction pass did.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompactionResult {
    pub removed_count: usize,
    pub remaining_count: usize,
    /// How many of `remaining_count` survived purely on the protection
    /// rule rather than on the strategy's own predicate.
    pub protected_count: usize,
    pub removed_ids: Vec<String>,
}

fn is_protected(record: &PatternRecord) -> bool {
    record.success_count >= PROTECTED_SUCCESS_COUNT
        || record.tags.iter().any(|t| t == GOLD_STANDARD_TAG)
}

/// Sweep `records` against `policy`, deleting doomed entries from `store`.
pub async fn compact<S: KnowledgeStore + ?Sized>(
    store: &S,
    records: Vec<PatternRecord>,
    policy: &CompactionPolicy,
) -> StorageResult<CompactionResult> {
    let now = Utc::now();
    let mut protected: Vec<PatternRecord> = Vec::new();
    let mut survivors: Vec<PatternRecord> = Vec::new();
    let mut removed_ids: Vec<String> = Vec::new();

    for record in records {
        if is_protected(&record) {
            protected.push(record);
            continue;
        }

        let age_days = (now - record.last_success_at).num_days();
        let doomed = match policy.strategy {
            CompactionStrategy::Conservative => record.success_count == 1 && age_days > 90,
            CompactionStrategy::Aggressive => record.success_count < 3 && age_days > 60,
            CompactionStrategy::Nuclear => record.success_count < 5,
        };

        if doomed {
            removed_ids.push(record.pattern_id.clone());
        } else {
            survivors.push(record);
        }
    }

    if policy.strategy == CompactionStrategy::Nuclear {
        let budget = policy.max_entries.saturating_sub(protected.len());
        if survivors.len() > budget {
            survivors.sort_by(|a, b| {
                b.success_count
                    .cmp(&a.success_count)
                    .then(b.avg_confidence.partial_cmp(&a.avg_confidence).unwrap())
            });
            for overflow in survivors.split_off(budget) {
                removed_ids.push(overflow.pattern_id);
            }
        }
    }

    for id in &removed_ids {
        store.delete_pattern(id).await?;
    }

    let protected_count = protected.len();
    Ok(CompactionResult {
        removed_count: removed_ids.len(),
        remaining_count: survivors.len() + protected_count,
        protected_count,
        removed_ids,
    })
}
