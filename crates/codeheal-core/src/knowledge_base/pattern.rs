//! `SuccessPattern`: the unit of knowledge the knowledge base stores —
//! a fix strategy that worked, plus enough statistics to rank it against
//! competing patterns for the same error.

use chrono::{DateTime, Utc};
use codeheal_storage::PatternRecord;
use serde::{Deserialize, Serialize};

/// `avg_confidence` at or above this threshold earns the `GOLD_STANDARD`
/// tag — never swept by garbage collection regardless of strategy.
pub const GOLD_STANDARD_THRESHOLD: f64 = 0.9;
/// `avg_confidence` at or above this threshold earns `HIGH_CONFIDENCE`.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;
/// `avg_confidence` at or above this threshold earns `VERIFIED`.
pub const VERIFIED_THRESHOLD: f64 = 0.7;

pub const GOLD_STANDARD_TAG: &str = "GOLD_STANDARD";
pub const HIGH_CONFIDENCE_TAG: &str = "HIGH_CONFIDENCE";
pub const VERIFIED_TAG: &str = "VERIFIED";

/// A recorded, previously successful fix strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuccessPattern {
    pub pattern_id: String,
    pub error_code: String,
    pub cluster_id: Option<String>,
    pub family: String,
    /// Free-text description of what fixed it — the payload a future
    /// attempt's prompt gets seeded with.
    pub fix_description: String,
    /// The actual diff that was applied.
    pub fix_diff: String,
    pub confidence_at_fix: f64,
    /// Number of times this pattern has been applied and confirmed to
    /// resolve the error. The knowledge base only ever records successes
    /// (see `record_success`) — a pattern that stops working is left to
    /// age out via garbage collection rather than decremented.
    pub success_count: u32,
    /// Running average of the confidence score at each recorded success.
    pub avg_confidence: f64,
    /// Recomputed by `recompute_tags` on every `record_success` call.
    pub tags: Vec<String>,
    pub last_success_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Recompute the tag set for a given average confidence. Thresholds are
/// not mutually exclusive floors on disjoint bands — a pattern at 0.95
/// earns all three tags, since `GOLD_STANDARD` implies `HIGH_CONFIDENCE`
/// and `VERIFIED`.
pub fn recompute_tags(avg_confidence: f64) -> Vec<String> {
    let mut tags = Vec::new();
    if avg_confidence >= GOLD_STANDARD_THRESHOLD {
        tags.push(GOLD_STANDARD_TAG.to_string());
    }
    if avg_confidence >= HIGH_CONFIDENCE_THRESHOLD {
        tags.push(HIGH_CONFIDENCE_TAG.to_string());
    }
    if avg_confidence >= VERIFIED_THRESHOLD {
        tags.push(VERIFIED_TAG.to_string());
    }
    tags
}

impl SuccessPattern {
    /// Build a brand-new pattern from a single observed success.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pattern_id: impl Into<String>,
        error_code: impl Into<String>,
        cluster_id: Option<String>,
        family: impl Into<String>,
        fix_description: impl Into<String>,
        fix_diff: impl Into<String>,
        confidence_at_fix: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            pattern_id: pattern_id.into(),
            error_code: error_code.into(),
            cluster_id,
            family: family.into(),
            fix_description: fix_description.into(),
            fix_diff: fix_diff.into(),
            confidence_at_fix,
            success_count: 1,
            avg_confidence: confidence_at_fix,
            tags: recompute_tags(confidence_at_fix),
            last_success_at: now,
            created_at: now,
        }
    }

    /// Fold in another observed success for this same pattern, recomputing
    /// `avg_confidence` as a running mean and refreshing `tags`.
    pub fn record_success(&mut self, confidence: f64, now: DateTime<Utc>) {
        let total = self.avg_confidence * self.success_count as f64 + confidence;
        self.success_count += 1;
        self.avg_confidence = total / self.success_count as f64;
        self.tags = recompute_tags(self.avg_confidence);
        self.last_success_at = now;
    }

    pub fn to_record(&self) -> PatternRecord {
        PatternRecord {
            pattern_id: self.pattern_id.clone(),
            error_code: self.error_code.clone(),
            cluster_id: self.cluster_id.clone(),
            family: self.family.clone(),
            success_count: self.success_count,
            avg_confidence: self.avg_confidence,
            tags: self.tags.clone(),
            last_success_at: self.last_success_at,
            pattern_json: serde_json::to_value(self).expect("SuccessPattern always serializes"),
            stored_at: self.created_at,
        }
    }

    pub fn from_record(record: PatternRecord) -> Self {
        serde_json::from_value(record.pattern_json).unwrap_or_else(|_| SuccessPattern {
            pattern_id: record.pattern_id,
            error_code: record.error_code,
            cluster_id: record.cluster_id,
            family: record.family,
            fix_description: String::new(),
            fix_diff: String::new(),
            confidence_at_fix: record.avg_confidence,
            success_count: record.success_count,
            avg_confidence: record.avg_confidence,
            tags: record.tags,
            last_success_at: record.last_success_at,
            created_at: record.stored_at,
        })
    }
}
