//! C8 — the patch envelope: the append-only audit record that travels with
//! a patch through every attempt, carrying confidence, breaker, cascade, and
//! sandbox state plus a human-review flag.
//!
//! `patch_id` and `patch_data` are immutable once the envelope is built —
//! every other field is reached only through the controlled mutation
//! helpers below, mirroring the original's `mutable_payload()` /
//! `_absorb()` guard. `success` is a one-way latch: once set it cannot be
//! unset by any helper.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::breaker::BreakerState;
use crate::canonical::sha256_hex;
use crate::confidence::ConfidenceComponents;
use crate::sandbox::contract::SandboxOutcome;

/// Fields excluded when computing the envelope's stable hash — everything
/// that legitimately changes attempt-to-attempt. Taken verbatim from the
/// original's `VOLATILE_KEYS`.
pub const VOLATILE_FIELDS: &[&str] = &[
    "attempts",
    "timestamp",
    "envelope_hash",
    "developer_message",
    "developer_flag_reason",
    "timeline",
];

/// One attempt recorded against this envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptRecord {
    pub attempt_number: u32,
    pub confidence: f64,
    pub sandbox_success: bool,
    pub note: Option<String>,
}

/// A single timeline event, appended in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    pub label: String,
    pub detail: serde_json::Value,
}

/// Rolling error-trend summary for this envelope's session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrendMetadata {
    pub errors_detected: u32,
    pub errors_resolved: u32,
    pub error_trend: String,
}

/// The patch envelope itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchEnvelope {
    patch_id: String,
    patch_data: serde_json::Value,

    metadata: serde_json::Value,
    attempts: Vec<AttemptRecord>,
    confidence_components: Option<ConfidenceComponents>,
    breaker_state: Option<BreakerState>,
    cascade_depth: u32,
    resource_usage: Option<SandboxOutcome>,

    flagged_for_developer: bool,
    developer_message: Option<String>,
    developer_flag_reason: Option<String>,

    success: bool,
    trend_metadata: TrendMetadata,
    counters: BTreeMap<String, u64>,
    timeline: Vec<TimelineEvent>,

    envelope_hash: String,
}

impl PatchEnvelope {
    /// Build a new envelope around an immutable patch. `patch_id` and
    /// `patch_data` can never change after this call.
    pub fn new(patch_id: impl Into<String>, patch_data: serde_json::Value) -> Self {
        Self {
            patch_id: patch_id.into(),
            patch_data,
            metadata: serde_json::json!({}),
            attempts: Vec::new(),
            confidence_components: None,
            breaker_state: None,
            cascade_depth: 0,
            resource_usage: None,
            flagged_for_developer: false,
            developer_message: None,
            developer_flag_reason: None,
            success: false,
            trend_metadata: TrendMetadata {
                error_trend: "unknown".to_string(),
                ..Default::default()
            },
            counters: BTreeMap::new(),
            timeline: Vec::new(),
            envelope_hash: String::new(),
        }
    }

    pub fn patch_id(&self) -> &str {
        &self.patch_id
    }

    pub fn patch_data(&self) -> &serde_json::Value {
        &self.patch_data
    }

    pub fn is_successful(&self) -> bool {
        self.success
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged_for_developer
    }

    pub fn breaker_state(&self) -> Option<BreakerState> {
        self.breaker_state
    }

    pub fn cascade_depth(&self) -> u32 {
        self.cascade_depth
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    pub fn envelope_hash(&self) -> &str {
        &self.envelope_hash
    }

    // -- controlled mutation helpers -------------------------------------

    pub fn merge_metadata(&mut self, patch: serde_json::Value) {
        merge_json(&mut self.metadata, patch);
    }

    pub fn set_breaker_state(&mut self, state: BreakerState) {
        self.breaker_state = Some(state);
    }

    /// Clamped to a non-negative depth, mirroring `max(0, int(depth))`.
    pub fn set_cascade_depth(&mut self, depth: i64) {
        self.cascade_depth = depth.max(0) as u32;
    }

    /// One-way latch: once `true`, never reverts to `false`.
    pub fn mark_success(&mut self) {
        self.success = true;
    }

    pub fn flag_for_developer(&mut self, message: Option<String>, reason: Option<String>) {
        self.flagged_for_developer = true;
        if message.is_some() {
            self.developer_message = message;
        }
        if reason.is_some() {
            self.developer_flag_reason = reason;
        }
    }

    pub fn clear_developer_flag(&mut self) {
        self.flagged_for_developer = false;
        self.developer_message = None;
        self.developer_flag_reason = None;
    }

    pub fn add_attempt(&mut self, attempt: AttemptRecord) {
        self.attempts.push(attempt);
    }

    pub fn update_confidence(&mut self, components: ConfidenceComponents) {
        self.confidence_components = Some(components);
    }

    pub fn update_resource_usage(&mut self, outcome: SandboxOutcome) {
        self.resource_usage = Some(outcome);
    }

    pub fn update_trend(&mut self, detected_delta: u32, resolved_delta: u32, trend: &str) {
        self.trend_metadata.errors_detected += detected_delta;
        self.trend_metadata.errors_resolved += resolved_delta;
        self.trend_metadata.error_trend = trend.to_string();
    }

    pub fn update_counters(&mut self, key: &str, delta: u64) {
        *self.counters.entry(key.to_string()).or_insert(0) += delta;
    }

    pub fn update_timeline(&mut self, label: impl Into<String>, detail: serde_json::Value) {
        self.timeline.push(TimelineEvent {
            label: label.into(),
            detail,
        });
    }

    /// Recompute and store the stable hash (excludes `VOLATILE_FIELDS`).
    pub fn seal_hash(&mut self) {
        self.envelope_hash = self.compute_stable_hash();
    }

    /// Compute the stable hash without storing it — used to detect
    /// tampering of the non-volatile fields a prior attempt established.
    pub fn compute_stable_hash(&self) -> String {
        let value = serde_json::json!({
            "patch_id": self.patch_id,
            "patch_data": self.patch_data,
            "metadata": self.metadata,
            "confidence_components": self.confidence_components,
            "breaker_state": self.breaker_state,
            "cascade_depth": self.cascade_depth,
            "resource_usage": self.resource_usage,
            "flagged_for_developer": self.flagged_for_developer,
            "success": self.success,
            "trend_metadata": self.trend_metadata,
            "counters": self.counters,
        });
        sha256_hex(&value)
    }

    /// `true` if the stored hash still matches the stable (non-volatile)
    /// content — the check the retry loop runs before trusting an envelope
    /// carried forward from a prior attempt.
    pub fn verify_stable_hash(&self) -> bool {
        self.envelope_hash == self.compute_stable_hash()
    }

    /// Serialize the whole envelope as `serde_json::Value`, for storage in
    /// the envelope ledger.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("PatchEnvelope always serializes")
    }
}

fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (k, v) in patch_map {
                merge_json(base_map.entry(k).or_insert(serde_json::Value::Null), v);
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value;
        }
    }
}
