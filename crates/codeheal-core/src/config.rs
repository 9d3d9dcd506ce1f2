//! Configurable policy for a healing session.
//!
//! `HealerConfig` is constructed explicitly by the caller (the CLI or an
//! embedding application) and threaded through the orchestrator by
//! reference — there is no global/static configuration, matching the
//! teacher's `RecoveryPolicy`/`RepairPolicy` convention of explicit,
//! serializable policy structs with a sensible `Default`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::sandbox::contract::IsolationLevel;

/// Policy governing one healing session end to end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealerConfig {
    /// Minimum confidence to attempt a fix when the error is syntax class.
    pub syntax_confidence_floor: f64,
    /// Minimum confidence to attempt a fix for logic/runtime class errors.
    pub logic_confidence_floor: f64,
    /// Minimum overall confidence for any other error class.
    pub overall_confidence_floor: f64,

    /// Max attempts on the syntax circuit-breaker lane.
    pub syntax_max_attempts: u32,
    /// Max attempts on the logic circuit-breaker lane.
    pub logic_max_attempts: u32,
    /// Error-rate budget (0.0-1.0) for the syntax lane.
    pub syntax_error_budget: f64,
    /// Error-rate budget (0.0-1.0) for the logic lane.
    pub logic_error_budget: f64,

    /// Maximum cascade chain depth before forced stop.
    pub max_cascade_depth: usize,

    /// Maximum attempts allowed within one rate-limit window.
    pub rate_limit_max_attempts: u32,
    /// Rate-limit window, in seconds.
    pub rate_limit_window_secs: i64,

    /// Default sandbox isolation level when a request doesn't specify one.
    pub default_isolation: IsolationLevel,

    /// Whether a risky-keyword hit forces human review regardless of
    /// confidence.
    pub require_human_on_risky: bool,
    /// Substrings that mark a patch as risky (schema changes, auth bypass,
    /// etc.), checked case-insensitively against the patch diff text.
    pub risky_keywords: Vec<String>,

    /// Size of the knowledge base's hot in-memory ring.
    pub hot_ring_capacity: usize,
}

impl Default for HealerConfig {
    fn default() -> Self {
        Self {
            syntax_confidence_floor: 0.98,
            logic_confidence_floor: 0.80,
            overall_confidence_floor: 0.85,

            syntax_max_attempts: 3,
            logic_max_attempts: 10,
            syntax_error_budget: 0.03,
            logic_error_budget: 0.10,

            max_cascade_depth: 5,

            rate_limit_max_attempts: 10,
            rate_limit_window_secs: 60,

            default_isolation: IsolationLevel::Full,

            require_human_on_risky: true,
            risky_keywords: vec![
                "database_schema_change".to_string(),
                "authentication_bypass".to_string(),
                "critical_security_vulnerability".to_string(),
                "production_data_modification".to_string(),
            ],

            hot_ring_capacity: 20,
        }
    }
}

impl HealerConfig {
    /// Returns `true` if `patch_text` trips one of the configured risky
    /// keywords (case-insensitive substring match), mirroring the original
    /// `_is_big_error` heuristic.
    pub fn is_risky_patch(&self, patch_text: &str) -> bool {
        let lowered = patch_text.to_lowercase();
        let keyword_hit = self
            .risky_keywords
            .iter()
            .any(|k| lowered.contains(&k.to_lowercase()));
        keyword_hit || patch_text.len() > 1000
    }

    /// Parse a `HealerConfig` from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Parse a `HealerConfig` from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// The full set of risky keywords as a set, for fast membership tests.
    pub fn risky_keyword_set(&self) -> HashSet<String> {
        self.risky_keywords.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_spec_floors() {
        let cfg = HealerConfig::default();
        assert_eq!(cfg.syntax_confidence_floor, 0.98);
        assert_eq!(cfg.logic_confidence_floor, 0.80);
        assert_eq!(cfg.overall_confidence_floor, 0.85);
        assert_eq!(cfg.syntax_max_attempts, 3);
        assert_eq!(cfg.logic_max_attempts, 10);
        assert_eq!(cfg.max_cascade_depth, 5);
        assert_eq!(cfg.rate_limit_max_attempts, 10);
    }

    #[test]
    fn test_is_risky_patch_keyword_hit() {
        let cfg = HealerConfig::default();
        assert!(cfg.is_risky_patch("ALTER TABLE users -- database_schema_change"));
        assert!(!cfg.is_risky_patch("fix off-by-one in loop bound"));
    }

    #[test]
    fn test_is_risky_patch_length_hit() {
        let cfg = HealerConfig::default();
        let big = "x".repeat(1001);
        assert!(cfg.is_risky_patch(&big));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let cfg = HealerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back = HealerConfig::from_json(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
