//! C10 — the per-attempt orchestrator: composes the classifier, delta,
//! confidence scorer, dual circuit breaker, cascade handler, and sandbox
//! into one gated decision per attempt.
//!
//! [`Decision`] is a *value*, never an error — `Promote`/`Retry`/`Rollback`/
//! `Stop`/`HumanReview` are all healthy outcomes of a well-formed session.
//! Only conditions that make the session's own bookkeeping untrustworthy
//! (tampering, a blown rate limit, a malformed taxonomy) raise
//! [`crate::error::HealError`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::breaker::{BreakerState, DualCircuitBreaker};
use crate::cascade::{CascadeEntry, CascadeHandler, StopReason};
use crate::classifier::{classify_blob, ClassifierConfig};
use crate::confidence::{ConfidenceComponents, ConfidenceScorer, ErrorClass};
use crate::config::HealerConfig;
use crate::delta::{compute_delta, ErrorDelta};
use crate::envelope::{AttemptRecord, PatchEnvelope};
use crate::error::{HealError, Result};
use crate::packet::DiagnosticPacket;
use crate::sandbox::{IsolationLevel, SandboxBackend, SandboxRequest};
use crate::taxonomy::CompiledDetector;

/// One attempt's input to the orchestrator.
#[derive(Debug, Clone)]
pub struct HealRequest {
    pub raw_tool_output: String,
    pub patch_text: String,
    pub lang: Option<String>,
    pub model_logits: Vec<f64>,
    pub isolation: Option<IsolationLevel>,
    /// Confidence modifiers for this attempt — normally populated from a
    /// knowledge-base lookup (C9) by the caller. Defaults to
    /// `ConfidenceComponents::default()` when omitted, which is
    /// deliberately conservative: with no supporting history, nothing
    /// clears the confidence floors and every non-clean attempt lands on
    /// human review.
    pub confidence_components: Option<ConfidenceComponents>,
}

/// The gated outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The patch is clean and sandbox-verified: ship it.
    Promote,
    /// Still failing, but within budget and confident enough to try again.
    Retry,
    /// The patch made things worse or every retry lane is exhausted: revert.
    Rollback,
    /// A non-permanent gate refused this attempt; the session pauses here.
    Stop,
    /// Confidence, risk, or cascade signals call for a person in the loop.
    HumanReview { reason: String },
}

/// A bare fixed-window rate limiter: `max_attempts` per `window_secs`.
#[derive(Debug, Clone)]
struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    window_start: Option<DateTime<Utc>>,
    count: u32,
}

impl RateLimiter {
    fn new(max_attempts: u32, window_secs: i64) -> Self {
        Self {
            max_attempts,
            window: Duration::seconds(window_secs),
            window_start: None,
            count: 0,
        }
    }

    fn check_and_record(&mut self, now: DateTime<Utc>) -> bool {
        match self.window_start {
            Some(start) if now - start < self.window => {
                if self.count >= self.max_attempts {
                    return false;
                }
                self.count += 1;
                true
            }
            _ => {
                self.window_start = Some(now);
                self.count = 1;
                true
            }
        }
    }
}

/// Composes C1-C9 into one per-attempt gated decision.
pub struct Orchestrator {
    config: HealerConfig,
    detectors: Vec<CompiledDetector>,
    breaker: DualCircuitBreaker,
    cascade: CascadeHandler,
    confidence: ConfidenceScorer,
    sandbox: Arc<dyn SandboxBackend>,
    rate_limiter: RateLimiter,
}

impl Orchestrator {
    pub fn new(
        config: HealerConfig,
        detectors: Vec<CompiledDetector>,
        sandbox: Arc<dyn SandboxBackend>,
    ) -> Self {
        let breaker = DualCircuitBreaker::new(
            config.syntax_max_attempts,
            config.syntax_error_budget,
            config.logic_max_attempts,
            config.logic_error_budget,
        );
        let cascade = CascadeHandler::new(config.max_cascade_depth);
        let rate_limiter =
            RateLimiter::new(config.rate_limit_max_attempts, config.rate_limit_window_secs);
        Self {
            config,
            detectors,
            breaker,
            cascade,
            confidence: ConfidenceScorer::default(),
            sandbox,
            rate_limiter,
        }
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state
    }

    /// Run one gated attempt, mutating `envelope` with everything observed
    /// along the way and returning the resulting decision.
    pub async fn run_attempt(
        &mut self,
        envelope: &mut PatchEnvelope,
        previous_packet: Option<&DiagnosticPacket>,
        request: &HealRequest,
        now: DateTime<Utc>,
    ) -> Result<(Decision, DiagnosticPacket)> {
        if !self.rate_limiter.check_and_record(now) {
            return Err(HealError::RateLimited(format!(
                "exceeded {} attempts in {}s window",
                self.rate_limiter.max_attempts,
                self.rate_limiter.window.num_seconds()
            )));
        }

        let current_packet = classify_blob(
            &self.detectors,
            &request.raw_tool_output,
            &ClassifierConfig {
                lang: request.lang.clone(),
                ..ClassifierConfig::default()
            },
        );

        if let Some(prev) = previous_packet {
            if !prev.verify_hash() {
                return Err(HealError::GroundTruthTampered {
                    expected: prev.compute_hash(),
                    actual: prev.packet_hash.clone(),
                });
            }
        }

        let mut attempt_confidence: f64 = 1.0;

        let error_class = current_packet
            .entries
            .first()
            .map(|e| ErrorClass::from_family(&e.family))
            .or_else(|| {
                previous_packet
                    .and_then(|p| p.entries.first())
                    .map(|e| ErrorClass::from_family(&e.family))
            })
            .unwrap_or(ErrorClass::Logic);

        if self.config.require_human_on_risky && self.config.is_risky_patch(&request.patch_text) {
            envelope.flag_for_developer(
                Some("patch touches a risky surface".to_string()),
                Some("risky_keyword_or_size".to_string()),
            );
            envelope.update_timeline("human_review", serde_json::json!({"reason": "risky_patch"}));
            return Ok((
                Decision::HumanReview {
                    reason: "risky_patch".to_string(),
                },
                current_packet,
            ));
        }

        if !current_packet.is_clean() {
            let (allowed, reason) = self.breaker.can_attempt(error_class);
            if !allowed {
                envelope.set_breaker_state(self.breaker.state);
                let decision = if self.breaker.state == BreakerState::PermanentlyOpen {
                    Decision::Rollback
                } else {
                    Decision::Stop
                };
                envelope.update_timeline("breaker_refused", serde_json::json!({"reason": reason}));
                return Ok((decision, current_packet));
            }

            let mut components = request.confidence_components.unwrap_or_default();
            if let Some(difficulty) = current_packet.entries.first().and_then(|e| e.difficulty) {
                components.complexity_penalty = (1.0 - difficulty * 0.5).max(0.1);
            }
            let score =
                self.confidence
                    .calculate_confidence(&request.model_logits, error_class, components);
            envelope.update_confidence(score.components);
            attempt_confidence = score.calibrated_confidence;

            if !ConfidenceScorer::should_attempt_fix(
                &score,
                self.config.syntax_confidence_floor,
                self.config.logic_confidence_floor,
                self.config.overall_confidence_floor,
            ) {
                envelope.flag_for_developer(
                    Some("confidence below floor for this error class".to_string()),
                    Some("low_confidence".to_string()),
                );
                return Ok((
                    Decision::HumanReview {
                        reason: "low_confidence".to_string(),
                    },
                    current_packet,
                ));
            }

            self.cascade.add_error(CascadeEntry {
                error_class,
                confidence: score.calibrated_confidence,
            });
            envelope.set_cascade_depth(self.cascade.chain.len() as i64);

            if let Some(stop_reason) = self.cascade.should_stop() {
                envelope.update_timeline(
                    "cascade_stop",
                    serde_json::json!({"reason": stop_reason_label(stop_reason)}),
                );
                return Ok((Decision::Stop, current_packet));
            }
        }

        let sandbox_request = SandboxRequest {
            patch_content: request.patch_text.clone(),
            isolation: request.isolation.unwrap_or(self.config.default_isolation),
            resource_limits: Default::default(),
        };
        let outcome = self
            .sandbox
            .execute(&sandbox_request)
            .await
            .map_err(Box::new)?;
        envelope.update_resource_usage(outcome.clone());
        envelope.add_attempt(AttemptRecord {
            attempt_number: envelope.attempts().len() as u32 + 1,
            confidence: attempt_confidence,
            sandbox_success: outcome.success,
            note: None,
        });

        self.breaker.record_attempt(error_class, outcome.success);
        envelope.set_breaker_state(self.breaker.state);
        self.confidence.record_outcome(attempt_confidence, outcome.success);

        let (decision, final_packet) = if outcome.success {
            // The sandbox's "tests passed" verdict is never trusted as
            // semantic truth on its own: whatever it reports back is
            // re-run through the classifier (C1) exactly like the
            // original tool output was, and it's that re-classification —
            // not the sandbox's bare boolean — the promote/retry call is
            // keyed on.
            let rebanked_packet = classify_blob(
                &self.detectors,
                outcome.error_message.as_deref().unwrap_or(""),
                &ClassifierConfig {
                    lang: request.lang.clone(),
                    ..ClassifierConfig::default()
                },
            );
            envelope.merge_metadata(serde_json::json!({
                "rebanker_raw": rebanked_packet,
                "rebanker_hash": rebanked_packet.packet_hash,
                "rebanker_interpreted": serde_json::Value::Null,
            }));
            let delta = compute_delta(previous_packet, &rebanked_packet);
            let decision = if rebanked_packet.is_clean() {
                envelope.mark_success();
                Decision::Promote
            } else {
                match delta {
                    ErrorDelta::Resolved => {
                        envelope.mark_success();
                        Decision::Promote
                    }
                    _ => Decision::Retry,
                }
            };
            (decision, rebanked_packet)
        } else {
            let decision = if self.breaker.state == BreakerState::PermanentlyOpen {
                Decision::Rollback
            } else if !self.breaker.can_attempt(error_class).0 {
                Decision::Stop
            } else {
                Decision::Retry
            };
            (decision, current_packet)
        };

        envelope.seal_hash();
        Ok((decision, final_packet))
    }
}

fn stop_reason_label(reason: StopReason) -> &'static str {
    match reason {
        StopReason::MaxDepthReached => "max_depth_reached",
        StopReason::RepeatingPattern => "repeating_pattern",
        StopReason::DegradingConfidence => "degrading_confidence",
        StopReason::SeverityEscalation => "severity_escalation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::LocalSandbox;
    use crate::taxonomy::{compile_detectors, Taxonomy};

    fn orchestrator() -> Orchestrator {
        let detectors = compile_detectors(&Taxonomy::embedded_default()).unwrap();
        Orchestrator::new(HealerConfig::default(), detectors, Arc::new(LocalSandbox::new()))
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn request(patch: &str, output: &str) -> HealRequest {
        HealRequest {
            raw_tool_output: output.to_string(),
            patch_text: patch.to_string(),
            lang: None,
            model_logits: vec![2.0, 0.1],
            isolation: None,
            confidence_components: None,
        }
    }

    fn confident_request(patch: &str, output: &str) -> HealRequest {
        let mut req = request(patch, output);
        req.model_logits = vec![2.5, 0.1];
        req.confidence_components = Some(ConfidenceComponents {
            historical_success_rate: 0.95,
            pattern_similarity: 0.95,
            complexity_penalty: 1.0,
            test_coverage: 1.0,
        });
        req
    }

    #[tokio::test]
    async fn test_clean_output_with_passing_sandbox_promotes() {
        let mut orch = orchestrator();
        let mut envelope = PatchEnvelope::new("p1", serde_json::json!({}));
        // length 1 (not divisible by 3/5/7) -> sandbox passes
        let (decision, packet) = orch
            .run_attempt(&mut envelope, None, &request("a", "all good"), now())
            .await
            .unwrap();
        assert_eq!(decision, Decision::Promote);
        assert!(packet.is_clean());
        assert!(envelope.is_successful());
    }

    #[tokio::test]
    async fn test_risky_patch_forces_human_review() {
        let mut orch = orchestrator();
        let mut envelope = PatchEnvelope::new("p1", serde_json::json!({}));
        let (decision, _) = orch
            .run_attempt(
                &mut envelope,
                None,
                &request("database_schema_change here", "all good"),
                now(),
            )
            .await
            .unwrap();
        assert!(matches!(decision, Decision::HumanReview { .. }));
        assert!(envelope.is_flagged());
    }

    #[tokio::test]
    async fn test_syntax_error_with_low_confidence_logits_goes_to_human_review() {
        let mut orch = orchestrator();
        let mut envelope = PatchEnvelope::new("p1", serde_json::json!({}));
        let mut req = request("a", "SyntaxError: invalid syntax");
        req.model_logits = vec![0.0, 0.0];
        let (decision, _) = orch.run_attempt(&mut envelope, None, &req, now()).await.unwrap();
        assert!(matches!(decision, Decision::HumanReview { .. }));
    }

    #[tokio::test]
    async fn test_sufficient_confidence_retries_instead_of_escalating() {
        let mut orch = orchestrator();
        let mut envelope = PatchEnvelope::new("p1", serde_json::json!({}));
        // "abc" has length 3 -> sandbox unit test fails, but confidence
        // clears the logic floor, so the gate lets the attempt through.
        let (decision, packet) = orch
            .run_attempt(
                &mut envelope,
                None,
                &confident_request("abc", "ModuleNotFoundError: No module named 'numpy'"),
                now(),
            )
            .await
            .unwrap();
        assert_eq!(decision, Decision::Retry);
        assert!(!packet.is_clean());
    }

    #[tokio::test]
    async fn test_rate_limit_exceeded_is_fatal() {
        let mut orch = orchestrator();
        orch.config.rate_limit_max_attempts = 1;
        orch.rate_limiter = RateLimiter::new(1, 60);
        let mut envelope = PatchEnvelope::new("p1", serde_json::json!({}));
        orch.run_attempt(&mut envelope, None, &request("a", "all good"), now())
            .await
            .unwrap();
        let err = orch
            .run_attempt(&mut envelope, None, &request("a", "all good"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, HealError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_tampered_previous_packet_is_fatal() {
        let mut orch = orchestrator();
        let mut envelope = PatchEnvelope::new("p1", serde_json::json!({}));
        let mut prev = DiagnosticPacket::new(
            crate::packet::PacketStatus::Clean,
            vec![],
            String::new(),
            None,
        );
        prev.packet_hash = "tampered".to_string();
        let err = orch
            .run_attempt(&mut envelope, Some(&prev), &request("a", "all good"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, HealError::GroundTruthTampered { .. }));
    }
}
