//! C11 — the retry loop: drives [`crate::orchestrator::Orchestrator`]
//! across successive attempts with exponential backoff, carrying the prior
//! attempt's [`DiagnosticPacket`] forward as ground truth.
//!
//! Every iteration re-verifies the carried-forward packet's hash before
//! trusting it; a mismatch is fatal and aborts the loop immediately rather
//! than silently resuming from a tampered state.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;

use crate::chat_history::{ChatHistory, Role};
use crate::confidence::ConfidenceComponents;
use crate::envelope::PatchEnvelope;
use crate::error::{HealError, Result};
use crate::orchestrator::{Decision, HealRequest, Orchestrator};
use crate::packet::DiagnosticPacket;

/// Exponential backoff with jitter: `base * 2^attempt`, capped at `max`,
/// with up to `jitter_fraction` of the computed delay added or subtracted.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub jitter_fraction: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            max: Duration::from_secs(30),
            jitter_fraction: 0.2,
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base.saturating_mul(1u32 << attempt.min(20));
        let capped = scaled.min(self.max);
        let jitter_range = capped.as_secs_f64() * self.jitter_fraction;
        let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
        Duration::from_secs_f64((capped.as_secs_f64() + jitter).max(0.0))
    }
}

/// A function providing the next attempt's raw tool output, given the
/// current patch text. In production this re-runs the configured
/// diagnostics tool against the patched source; tests pass a closure.
pub type ToolRunner = Box<dyn Fn(&str) -> String + Send + Sync>;

/// The terminal result of a retry loop run.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub decision: Decision,
    pub attempts_run: u32,
    pub final_packet: DiagnosticPacket,
}

/// Drive `orchestrator` across attempts until it returns a decision other
/// than `Retry`, or `max_attempts` is exhausted.
pub async fn run_retry_loop(
    orchestrator: &mut Orchestrator,
    envelope: &mut PatchEnvelope,
    history: &mut ChatHistory,
    tool_runner: &ToolRunner,
    mut patch_text: String,
    confidence_components: Option<ConfidenceComponents>,
    backoff: BackoffPolicy,
    max_attempts: u32,
) -> Result<RetryOutcome> {
    let mut previous_packet: Option<DiagnosticPacket> = None;
    let mut last_decision = Decision::Retry;
    let mut last_packet: Option<DiagnosticPacket> = None;

    history.record(
        Role::System,
        serde_json::json!({
            "seed": "code-healing session started",
            "max_attempts": max_attempts,
        }),
        Utc::now(),
    );

    for attempt in 0..max_attempts {
        if let Some(prev) = &previous_packet {
            if !prev.verify_hash() {
                let err = HealError::GroundTruthTampered {
                    expected: prev.compute_hash(),
                    actual: prev.packet_hash.clone(),
                };
                history.record_fatal(&err, Utc::now());
                return Err(err);
            }
        }

        let raw_output = tool_runner(&patch_text);

        let now = Utc::now();
        let mut user_payload = serde_json::json!({
            "attempt": attempt,
            "candidate_code": patch_text,
            "raw_tool_output": raw_output,
            "lang": serde_json::Value::Null,
        });
        if let Some(prev) = &previous_packet {
            user_payload["previous_packet"] = serde_json::json!({
                "status": prev.status,
                "entries": prev.entries,
                "packet_hash": prev.packet_hash,
                "hint": prev
                    .entries
                    .first()
                    .map(|e| format!("previous attempt failed with {}", e.code)),
            });
        }
        history.record_with_phase(Role::User, user_payload, Some("attempt"), now);

        let request = HealRequest {
            raw_tool_output: raw_output,
            patch_text: patch_text.clone(),
            lang: None,
            model_logits: vec![2.0, 0.1],
            isolation: None,
            confidence_components,
        };

        let run_result = orchestrator
            .run_attempt(envelope, previous_packet.as_ref(), &request, now)
            .await;

        let (decision, packet) = match run_result {
            Ok(pair) => pair,
            Err(err) => {
                history.record_fatal(&err, now);
                return Err(err);
            }
        };

        history.record(
            Role::Tool,
            serde_json::json!({
                "attempt": attempt,
                "decision": decision,
                "packet_status": packet.status,
            }),
            now,
        );

        last_decision = decision.clone();
        last_packet = Some(packet.clone());
        previous_packet = Some(packet);

        if !matches!(decision, Decision::Retry) {
            return Ok(RetryOutcome {
                decision,
                attempts_run: attempt + 1,
                final_packet: last_packet.expect("set this iteration"),
            });
        }

        // A retry carries the same patch text forward (a real caller
        // would apply the model's next candidate patch here); this loop
        // only owns the backoff/ground-truth-verification contract.
        let _ = &mut patch_text;
        tokio::time::sleep(backoff.delay_for(attempt)).await;
    }

    Ok(RetryOutcome {
        decision: last_decision,
        attempts_run: max_attempts,
        final_packet: last_packet.expect("loop runs at least once when max_attempts > 0"),
    })
}
