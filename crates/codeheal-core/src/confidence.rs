//! C4 — confidence scoring: temperature-scaled softmax over model logits,
//! combined with component modifiers and beta-calibrated against this
//! session's observed outcome history.

use serde::{Deserialize, Serialize};

/// Coarse error classification the scorer treats differently: syntax errors
/// get a confidence boost (they're mechanical to fix), logic/runtime errors
/// get a discount (semantic risk), everything else uses the raw softmax
/// probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Syntax,
    Logic,
    Runtime,
    Performance,
    Security,
}

impl ErrorClass {
    /// Map a taxonomy family name to an `ErrorClass`, defaulting to `Logic`
    /// for anything unrecognized (the conservative choice: logic errors get
    /// the stricter confidence floor).
    pub fn from_family(family: &str) -> Self {
        match family {
            "syntax" => ErrorClass::Syntax,
            "resolution" | "logic" => ErrorClass::Logic,
            "runtime" => ErrorClass::Runtime,
            "performance" => ErrorClass::Performance,
            "security" => ErrorClass::Security,
            _ => ErrorClass::Logic,
        }
    }
}

/// Modifiers applied on top of the base softmax confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceComponents {
    pub historical_success_rate: f64,
    pub pattern_similarity: f64,
    pub complexity_penalty: f64,
    pub test_coverage: f64,
}

impl Default for ConfidenceComponents {
    fn default() -> Self {
        Self {
            historical_success_rate: 0.5,
            pattern_similarity: 0.5,
            complexity_penalty: 1.0,
            test_coverage: 0.5,
        }
    }
}

/// The scored outcome of one confidence calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceScore {
    pub error_class: ErrorClass,
    /// The per-class confidence before any historical/calibration
    /// discounting — `base` in the scoring formula, used directly as the
    /// gate for mechanical error classes (syntax/logic/runtime) since those
    /// floors are meant to bound the model's own certainty, not a
    /// success-rate-weighted blend.
    pub base_confidence: f64,
    pub raw_confidence: f64,
    pub calibrated_confidence: f64,
    pub components: ConfidenceComponents,
}

/// Scores patch confidence for one healing session, accumulating an
/// outcome history used for beta calibration.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    temperature: f64,
    calibration_samples: usize,
    /// (confidence_at_attempt_time, succeeded) pairs, oldest first.
    history: Vec<(f64, bool)>,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(1.0, 1000)
    }
}

impl ConfidenceScorer {
    pub fn new(temperature: f64, calibration_samples: usize) -> Self {
        Self {
            temperature,
            calibration_samples,
            history: Vec::new(),
        }
    }

    /// Temperature-scaled softmax over `logits`.
    fn softmax(&self, logits: &[f64]) -> Vec<f64> {
        if logits.is_empty() {
            return vec![];
        }
        let scaled: Vec<f64> = logits.iter().map(|l| l / self.temperature).collect();
        let max = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scaled.iter().map(|l| (l - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.iter().map(|e| e / sum).collect()
    }

    /// Calculate a confidence score for `logits` given `error_class` and the
    /// component modifiers. `logits` is the raw scoring-model output over
    /// candidate classes; callers pass a single-element slice when they only
    /// have a bare probability.
    pub fn calculate_confidence(
        &self,
        logits: &[f64],
        error_class: ErrorClass,
        components: ConfidenceComponents,
    ) -> ConfidenceScore {
        let probs = self.softmax(logits);
        let max_prob = probs.iter().cloned().fold(0.0_f64, f64::max);

        let base = match error_class {
            ErrorClass::Syntax => (max_prob * 1.2).min(1.0),
            ErrorClass::Logic | ErrorClass::Runtime => max_prob * 0.9,
            ErrorClass::Performance | ErrorClass::Security => max_prob,
        };

        let combined = base
            * components.historical_success_rate
            * components.pattern_similarity
            * components.complexity_penalty
            * (0.5 + components.test_coverage * 0.5);
        let raw_confidence = combined.clamp(0.0, 1.0);

        let calibrated_confidence = self.beta_calibrate(raw_confidence);

        ConfidenceScore {
            error_class,
            base_confidence: base,
            raw_confidence,
            calibrated_confidence,
            components,
        }
    }

    /// Blend `confidence` with the empirical success rate of this session's
    /// history once at least 10 outcomes have been recorded: `confidence *
    /// 0.7 + empirical_rate * 0.3`.
    fn beta_calibrate(&self, confidence: f64) -> f64 {
        if self.history.len() < 10 {
            return confidence;
        }
        let successes = self.history.iter().filter(|(_, ok)| *ok).count();
        let empirical_rate = successes as f64 / self.history.len() as f64;
        (confidence * 0.7 + empirical_rate * 0.3).clamp(0.0, 1.0)
    }

    /// Record the realized outcome of a scored attempt, bounding the
    /// history to `calibration_samples` (oldest evicted first).
    pub fn record_outcome(&mut self, confidence: f64, success: bool) {
        self.history.push((confidence, success));
        while self.history.len() > self.calibration_samples {
            self.history.remove(0);
        }
    }

    /// Whether a score clears the configured per-class floor. Syntax, logic,
    /// and runtime errors are gated on the raw per-class confidence — the
    /// model's own certainty, before any historical-success-rate or
    /// calibration discount is applied — since those floors bound how sure
    /// the classifier is about a mechanical fix. Performance and security
    /// errors are gated on the fully-discounted, calibrated score instead,
    /// since those classes carry real-world risk that the historical track
    /// record and beta calibration are meant to temper.
    pub fn should_attempt_fix(
        score: &ConfidenceScore,
        syntax_floor: f64,
        logic_floor: f64,
        overall_floor: f64,
    ) -> bool {
        match score.error_class {
            ErrorClass::Syntax => score.base_confidence >= syntax_floor,
            ErrorClass::Logic | ErrorClass::Runtime => score.base_confidence >= logic_floor,
            ErrorClass::Performance | ErrorClass::Security => {
                score.calibrated_confidence >= overall_floor
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_gets_confidence_boost() {
        let scorer = ConfidenceScorer::default();
        let score = scorer.calculate_confidence(
            &[2.0, 0.1, 0.1],
            ErrorClass::Syntax,
            ConfidenceComponents::default(),
        );
        assert!(score.raw_confidence > 0.5);
    }

    #[test]
    fn test_logic_gets_discount_relative_to_raw_softmax() {
        let scorer = ConfidenceScorer::default();
        let syntax = scorer.calculate_confidence(
            &[2.0, 0.1, 0.1],
            ErrorClass::Syntax,
            ConfidenceComponents::default(),
        );
        let logic = scorer.calculate_confidence(
            &[2.0, 0.1, 0.1],
            ErrorClass::Logic,
            ConfidenceComponents::default(),
        );
        assert!(logic.raw_confidence < syntax.raw_confidence);
    }

    #[test]
    fn test_confidence_always_clamped() {
        let scorer = ConfidenceScorer::default();
        let components = ConfidenceComponents {
            historical_success_rate: 1.0,
            pattern_similarity: 1.0,
            complexity_penalty: 1.0,
            test_coverage: 1.0,
        };
        let score = scorer.calculate_confidence(&[10.0], ErrorClass::Syntax, components);
        assert!(score.raw_confidence <= 1.0);
    }

    #[test]
    fn test_beta_calibration_kicks_in_after_ten_outcomes() {
        let mut scorer = ConfidenceScorer::default();
        for _ in 0..10 {
            scorer.record_outcome(0.9, false);
        }
        let score = scorer.calculate_confidence(
            &[2.0, 0.1],
            ErrorClass::Syntax,
            ConfidenceComponents::default(),
        );
        // All-failure history should pull calibrated confidence down.
        assert!(score.calibrated_confidence < score.raw_confidence);
    }

    #[test]
    fn test_history_eviction_bounded() {
        let mut scorer = ConfidenceScorer::new(1.0, 3);
        for i in 0..5 {
            scorer.record_outcome(0.5, i % 2 == 0);
        }
        assert_eq!(scorer.history.len(), 3);
    }

    #[test]
    fn test_should_attempt_fix_per_class_floor() {
        let syntax_score = ConfidenceScore {
            error_class: ErrorClass::Syntax,
            base_confidence: 0.99,
            raw_confidence: 0.40,
            calibrated_confidence: 0.40,
            components: ConfidenceComponents::default(),
        };
        assert!(ConfidenceScorer::should_attempt_fix(
            &syntax_score,
            0.98,
            0.80,
            0.85
        ));

        let logic_score = ConfidenceScore {
            error_class: ErrorClass::Logic,
            base_confidence: 0.79,
            raw_confidence: 0.99,
            calibrated_confidence: 0.99,
            components: ConfidenceComponents::default(),
        };
        assert!(!ConfidenceScorer::should_attempt_fix(
            &logic_score,
            0.98,
            0.80,
            0.85
        ));

        let security_score = ConfidenceScore {
            error_class: ErrorClass::Security,
            base_confidence: 0.99,
            raw_confidence: 0.40,
            calibrated_confidence: 0.40,
            components: ConfidenceComponents::default(),
        };
        assert!(!ConfidenceScorer::should_attempt_fix(
            &security_score,
            0.98,
            0.80,
            0.85
        ));
    }

    #[test]
    fn test_error_class_from_family() {
        assert_eq!(ErrorClass::from_family("syntax"), ErrorClass::Syntax);
        assert_eq!(ErrorClass::from_family("resolution"), ErrorClass::Logic);
        assert_eq!(ErrorClass::from_family("unknown"), ErrorClass::Logic);
    }
}
