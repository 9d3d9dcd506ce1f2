//! C6 — cascade handling: detects whether a chain of attempted fixes is
//! degenerating (repeating, getting less confident, or escalating in
//! severity) and should be stopped rather than retried further.

use serde::{Deserialize, Serialize};

use crate::confidence::ErrorClass;

/// One link in the cascade chain: the error class and confidence observed
/// at a given attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CascadeEntry {
    pub error_class: ErrorClass,
    pub confidence: f64,
}

fn severity_rank(class: ErrorClass) -> u8 {
    match class {
        ErrorClass::Syntax => 1,
        ErrorClass::Logic => 2,
        ErrorClass::Runtime => 3,
        ErrorClass::Performance => 4,
        ErrorClass::Security => 5,
    }
}

/// Why `should_stop` returned `true`, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxDepthReached,
    RepeatingPattern,
    DegradingConfidence,
    SeverityEscalation,
}

/// Append-only chain of cascade entries plus the stop-condition checks.
#[derive(Debug, Clone, Default)]
pub struct CascadeHandler {
    pub chain: Vec<CascadeEntry>,
    pub max_depth: usize,
}

impl CascadeHandler {
    pub fn new(max_depth: usize) -> Self {
        Self {
            chain: Vec::new(),
            max_depth,
        }
    }

    /// `true` once a second error has been chained onto the first.
    pub fn is_cascading(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Append a new entry to the chain.
    pub fn add_error(&mut self, entry: CascadeEntry) {
        self.chain.push(entry);
    }

    /// Check every stop condition, in order, returning the first that
    /// fires. Mirrors the original four-condition check verbatim.
    pub fn should_stop(&self) -> Option<StopReason> {
        if self.chain.len() >= self.max_depth {
            return Some(StopReason::MaxDepthReached);
        }
        if self.has_repeating_pattern() {
            return Some(StopReason::RepeatingPattern);
        }
        if self.has_degrading_confidence() {
            return Some(StopReason::DegradingConfidence);
        }
        if self.has_error_escalation() {
            return Some(StopReason::SeverityEscalation);
        }
        None
    }

    /// Last three entries share the same error class.
    fn has_repeating_pattern(&self) -> bool {
        if self.chain.len() < 3 {
            return false;
        }
        let tail = &self.chain[self.chain.len() - 3..];
        tail[0].error_class == tail[1].error_class && tail[1].error_class == tail[2].error_class
    }

    /// Last three confidences are strictly decreasing.
    fn has_degrading_confidence(&self) -> bool {
        if self.chain.len() < 3 {
            return false;
        }
        let tail = &self.chain[self.chain.len() - 3..];
        tail[0].confidence > tail[1].confidence && tail[1].confidence > tail[2].confidence
    }

    /// Last two severities (out of the last three entries) are strictly
    /// increasing.
    fn has_error_escalation(&self) -> bool {
        if self.chain.len() < 3 {
            return false;
        }
        let tail = &self.chain[self.chain.len() - 3..];
        let ranks: Vec<u8> = tail.iter().map(|e| severity_rank(e.error_class)).collect();
        ranks[1] > ranks[0] && ranks[2] > ranks[1]
    }

    /// Reset the chain while keeping the configured max depth.
    pub fn reset(&mut self) {
        self.chain.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(class: ErrorClass, confidence: f64) -> CascadeEntry {
        CascadeEntry {
            error_class: class,
            confidence,
        }
    }

    #[test]
    fn test_short_chain_never_stops() {
        let mut h = CascadeHandler::new(5);
        h.add_error(e(ErrorClass::Syntax, 0.9));
        h.add_error(e(ErrorClass::Syntax, 0.8));
        assert_eq!(h.should_stop(), None);
    }

    #[test]
    fn test_max_depth_triggers_stop() {
        let mut h = CascadeHandler::new(3);
        for _ in 0..3 {
            h.add_error(e(ErrorClass::Syntax, 0.9));
        }
        assert_eq!(h.should_stop(), Some(StopReason::MaxDepthReached));
    }

    #[test]
    fn test_repeating_pattern_triggers_stop() {
        let mut h = CascadeHandler::new(10);
        h.add_error(e(ErrorClass::Logic, 0.9));
        h.add_error(e(ErrorClass::Logic, 0.85));
        h.add_error(e(ErrorClass::Logic, 0.8));
        assert_eq!(h.should_stop(), Some(StopReason::RepeatingPattern));
    }

    #[test]
    fn test_degrading_confidence_triggers_stop() {
        let mut h = CascadeHandler::new(10);
        h.add_error(e(ErrorClass::Syntax, 0.9));
        h.add_error(e(ErrorClass::Logic, 0.6));
        h.add_error(e(ErrorClass::Runtime, 0.3));
        assert_eq!(h.should_stop(), Some(StopReason::DegradingConfidence));
    }

    #[test]
    fn test_severity_escalation_triggers_stop() {
        let mut h = CascadeHandler::new(10);
        h.add_error(e(ErrorClass::Syntax, 0.5));
        h.add_error(e(ErrorClass::Logic, 0.9));
        h.add_error(e(ErrorClass::Security, 0.6));
        assert_eq!(h.should_stop(), Some(StopReason::SeverityEscalation));
    }

    #[test]
    fn test_reset_clears_chain() {
        let mut h = CascadeHandler::new(3);
        h.add_error(e(ErrorClass::Syntax, 0.9));
        h.reset();
        assert!(!h.is_cascading());
        assert_eq!(h.should_stop(), None);
    }
}
