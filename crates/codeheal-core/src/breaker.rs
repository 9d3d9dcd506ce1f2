//! C5 — dual circuit breaker: independent syntax and logic lanes, each with
//! its own attempt cap and error-rate budget, converging to a permanently
//! open state once both lanes are exhausted.

use serde::{Deserialize, Serialize};

use crate::confidence::ErrorClass;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    SyntaxOpen,
    LogicOpen,
    PermanentlyOpen,
}

/// Two independent attempt/error-budget lanes — syntax errors are cheap and
/// get a generous attempt cap but a tight error-rate budget; logic errors
/// are expensive and get the opposite.
#[derive(Debug, Clone)]
pub struct DualCircuitBreaker {
    pub state: BreakerState,

    syntax_attempts: u32,
    syntax_errors: u32,
    syntax_max_attempts: u32,
    syntax_error_budget: f64,

    logic_attempts: u32,
    logic_errors: u32,
    logic_max_attempts: u32,
    logic_error_budget: f64,
}

impl DualCircuitBreaker {
    pub fn new(
        syntax_max_attempts: u32,
        syntax_error_budget: f64,
        logic_max_attempts: u32,
        logic_error_budget: f64,
    ) -> Self {
        Self {
            state: BreakerState::Closed,
            syntax_attempts: 0,
            syntax_errors: 0,
            syntax_max_attempts,
            syntax_error_budget,
            logic_attempts: 0,
            logic_errors: 0,
            logic_max_attempts,
            logic_error_budget,
        }
    }

    fn lane_for(class: ErrorClass) -> Lane {
        match class {
            ErrorClass::Syntax => Lane::Syntax,
            _ => Lane::Logic,
        }
    }

    /// Whether an attempt may proceed for `class`, with a human-readable
    /// reason when it may not.
    pub fn can_attempt(&self, class: ErrorClass) -> (bool, String) {
        if self.state == BreakerState::PermanentlyOpen {
            return (false, "circuit breaker permanently open".to_string());
        }

        match Self::lane_for(class) {
            Lane::Syntax => {
                if self.state == BreakerState::SyntaxOpen {
                    return (false, "syntax circuit breaker open".to_string());
                }
                if self.syntax_attempts >= self.syntax_max_attempts {
                    return (
                        false,
                        format!(
                            "syntax attempts exceeded ({}/{})",
                            self.syntax_attempts, self.syntax_max_attempts
                        ),
                    );
                }
                if self.syntax_error_rate() > self.syntax_error_budget {
                    return (
                        false,
                        format!(
                            "syntax error rate exceeded budget ({}/{})",
                            self.syntax_errors, self.syntax_attempts
                        ),
                    );
                }
                (true, "ok".to_string())
            }
            Lane::Logic => {
                if self.state == BreakerState::LogicOpen {
                    return (false, "logic circuit breaker open".to_string());
                }
                if self.logic_attempts >= self.logic_max_attempts {
                    return (
                        false,
                        format!(
                            "logic attempts exceeded ({}/{})",
                            self.logic_attempts, self.logic_max_attempts
                        ),
                    );
                }
                if self.logic_error_rate() > self.logic_error_budget {
                    return (
                        false,
                        format!(
                            "logic error rate exceeded budget ({}/{})",
                            self.logic_errors, self.logic_attempts
                        ),
                    );
                }
                (true, "ok".to_string())
            }
        }
    }

    fn syntax_error_rate(&self) -> f64 {
        if self.syntax_attempts == 0 {
            0.0
        } else {
            self.syntax_errors as f64 / self.syntax_attempts as f64
        }
    }

    fn logic_error_rate(&self) -> f64 {
        if self.logic_attempts == 0 {
            0.0
        } else {
            self.logic_errors as f64 / self.logic_attempts as f64
        }
    }

    fn lane_exhausted(&self, lane: Lane) -> bool {
        match lane {
            Lane::Syntax => {
                self.syntax_attempts >= self.syntax_max_attempts
                    || self.syntax_error_rate() > self.syntax_error_budget
            }
            Lane::Logic => {
                self.logic_attempts >= self.logic_max_attempts
                    || self.logic_error_rate() > self.logic_error_budget
            }
        }
    }

    /// Record the outcome of an attempt on the lane matching `class`,
    /// opening that lane (and promoting to permanently open if the other
    /// lane is also exhausted) when its budget is blown.
    pub fn record_attempt(&mut self, class: ErrorClass, success: bool) {
        match Self::lane_for(class) {
            Lane::Syntax => {
                self.syntax_attempts += 1;
                if !success {
                    self.syntax_errors += 1;
                }
                if self.lane_exhausted(Lane::Syntax) {
                    self.state = BreakerState::SyntaxOpen;
                }
            }
            Lane::Logic => {
                self.logic_attempts += 1;
                if !success {
                    self.logic_errors += 1;
                }
                if self.lane_exhausted(Lane::Logic) {
                    self.state = BreakerState::LogicOpen;
                }
            }
        }

        // Generalized from the original's asymmetric check: whichever lane
        // just opened, promote to permanently open if the *other* lane is
        // already exhausted too.
        if self.state == BreakerState::SyntaxOpen && self.lane_exhausted(Lane::Logic) {
            self.state = BreakerState::PermanentlyOpen;
        } else if self.state == BreakerState::LogicOpen && self.lane_exhausted(Lane::Syntax) {
            self.state = BreakerState::PermanentlyOpen;
        }
    }

    /// Reset both lanes to a fresh, closed state.
    pub fn reset(&mut self) {
        *self = Self::new(
            self.syntax_max_attempts,
            self.syntax_error_budget,
            self.logic_max_attempts,
            self.logic_error_budget,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Syntax,
    Logic,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> DualCircuitBreaker {
        DualCircuitBreaker::new(3, 0.03, 10, 0.10)
    }

    #[test]
    fn test_starts_closed_and_allows_attempts() {
        let b = breaker();
        assert_eq!(b.state, BreakerState::Closed);
        assert!(b.can_attempt(ErrorClass::Syntax).0);
        assert!(b.can_attempt(ErrorClass::Logic).0);
    }

    #[test]
    fn test_syntax_lane_opens_after_max_attempts() {
        let mut b = breaker();
        for _ in 0..3 {
            b.record_attempt(ErrorClass::Syntax, true);
        }
        assert_eq!(b.state, BreakerState::SyntaxOpen);
        let (allowed, reason) = b.can_attempt(ErrorClass::Syntax);
        assert!(!allowed);
        assert!(reason.contains("syntax"));
    }

    #[test]
    fn test_logic_lane_independent_of_syntax() {
        let mut b = breaker();
        for _ in 0..3 {
            b.record_attempt(ErrorClass::Syntax, true);
        }
        assert_eq!(b.state, BreakerState::SyntaxOpen);
        // logic lane still fine unless exhausted too
        assert!(b.can_attempt(ErrorClass::Logic).0);
    }

    #[test]
    fn test_promotes_to_permanently_open_when_both_lanes_exhausted() {
        let mut b = breaker();
        for _ in 0..10 {
            b.record_attempt(ErrorClass::Logic, true);
        }
        assert_eq!(b.state, BreakerState::LogicOpen);
        for _ in 0..3 {
            b.record_attempt(ErrorClass::Syntax, true);
        }
        assert_eq!(b.state, BreakerState::PermanentlyOpen);
        assert!(!b.can_attempt(ErrorClass::Syntax).0);
        assert!(!b.can_attempt(ErrorClass::Logic).0);
    }

    #[test]
    fn test_error_budget_opens_lane_before_max_attempts() {
        let mut b = DualCircuitBreaker::new(100, 0.1, 100, 0.1);
        // 2 errors out of 10 attempts = 20% > 10% budget
        for i in 0..10 {
            b.record_attempt(ErrorClass::Syntax, i >= 2);
        }
        assert_eq!(b.state, BreakerState::SyntaxOpen);
    }

    #[test]
    fn test_reset_restores_closed_state() {
        let mut b = breaker();
        for _ in 0..3 {
            b.record_attempt(ErrorClass::Syntax, true);
        }
        assert_eq!(b.state, BreakerState::SyntaxOpen);
        b.reset();
        assert_eq!(b.state, BreakerState::Closed);
        assert!(b.can_attempt(ErrorClass::Syntax).0);
    }
}
