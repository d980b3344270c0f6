use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 95.0;

/// Verdict reached after each attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppingDecision {
    Continue,
    StopQualityMet,
    StopBudgetExhausted,
    /// Only produced when the repeated-feedback heuristic is enabled
    StopFeedbackConverged,
}

impl StoppingDecision {
    pub fn is_stop(&self) -> bool {
        !matches!(self, StoppingDecision::Continue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoppingDecision::Continue => "continue",
            StoppingDecision::StopQualityMet => "stop_quality_met",
            StoppingDecision::StopBudgetExhausted => "stop_budget_exhausted",
            StoppingDecision::StopFeedbackConverged => "stop_feedback_converged",
        }
    }
}

impl std::fmt::Display for StoppingDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When the loop stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppingPolicy {
    pub max_attempts: usize,
    pub quality_threshold: f64,
    /// Content identical to an earlier attempt collapses the remaining budget
    pub stop_on_repeated_content: bool,
    /// Critiques identical to the previous attempt's count as converged
    pub stop_on_repeated_feedback: bool,
}

impl Default for StoppingPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            stop_on_repeated_content: true,
            stop_on_repeated_feedback: false,
        }
    }
}

/// What the policy looks at for one attempt
#[derive(Debug, Clone, Copy)]
pub struct AttemptCheck {
    pub index: usize,
    pub overall: f64,
    /// Earlier attempt with byte-identical content
    pub stuck_on: Option<usize>,
    pub feedback_repeated: bool,
}

/// Budget bookkeeping carried across attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressGuard {
    budget: usize,
    stuck_count: usize,
}

impl ProgressGuard {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            budget: max_attempts,
            stuck_count: 0,
        }
    }

    /// Attempts allowed in total, possibly lowered by stuck detection
    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn stuck_count(&self) -> usize {
        self.stuck_count
    }

    /// Whether `index` is the last attempt the budget permits
    pub fn is_final(&self, index: usize) -> bool {
        index + 1 >= self.budget
    }

    /// Give up one attempt slot without recording an attempt
    pub fn forfeit(&mut self) {
        self.budget = self.budget.saturating_sub(1);
    }

    /// No slot is left for an attempt at `index`
    pub fn is_spent(&self, index: usize) -> bool {
        index >= self.budget
    }
}

impl StoppingPolicy {
    /// Decide whether to run another attempt.
    ///
    /// Priority: quality threshold, repeated feedback, repeated content,
    /// budget. A first repeated content leaves at most one more attempt; a
    /// second one ends the run.
    pub fn decide(&self, check: &AttemptCheck, guard: &mut ProgressGuard) -> StoppingDecision {
        if check.overall >= self.quality_threshold {
            return StoppingDecision::StopQualityMet;
        }

        if self.stop_on_repeated_feedback && check.feedback_repeated {
            return StoppingDecision::StopFeedbackConverged;
        }

        if self.stop_on_repeated_content && check.stuck_on.is_some() {
            guard.stuck_count += 1;
            if guard.stuck_count > 1 {
                return StoppingDecision::StopBudgetExhausted;
            }
            guard.budget = guard.budget.min(check.index + 2);
        }

        if guard.is_final(check.index) {
            StoppingDecision::StopBudgetExhausted
        } else {
            StoppingDecision::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(index: usize, overall: f64) -> AttemptCheck {
        AttemptCheck {
            index,
            overall,
            stuck_on: None,
            feedback_repeated: false,
        }
    }

    #[test]
    fn test_default_budget_sequence() {
        let policy = StoppingPolicy::default();
        let mut guard = ProgressGuard::new(policy.max_attempts);
        assert_eq!(policy.decide(&check(0, 70.0), &mut guard), StoppingDecision::Continue);
        assert_eq!(policy.decide(&check(1, 90.0), &mut guard), StoppingDecision::Continue);
        assert_eq!(
            policy.decide(&check(2, 94.9), &mut guard),
            StoppingDecision::StopBudgetExhausted
        );
    }

    #[test]
    fn test_quality_beats_budget_on_last_attempt() {
        let policy = StoppingPolicy::default();
        let mut guard = ProgressGuard::new(3);
        assert_eq!(
            policy.decide(&check(2, 95.0), &mut guard),
            StoppingDecision::StopQualityMet
        );
    }

    #[test]
    fn test_first_stuck_leaves_one_more_attempt() {
        let policy = StoppingPolicy {
            max_attempts: 10,
            ..Default::default()
        };
        let mut guard = ProgressGuard::new(policy.max_attempts);
        let stuck = AttemptCheck {
            stuck_on: Some(0),
            ..check(1, 40.0)
        };
        assert_eq!(policy.decide(&stuck, &mut guard), StoppingDecision::Continue);
        assert_eq!(guard.budget(), 3);
        assert!(guard.is_final(2));
        assert_eq!(
            policy.decide(&check(2, 40.0), &mut guard),
            StoppingDecision::StopBudgetExhausted
        );
    }

    #[test]
    fn test_second_stuck_stops() {
        let policy = StoppingPolicy {
            max_attempts: 10,
            ..Default::default()
        };
        let mut guard = ProgressGuard::new(10);
        let stuck = |index| AttemptCheck {
            stuck_on: Some(0),
            ..check(index, 40.0)
        };
        assert_eq!(policy.decide(&stuck(1), &mut guard), StoppingDecision::Continue);
        assert_eq!(
            policy.decide(&stuck(2), &mut guard),
            StoppingDecision::StopBudgetExhausted
        );
        assert_eq!(guard.stuck_count(), 2);
    }

    #[test]
    fn test_stuck_ignored_when_heuristic_disabled() {
        let policy = StoppingPolicy {
            max_attempts: 5,
            stop_on_repeated_content: false,
            ..Default::default()
        };
        let mut guard = ProgressGuard::new(5);
        let stuck = AttemptCheck {
            stuck_on: Some(0),
            ..check(1, 40.0)
        };
        assert_eq!(policy.decide(&stuck, &mut guard), StoppingDecision::Continue);
        assert_eq!(guard.budget(), 5);
    }

    #[test]
    fn test_repeated_feedback_only_when_enabled() {
        let repeated = AttemptCheck {
            feedback_repeated: true,
            ..check(1, 60.0)
        };

        let default_policy = StoppingPolicy::default();
        let mut guard = ProgressGuard::new(3);
        assert_eq!(
            default_policy.decide(&repeated, &mut guard),
            StoppingDecision::Continue
        );

        let policy = StoppingPolicy {
            stop_on_repeated_feedback: true,
            ..Default::default()
        };
        let mut guard = ProgressGuard::new(3);
        assert_eq!(
            policy.decide(&repeated, &mut guard),
            StoppingDecision::StopFeedbackConverged
        );
    }

    #[test]
    fn test_forfeit_spends_a_slot() {
        let mut guard = ProgressGuard::new(3);
        guard.forfeit();
        assert_eq!(guard.budget(), 2);
        assert!(guard.is_final(1));
        assert!(!guard.is_spent(1));
        assert!(guard.is_spent(2));

        guard.forfeit();
        guard.forfeit();
        guard.forfeit();
        assert_eq!(guard.budget(), 0);
        assert!(guard.is_spent(0));
    }

    #[test]
    fn test_decision_serializes_snake_case() {
        let json = serde_json::to_string(&StoppingDecision::StopQualityMet).unwrap();
        assert_eq!(json, "\"stop_quality_met\"");
    }
}
