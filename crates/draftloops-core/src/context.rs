use std::collections::HashSet;
use std::time::{Duration, Instant};
use uuid::Uuid;

use draftloops_critic::{Critique, WriterPrompts};

use crate::attempt::best_index;
use crate::policy::{AttemptCheck, ProgressGuard, StoppingDecision, StoppingPolicy};
use crate::{Attempt, BestResult, LoopError};

/// Dimensions scored when none are configured
pub const DEFAULT_DIMENSIONS: [&str; 3] = ["relevance", "clarity", "ethics"];

/// State of one loop invocation
#[derive(Debug, Clone)]
pub struct LoopContext {
    pub run_id: Uuid,
    /// Subject of the content
    pub topic: String,
    /// Ordered quality dimensions
    pub dimensions: Vec<String>,
    pub policy: StoppingPolicy,
    /// Append-only record of every attempt
    pub history: Vec<Attempt>,
    guard: ProgressGuard,
    best: Option<usize>,
    started_at: Instant,
}

impl LoopContext {
    pub fn new(topic: impl Into<String>) -> Self {
        let policy = StoppingPolicy::default();
        Self {
            run_id: Uuid::new_v4(),
            topic: topic.into(),
            dimensions: DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            guard: ProgressGuard::new(policy.max_attempts),
            policy,
            history: Vec::new(),
            best: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec<String>) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_max_attempts(mut self, max: usize) -> Self {
        self.policy.max_attempts = max;
        self.guard = ProgressGuard::new(max);
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.policy.quality_threshold = threshold;
        self
    }

    pub fn with_policy(mut self, policy: StoppingPolicy) -> Self {
        self.guard = ProgressGuard::new(policy.max_attempts);
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), LoopError> {
        if self.topic.trim().is_empty() {
            return Err(LoopError::ConfigError("topic is empty".into()));
        }
        if self.dimensions.is_empty() {
            return Err(LoopError::ConfigError("no quality dimensions".into()));
        }
        let mut seen = HashSet::new();
        for dimension in &self.dimensions {
            if dimension.trim().is_empty() {
                return Err(LoopError::ConfigError("empty dimension name".into()));
            }
            if !seen.insert(dimension.as_str()) {
                return Err(LoopError::ConfigError(format!(
                    "duplicate dimension: {}",
                    dimension
                )));
            }
        }
        if self.policy.max_attempts == 0 {
            return Err(LoopError::ConfigError("max_attempts must be at least 1".into()));
        }
        let threshold = self.policy.quality_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(LoopError::ConfigError(format!(
                "quality threshold {} is outside 0-100",
                threshold
            )));
        }
        Ok(())
    }

    /// Index the next attempt will get
    pub fn next_index(&self) -> usize {
        self.history.len()
    }

    /// The next attempt is the last the budget permits
    pub fn is_final_attempt(&self) -> bool {
        self.guard.is_final(self.next_index())
    }

    /// Spend the next attempt's slot after the writer rejected it.
    /// Returns the attempts still available
    pub fn forfeit_attempt(&mut self) -> usize {
        self.guard.forfeit();
        self.remaining_attempts()
    }

    pub fn remaining_attempts(&self) -> usize {
        self.guard.budget().saturating_sub(self.next_index())
    }

    /// Whether the budget leaves no room for another attempt
    pub fn budget_spent(&self) -> bool {
        self.guard.is_spent(self.next_index())
    }

    /// Writer prompt for the next attempt.
    /// First attempt drafts from the topic, later ones revise the previous attempt
    pub fn current_prompt(&self) -> String {
        match self.history.last() {
            None => WriterPrompts::initial(&self.topic),
            Some(previous) => WriterPrompts::revision(
                &self.topic,
                &previous.content,
                &previous.report,
                previous.stuck_on.is_some(),
            ),
        }
    }

    /// Earliest attempt with byte-identical content
    pub fn find_repeat(&self, content: &str) -> Option<usize> {
        self.history
            .iter()
            .find(|a| a.content == content)
            .map(|a| a.index)
    }

    /// Non-empty critiques identical to the previous attempt's
    pub fn feedback_repeats(&self, critiques: &[Critique]) -> bool {
        !critiques.is_empty()
            && self
                .history
                .last()
                .is_some_and(|previous| previous.critiques.as_slice() == critiques)
    }

    /// Whether `overall` beats every attempt so far
    pub fn would_improve(&self, overall: f64) -> bool {
        self.best_score().map_or(true, |best| overall > best)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.map(|i| self.history[i].overall)
    }

    pub fn best(&self) -> BestResult {
        self.best
            .map(|i| BestResult::from_attempt(&self.history[i]))
            .unwrap_or_else(BestResult::failed)
    }

    pub fn decide(&mut self, check: &AttemptCheck) -> StoppingDecision {
        self.policy.decide(check, &mut self.guard)
    }

    pub fn push_attempt(&mut self, attempt: Attempt) {
        self.history.push(attempt);
        self.best = best_index(&self.history);
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Consume the context into its best result and history
    pub fn finish(self) -> (BestResult, Vec<Attempt>, Duration) {
        let best = self.best();
        let duration = self.total_duration();
        (best, self.history, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let context = LoopContext::new("Quantum Computing");
        assert_eq!(context.dimensions, vec!["relevance", "clarity", "ethics"]);
        assert_eq!(context.policy.max_attempts, 3);
        assert_eq!(context.policy.quality_threshold, 95.0);
        assert!(context.validate().is_ok());
        assert!(context.current_prompt().contains("Quantum Computing"));
    }

    #[test]
    fn test_validation_errors() {
        assert!(LoopContext::new("  ").validate().is_err());
        assert!(LoopContext::new("t").with_max_attempts(0).validate().is_err());
        assert!(LoopContext::new("t").with_dimensions(vec![]).validate().is_err());
        assert!(LoopContext::new("t")
            .with_dimensions(vec!["clarity".into(), "clarity".into()])
            .validate()
            .is_err());
        assert!(LoopContext::new("t")
            .with_quality_threshold(120.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_final_attempt_tracks_budget() {
        let context = LoopContext::new("t").with_max_attempts(1);
        assert!(context.is_final_attempt());
        let context = LoopContext::new("t").with_max_attempts(2);
        assert!(!context.is_final_attempt());
    }

    #[test]
    fn test_forfeit_lowers_remaining_attempts() {
        let mut context = LoopContext::new("t").with_max_attempts(2);
        assert_eq!(context.remaining_attempts(), 2);
        assert_eq!(context.forfeit_attempt(), 1);
        assert!(context.is_final_attempt());
        assert!(!context.budget_spent());
        assert_eq!(context.forfeit_attempt(), 0);
        assert!(context.budget_spent());
    }
}
