use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use draftloops_critic::{Critique, DimensionScore};

use crate::StoppingDecision;

/// Record of one generate-evaluate cycle, immutable once pushed to history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// 0-based, gapless
    pub index: usize,
    pub content: String,
    pub scores: Vec<DimensionScore>,
    pub overall: f64,
    /// Empty for the final permitted attempt
    pub critiques: Vec<Critique>,
    /// Aggregated report handed to the next cycle
    pub report: String,
    /// Scored strictly above every earlier attempt
    pub improved: bool,
    /// Earlier attempt whose content this one repeats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stuck_on: Option<usize>,
    pub decision: StoppingDecision,
    pub duration_secs: f64,
    pub timestamp: DateTime<Utc>,
}

/// Highest-scoring attempt of a run (earliest wins ties)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    /// None when no attempt completed
    pub attempt: Option<usize>,
    pub content: String,
    pub overall: f64,
    pub scores: Vec<DimensionScore>,
    /// No attempt could be produced at all
    pub failed: bool,
}

impl BestResult {
    /// Result of a run that produced nothing
    pub fn failed() -> Self {
        Self {
            attempt: None,
            content: String::new(),
            overall: 0.0,
            scores: Vec::new(),
            failed: true,
        }
    }

    pub fn from_attempt(attempt: &Attempt) -> Self {
        Self {
            attempt: Some(attempt.index),
            content: attempt.content.clone(),
            overall: attempt.overall,
            scores: attempt.scores.clone(),
            failed: false,
        }
    }

    pub fn from_history(history: &[Attempt]) -> Self {
        best_index(history)
            .map(|i| Self::from_attempt(&history[i]))
            .unwrap_or_else(Self::failed)
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }
}

/// Position of the highest overall score; only a strictly greater score
/// replaces an earlier one
pub fn best_index(history: &[Attempt]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, attempt) in history.iter().enumerate() {
        match best {
            Some(b) if history[b].overall >= attempt.overall => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(index: usize, overall: f64) -> Attempt {
        Attempt {
            index,
            content: format!("draft {}", index),
            scores: vec![DimensionScore::rated("relevance", overall)],
            overall,
            critiques: Vec::new(),
            report: String::new(),
            improved: false,
            stuck_on: None,
            decision: StoppingDecision::Continue,
            duration_secs: 0.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_best_is_maximum() {
        let history = vec![attempt(0, 70.0), attempt(1, 90.0), attempt(2, 85.0)];
        let best = BestResult::from_history(&history);
        assert_eq!(best.attempt, Some(1));
        assert_eq!(best.content, "draft 1");
        assert!(!best.is_failed());
    }

    #[test]
    fn test_ties_keep_earliest() {
        let history = vec![attempt(0, 80.0), attempt(1, 80.0)];
        assert_eq!(best_index(&history), Some(0));
    }

    #[test]
    fn test_empty_history_is_failed() {
        let best = BestResult::from_history(&[]);
        assert!(best.is_failed());
        assert!(best.content.is_empty());
        assert_eq!(best.overall, 0.0);
    }
}
