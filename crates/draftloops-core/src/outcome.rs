use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Attempt, BestResult, StoppingDecision};

/// The final outcome of a refinement loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// An attempt reached the quality threshold
    QualityMet {
        best: BestResult,
        history: Vec<Attempt>,
        total_duration_secs: f64,
    },
    /// Ran out of attempts (or stopped making progress)
    BudgetExhausted {
        best: BestResult,
        history: Vec<Attempt>,
        total_duration_secs: f64,
    },
    /// Reviewers repeated themselves
    FeedbackConverged {
        best: BestResult,
        history: Vec<Attempt>,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    UserInterrupted {
        best: BestResult,
        history: Vec<Attempt>,
        total_duration_secs: f64,
    },
    /// An attempt could not be completed
    Failed {
        attempt: usize,
        error: String,
        best: BestResult,
        history: Vec<Attempt>,
        total_duration_secs: f64,
    },
}

impl LoopOutcome {
    /// Outcome for a stopping decision; `Continue` never ends a loop
    pub fn stopped(
        decision: StoppingDecision,
        best: BestResult,
        history: Vec<Attempt>,
        duration: Duration,
    ) -> Self {
        let total_duration_secs = duration.as_secs_f64();
        match decision {
            StoppingDecision::StopQualityMet => Self::QualityMet {
                best,
                history,
                total_duration_secs,
            },
            StoppingDecision::StopFeedbackConverged => Self::FeedbackConverged {
                best,
                history,
                total_duration_secs,
            },
            StoppingDecision::StopBudgetExhausted | StoppingDecision::Continue => {
                Self::BudgetExhausted {
                    best,
                    history,
                    total_duration_secs,
                }
            }
        }
    }

    pub fn interrupted(best: BestResult, history: Vec<Attempt>, duration: Duration) -> Self {
        Self::UserInterrupted {
            best,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(
        attempt: usize,
        error: String,
        best: BestResult,
        history: Vec<Attempt>,
        duration: Duration,
    ) -> Self {
        Self::Failed {
            attempt,
            error,
            best,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn best(&self) -> &BestResult {
        match self {
            Self::QualityMet { best, .. }
            | Self::BudgetExhausted { best, .. }
            | Self::FeedbackConverged { best, .. }
            | Self::UserInterrupted { best, .. }
            | Self::Failed { best, .. } => best,
        }
    }

    pub fn history(&self) -> &[Attempt] {
        match self {
            Self::QualityMet { history, .. }
            | Self::BudgetExhausted { history, .. }
            | Self::FeedbackConverged { history, .. }
            | Self::UserInterrupted { history, .. }
            | Self::Failed { history, .. } => history,
        }
    }

    pub fn total_duration_secs(&self) -> f64 {
        match self {
            Self::QualityMet {
                total_duration_secs,
                ..
            }
            | Self::BudgetExhausted {
                total_duration_secs,
                ..
            }
            | Self::FeedbackConverged {
                total_duration_secs,
                ..
            }
            | Self::UserInterrupted {
                total_duration_secs,
                ..
            }
            | Self::Failed {
                total_duration_secs,
                ..
            } => *total_duration_secs,
        }
    }

    pub fn attempts(&self) -> usize {
        self.history().len()
    }

    /// Snake-case label used in logs and session files
    pub fn status(&self) -> &'static str {
        match self {
            Self::QualityMet { .. } => "quality_met",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::FeedbackConverged { .. } => "feedback_converged",
            Self::UserInterrupted { .. } => "user_interrupted",
            Self::Failed { .. } => "failed",
        }
    }

    /// The last attempt repeated earlier content
    pub fn no_progress(&self) -> bool {
        self.history()
            .last()
            .is_some_and(|attempt| attempt.stuck_on.is_some())
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::QualityMet { .. } | Self::FeedbackConverged { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::QualityMet { .. } | Self::FeedbackConverged { .. } => 0,
            Self::BudgetExhausted { .. } => 1,
            Self::UserInterrupted { .. } => 130,
            Self::Failed { .. } => 2,
        }
    }
}
