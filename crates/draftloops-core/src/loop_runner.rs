use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use draftloops_critic::{CritiquePanel, FeedbackReport, Role, Scorer, FINAL_VERSION_MARKER};
use draftloops_logging::{LogEvent, Logger};
use draftloops_oracle::{Oracle, OracleConfig};

use crate::policy::{AttemptCheck, StoppingDecision};
use crate::{Attempt, LoopContext, LoopError, LoopOutcome};

/// Called with every attempt as it is recorded
pub type AttemptCallback = Arc<dyn Fn(&Attempt) + Send + Sync>;

/// Orchestrates the generate-evaluate-refine loop
pub struct LoopRunner<'a> {
    oracle: &'a dyn Oracle,
    writer: Role,
    reviewers: Vec<Role>,
    oracle_config: OracleConfig,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
    on_attempt: Option<AttemptCallback>,
}

impl<'a> LoopRunner<'a> {
    pub fn new(oracle: &'a dyn Oracle, logger: Arc<Logger>) -> Self {
        Self {
            oracle,
            writer: Role::writer(),
            reviewers: Role::default_panel(),
            oracle_config: OracleConfig::default(),
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
            on_attempt: None,
        }
    }

    pub fn with_writer(mut self, writer: Role) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_reviewers(mut self, reviewers: Vec<Role>) -> Self {
        self.reviewers = reviewers;
        self
    }

    pub fn with_oracle_config(mut self, config: OracleConfig) -> Self {
        self.oracle_config = config;
        self
    }

    pub fn with_attempt_callback(mut self, callback: AttemptCallback) -> Self {
        self.on_attempt = Some(callback);
        self
    }

    /// Get a handle to signal interruption; checked before each attempt
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Run attempts until the stopping policy ends the loop.
    ///
    /// Oracle failures end the run with [`LoopOutcome::Failed`]; only invalid
    /// input is returned as an error. A writer rejection spends one attempt
    /// and the loop carries on while budget remains.
    pub async fn run(&self, mut context: LoopContext) -> Result<LoopOutcome, LoopError> {
        context.validate()?;

        self.logger.log(&LogEvent::LoopStarted {
            run_id: context.run_id.to_string(),
            topic: context.topic.clone(),
            dimensions: context.dimensions.clone(),
            max_attempts: context.policy.max_attempts,
            quality_threshold: context.policy.quality_threshold,
        });

        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("Loop interrupted by user");
                self.logger.log(&LogEvent::LoopInterrupted {
                    attempts: context.history.len(),
                });
                let (best, history, duration) = context.finish();
                return Ok(LoopOutcome::interrupted(best, history, duration));
            }

            let index = context.next_index();
            match self.run_attempt(&mut context).await {
                Ok(Some(decision)) if decision.is_stop() => {
                    return Ok(self.complete(decision, context))
                }
                Ok(Some(_)) => {
                    debug!(attempt = index, "Continuing to next attempt");
                }
                Ok(None) if !context.budget_spent() => {
                    debug!(attempt = index, "Retrying rejected generation");
                }
                Ok(None) if context.history.is_empty() => {
                    let error = "the writer rejected every attempt".to_string();
                    return Ok(self.fail(index, error, context));
                }
                Ok(None) => {
                    return Ok(self.complete(StoppingDecision::StopBudgetExhausted, context))
                }
                Err(e) => return Ok(self.fail(index, e.to_string(), context)),
            }
        }
    }

    fn complete(&self, decision: StoppingDecision, context: LoopContext) -> LoopOutcome {
        let best = context.best();
        self.logger.log(&LogEvent::LoopCompleted {
            attempts: context.history.len(),
            best_attempt: best.attempt,
            best_score: best.overall,
            stop_reason: decision.to_string(),
            duration_secs: context.total_duration().as_secs_f64(),
        });
        let (best, history, duration) = context.finish();
        LoopOutcome::stopped(decision, best, history, duration)
    }

    fn fail(&self, index: usize, error: String, context: LoopContext) -> LoopOutcome {
        warn!(attempt = index, error = %error, "Attempt failed");
        self.logger.log(&LogEvent::AttemptFailed {
            attempt: index,
            error: error.clone(),
        });
        let (best, history, duration) = context.finish();
        LoopOutcome::failed(index, error, best, history, duration)
    }

    /// Generate, evaluate and decide one attempt, recording it in history.
    ///
    /// Returns `None` when the writer rejected the prompt; the attempt's slot
    /// is spent and nothing is recorded.
    async fn run_attempt(
        &self,
        context: &mut LoopContext,
    ) -> Result<Option<StoppingDecision>, LoopError> {
        let index = context.next_index();
        let is_final = context.is_final_attempt();
        let started = Instant::now();

        // Generating
        let prompt = context.current_prompt();
        self.logger.log(&LogEvent::GenerationStarted {
            attempt: index,
            prompt_preview: prompt.chars().take(100).collect(),
        });

        let draft = match self
            .oracle
            .complete(&self.writer.instruction, &prompt, &self.oracle_config)
            .await
        {
            Ok(draft) => draft,
            Err(e) if e.is_rejected() => {
                let remaining = context.forfeit_attempt();
                warn!(attempt = index, error = %e, remaining, "Writer rejected the prompt");
                self.logger.log(&LogEvent::GenerationRejected {
                    attempt: index,
                    reason: e.to_string(),
                    remaining,
                });
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        self.logger.log(&LogEvent::GenerationCompleted {
            attempt: index,
            chars: draft.char_count(),
            duration_secs: draft.duration.as_secs_f64(),
        });

        // Evaluating: scorer and panel are independent, join both
        let scorer = Scorer::new(self.oracle);
        let panel = CritiquePanel::new(self.oracle, &self.reviewers);
        let critique = async {
            if is_final {
                Ok(Vec::new())
            } else {
                panel.critique(&draft.text, &self.oracle_config).await
            }
        };
        let (scores, critiques) = tokio::try_join!(
            scorer.score(&draft.text, &context.dimensions, &self.oracle_config),
            critique
        )?;

        for score in scores.defaulted() {
            self.logger.log(&LogEvent::DimensionDefaulted {
                attempt: index,
                dimension: score.dimension.clone(),
                reason: score.defaulted.clone().unwrap_or_default(),
            });
        }
        self.logger.log(&LogEvent::ScoringCompleted {
            attempt: index,
            overall: scores.overall,
            scores: scores
                .dimensions
                .iter()
                .map(|d| (d.dimension.clone(), d.value))
                .collect(),
        });

        let report = if is_final {
            self.logger.log(&LogEvent::CritiqueSkipped { attempt: index });
            FINAL_VERSION_MARKER.to_string()
        } else {
            self.logger.log(&LogEvent::CritiqueCompleted {
                attempt: index,
                roles: critiques.len(),
                rejected: critiques
                    .iter()
                    .filter(|c| c.rejected)
                    .map(|c| c.role.clone())
                    .collect(),
            });
            FeedbackReport::build(&scores, &critiques)
        };

        // Deciding
        let stuck_on = context.find_repeat(&draft.text);
        if let Some(repeats_attempt) = stuck_on {
            if context.policy.stop_on_repeated_content {
                self.logger.log(&LogEvent::NoProgress {
                    attempt: index,
                    repeats_attempt,
                });
            }
        }

        let check = AttemptCheck {
            index,
            overall: scores.overall,
            stuck_on,
            feedback_repeated: context.feedback_repeats(&critiques),
        };
        let improved = context.would_improve(scores.overall);
        let decision = context.decide(&check);

        self.logger.log(&LogEvent::AttemptDecided {
            attempt: index,
            overall: scores.overall,
            improved,
            decision: decision.to_string(),
        });

        let attempt = Attempt {
            index,
            content: draft.text,
            scores: scores.dimensions,
            overall: scores.overall,
            critiques,
            report,
            improved,
            stuck_on,
            decision,
            duration_secs: started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        };
        if let Some(ref callback) = self.on_attempt {
            callback(&attempt);
        }
        context.push_attempt(attempt);

        Ok(Some(decision))
    }
}
