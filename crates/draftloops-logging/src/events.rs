use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the refinement loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        run_id: String,
        topic: String,
        dimensions: Vec<String>,
        max_attempts: usize,
        quality_threshold: f64,
    },
    GenerationStarted {
        attempt: usize,
        prompt_preview: String,
    },
    GenerationCompleted {
        attempt: usize,
        chars: usize,
        duration_secs: f64,
    },
    /// The writer refused to produce content; the attempt slot is spent
    GenerationRejected {
        attempt: usize,
        reason: String,
        remaining: usize,
    },
    DimensionDefaulted {
        attempt: usize,
        dimension: String,
        reason: String,
    },
    ScoringCompleted {
        attempt: usize,
        overall: f64,
        scores: Vec<(String, f64)>,
    },
    CritiqueCompleted {
        attempt: usize,
        roles: usize,
        rejected: Vec<String>,
    },
    /// The last permitted attempt is not critiqued
    CritiqueSkipped {
        attempt: usize,
    },
    NoProgress {
        attempt: usize,
        repeats_attempt: usize,
    },
    AttemptDecided {
        attempt: usize,
        overall: f64,
        improved: bool,
        decision: String,
    },
    AttemptFailed {
        attempt: usize,
        error: String,
    },
    LoopInterrupted {
        attempts: usize,
    },
    LoopCompleted {
        attempts: usize,
        best_attempt: Option<usize>,
        best_score: f64,
        stop_reason: String,
        duration_secs: f64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

const RULE_WIDTH: usize = 69;

/// Logger for loop events - console output plus optional JSON-lines file
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
    quiet: bool,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
            quiet: false,
        }
    }

    /// A logger that writes nothing to the console
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Compact,
            file_writer: None,
            quiet: true,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
            quiet: false,
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", event.with_timestamp());
            }
        }

        if self.quiet {
            return;
        }

        let line = match self.format {
            LogFormat::Json => serde_json::to_string(event).ok(),
            LogFormat::Pretty => Self::render_pretty(event),
            LogFormat::Compact => Self::render_compact(event),
        };
        if let Some(line) = line {
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    fn render_pretty(event: &LogEvent) -> Option<String> {
        let text = match event {
            LogEvent::LoopStarted {
                topic,
                dimensions,
                max_attempts,
                quality_threshold,
                ..
            } => {
                let top = format!("╭{}╮", "─".repeat(RULE_WIDTH));
                let bottom = format!("╰{}╯", "─".repeat(RULE_WIDTH));
                format!(
                    "\n{}\n{}  {}\n{}  {} {}\n{}  {} {}  {} {}  {} {}\n{}\n",
                    top.bright_blue(),
                    "│".bright_blue(),
                    "draftloops".bold().bright_white(),
                    "│".bright_blue(),
                    "Topic:".dimmed(),
                    truncate(topic, 58).dimmed(),
                    "│".bright_blue(),
                    "Dimensions:".dimmed(),
                    dimensions.join(", ").dimmed(),
                    "Budget:".dimmed(),
                    max_attempts,
                    "Target:".dimmed(),
                    quality_threshold,
                    bottom.bright_blue()
                )
            }
            LogEvent::GenerationStarted { attempt, .. } => {
                let label = format!("─ Attempt {} ", attempt + 1);
                let padding = "─".repeat(RULE_WIDTH.saturating_sub(label.chars().count()));
                format!(
                    "{}{}{}\n\n  {} {}",
                    "┌".bright_blue(),
                    label.bright_blue().bold(),
                    padding.bright_blue(),
                    "▶".bright_cyan(),
                    "WRITER".bright_cyan().bold()
                )
            }
            LogEvent::GenerationCompleted {
                chars,
                duration_secs,
                ..
            } => format!(
                "    {} {} chars ({:.1}s)\n\n  {} {}",
                "✓".bright_green(),
                chars,
                duration_secs,
                "▶".bright_magenta(),
                "EVALUATION".bright_magenta().bold()
            ),
            LogEvent::GenerationRejected {
                reason, remaining, ..
            } => format!(
                "    {} Writer rejected the prompt: {} ({} attempt(s) left)\n\n{}\n",
                "⚠".bright_yellow(),
                reason.bright_yellow(),
                remaining,
                format!("└{}┘", "─".repeat(RULE_WIDTH)).bright_blue()
            ),
            LogEvent::DimensionDefaulted {
                dimension, reason, ..
            } => format!(
                "    {} {} defaulted to 50 ({})",
                "⚠".bright_yellow(),
                dimension,
                reason.dimmed()
            ),
            LogEvent::ScoringCompleted {
                overall, scores, ..
            } => {
                let parts: Vec<String> = scores
                    .iter()
                    .map(|(name, value)| format!("{} {:.0}", name, value))
                    .collect();
                format!(
                    "    {} {}  {} {:.1}",
                    "Scores:".dimmed(),
                    parts.join(" · "),
                    "overall".bold(),
                    overall
                )
            }
            LogEvent::CritiqueCompleted {
                roles, rejected, ..
            } => {
                if rejected.is_empty() {
                    format!("    {} {} reviews", "✓".bright_green(), roles)
                } else {
                    format!(
                        "    {} {} reviews, rejected: {}",
                        "⚠".bright_yellow(),
                        roles,
                        rejected.join(", ").bright_yellow()
                    )
                }
            }
            LogEvent::CritiqueSkipped { .. } => {
                format!("    {}", "Final attempt, reviews skipped".dimmed())
            }
            LogEvent::NoProgress {
                repeats_attempt, ..
            } => format!(
                "    {} Content unchanged from attempt {}",
                "⚠".bright_yellow(),
                repeats_attempt + 1
            ),
            LogEvent::AttemptDecided {
                decision, improved, ..
            } => {
                let marker = if *improved { " (new best)" } else { "" };
                let styled = if decision.starts_with("stop") {
                    format!("■ Decision: {}{}", decision, marker).bright_green()
                } else {
                    format!("→ Decision: {}{}", decision, marker).bright_yellow()
                };
                format!(
                    "    {}\n\n{}\n",
                    styled,
                    format!("└{}┘", "─".repeat(RULE_WIDTH)).bright_blue()
                )
            }
            LogEvent::AttemptFailed { attempt, error } => format!(
                "\n{} Attempt {} failed: {}",
                "✗".bright_red(),
                attempt + 1,
                error.bright_red()
            ),
            LogEvent::LoopInterrupted { attempts } => format!(
                "\n{} Interrupted after {} attempt(s)",
                "⚠".bright_yellow(),
                attempts
            ),
            // Printed by the binary's final summary instead
            LogEvent::LoopCompleted { .. } => return None,
        };
        Some(text)
    }

    fn render_compact(event: &LogEvent) -> Option<String> {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::LoopStarted { topic, .. } => format!("loop:start {}", truncate(topic, 60)),
            LogEvent::GenerationStarted { attempt, .. } => format!("writer:start:{}", attempt + 1),
            LogEvent::GenerationCompleted {
                attempt,
                chars,
                duration_secs,
            } => format!(
                "writer:done:{} chars={} {:.1}s",
                attempt + 1,
                chars,
                duration_secs
            ),
            LogEvent::GenerationRejected {
                attempt, remaining, ..
            } => format!("writer:rejected:{} remaining={}", attempt + 1, remaining),
            LogEvent::DimensionDefaulted {
                attempt, dimension, ..
            } => format!("score:default:{} {}", attempt + 1, dimension),
            LogEvent::ScoringCompleted {
                attempt, overall, ..
            } => format!("score:done:{} overall={:.1}", attempt + 1, overall),
            LogEvent::CritiqueCompleted {
                attempt, rejected, ..
            } => format!("critique:done:{} rejected={}", attempt + 1, rejected.len()),
            LogEvent::CritiqueSkipped { attempt } => format!("critique:skip:{}", attempt + 1),
            LogEvent::NoProgress {
                attempt,
                repeats_attempt,
            } => format!("stuck:{} repeats={}", attempt + 1, repeats_attempt + 1),
            LogEvent::AttemptDecided {
                attempt, decision, ..
            } => format!("decide:{} {}", attempt + 1, decision),
            LogEvent::AttemptFailed { attempt, error } => {
                format!("error:{}:{}", attempt + 1, error)
            }
            LogEvent::LoopInterrupted { attempts } => format!("loop:interrupted:{}", attempts),
            LogEvent::LoopCompleted {
                attempts,
                best_score,
                stop_reason,
                duration_secs,
                ..
            } => format!(
                "loop:done:{} best={:.1} {} {:.1}s",
                attempts, best_score, stop_reason, duration_secs
            ),
        };
        Some(format!("[{}] {}", timestamp, msg))
    }
}

/// Truncate on a char boundary, appending an ellipsis when shortened
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::AttemptDecided {
            attempt: 1,
            overall: 90.0,
            improved: true,
            decision: "continue".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "attempt_decided");
        assert_eq!(json["improved"], true);
    }

    #[test]
    fn test_file_lines_are_timestamped_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.jsonl");
        let logger = Logger::with_file(LogFormat::Json, &path).unwrap();
        logger.log(&LogEvent::CritiqueSkipped { attempt: 2 });

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["event"], "critique_skipped");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_loop_completed_has_no_pretty_line() {
        let event = LogEvent::LoopCompleted {
            attempts: 3,
            best_attempt: Some(1),
            best_score: 90.0,
            stop_reason: "stop_budget_exhausted".into(),
            duration_secs: 1.0,
        };
        assert!(Logger::render_pretty(&event).is_none());
        assert!(Logger::render_compact(&event).unwrap().contains("best=90.0"));
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
