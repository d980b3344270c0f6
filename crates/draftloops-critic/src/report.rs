use std::fmt::Write;

use crate::{Critique, ScoreCard};

/// Report recorded for the last permitted attempt, which no later cycle reads
pub const FINAL_VERSION_MARKER: &str = "Final version, no further feedback.";

/// Builds the refinement guidance handed to the next generation cycle
pub struct FeedbackReport;

impl FeedbackReport {
    /// Merge scores and critiques into one markdown document.
    ///
    /// Feedback is copied verbatim; nothing is summarized or truncated.
    pub fn build(scores: &ScoreCard, critiques: &[Critique]) -> String {
        let mut report = String::from("# Evaluation Report\n\n## Scores\n\n");
        report.push_str("| Dimension | Score |\n|---|---|\n");
        for score in &scores.dimensions {
            let _ = write!(report, "| {} | {:.1}", score.dimension, score.value);
            if score.is_defaulted() {
                report.push_str(" (default)");
            }
            report.push_str(" |\n");
        }
        let _ = writeln!(report, "\n**Overall:** {:.1}", scores.overall);

        for critique in critiques {
            let _ = write!(report, "\n## {}\n", critique.role);
            if !critique.feedback.is_empty() {
                let _ = writeln!(report, "\n{}", critique.feedback);
            }
        }
        report
    }
}
