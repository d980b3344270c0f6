mod panel;
mod prompts;
mod report;
mod roles;
pub mod scorer;

pub use panel::{Critique, CritiquePanel};
pub use prompts::{ReviewPrompts, WriterPrompts};
pub use report::{FeedbackReport, FINAL_VERSION_MARKER};
pub use roles::Role;
pub use scorer::{parse_rating, DimensionScore, ScoreCard, ScoreParseError, Scorer, NEUTRAL_SCORE};
