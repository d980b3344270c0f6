mod attempt;
mod context;
mod error;
mod loop_runner;
mod outcome;
mod policy;

pub use attempt::{best_index, Attempt, BestResult};
pub use context::{LoopContext, DEFAULT_DIMENSIONS};
pub use error::LoopError;
pub use loop_runner::{AttemptCallback, LoopRunner};
pub use outcome::LoopOutcome;
pub use policy::{
    AttemptCheck, ProgressGuard, StoppingDecision, StoppingPolicy, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_QUALITY_THRESHOLD,
};
