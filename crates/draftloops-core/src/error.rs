use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] draftloops_oracle::OracleError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
