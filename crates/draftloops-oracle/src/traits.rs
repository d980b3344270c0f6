use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::Completion;

/// Errors that can occur during an oracle call
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Oracle rejected the request: {0}")]
    Rejected(String),

    #[error("Failed to spawn oracle process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Oracle configuration error: {0}")]
    ConfigError(String),
}

impl OracleError {
    /// Transient faults are the only class worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, OracleError::Unavailable(_) | OracleError::Timeout(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, OracleError::Rejected(_))
    }
}

/// Per-call settings shared by every oracle backend
#[derive(Debug, Clone, Default)]
pub struct OracleConfig {
    /// Ceiling for a single call (None = backend default)
    pub timeout: Option<Duration>,
    /// Model to use (if the backend supports it)
    pub model: Option<String>,
    /// Sampling temperature (if the backend supports it)
    pub temperature: Option<f32>,
    /// Additional environment variables for process-backed oracles
    pub env_vars: HashMap<String, String>,
}

impl OracleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// Supported oracle backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleType {
    Gemini,
    Command,
}

impl std::fmt::Display for OracleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleType::Gemini => write!(f, "gemini"),
            OracleType::Command => write!(f, "command"),
        }
    }
}

impl std::str::FromStr for OracleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(OracleType::Gemini),
            "command" | "cmd" | "cli" => Ok(OracleType::Command),
            _ => Err(format!("Unknown oracle type: {}", s)),
        }
    }
}

/// A text-in/text-out completion capability driven by a role instruction
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Human-readable name of the oracle (e.g., "Gemini")
    fn name(&self) -> &str;

    /// Complete `prompt` under the given role instruction.
    ///
    /// Empty inputs are rejected locally without reaching the backend.
    async fn complete(
        &self,
        instruction: &str,
        prompt: &str,
        config: &OracleConfig,
    ) -> Result<Completion, OracleError> {
        if instruction.trim().is_empty() {
            return Err(OracleError::Rejected("empty role instruction".into()));
        }
        if prompt.trim().is_empty() {
            return Err(OracleError::Rejected("empty prompt".into()));
        }
        self.send(instruction, prompt, config).await
    }

    /// Issue one backend request (no validation, no retry)
    async fn send(
        &self,
        instruction: &str,
        prompt: &str,
        config: &OracleConfig,
    ) -> Result<Completion, OracleError>;

    /// Check whether the backend can be reached with the current setup
    async fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(OracleError::Unavailable("503".into()).is_transient());
        assert!(OracleError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!OracleError::Rejected("blocked".into()).is_transient());
        assert!(!OracleError::ConfigError("no key".into()).is_transient());
    }

    #[test]
    fn test_oracle_type_from_str() {
        assert_eq!("Gemini".parse::<OracleType>().unwrap(), OracleType::Gemini);
        assert_eq!("cli".parse::<OracleType>().unwrap(), OracleType::Command);
        assert!("gpt".parse::<OracleType>().is_err());
        assert!("scripted".parse::<OracleType>().is_err());
    }
}
