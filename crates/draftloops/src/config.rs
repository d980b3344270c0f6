//! Project configuration file support for draftloops.
//!
//! Loads configuration from `draftloops.toml` in the working directory.
//! Every field is optional; command-line flags take precedence.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use draftloops_critic::Role;
use draftloops_oracle::{BackendSettings, OracleConfig, OracleType, RetryPolicy};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "draftloops.toml";

/// Oracle call ceiling when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Project-level configuration loaded from `draftloops.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Quality dimensions to score
    pub dimensions: Option<Vec<String>>,
    pub max_attempts: Option<usize>,
    pub quality_threshold: Option<f64>,
    pub stop_on_repeated_content: Option<bool>,
    pub stop_on_repeated_feedback: Option<bool>,
    #[serde(default)]
    pub oracle: OracleSection,
    #[serde(default)]
    pub retry: RetrySection,
    /// Replaces the default SEO/Ethics/Style panel when non-empty
    #[serde(default)]
    pub reviewers: Vec<ReviewerConfig>,
}

/// `[oracle]` table
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OracleSection {
    /// "gemini" or "command"
    pub kind: Option<String>,
    pub model: Option<String>,
    /// Command oracle executable
    pub binary: Option<PathBuf>,
    /// Command oracle arguments placed before the prompt
    pub args: Option<Vec<String>>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub temperature: Option<f32>,
    /// Extra environment for the command oracle
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// `[retry]` table
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub base_delay: Option<Duration>,
}

/// `[[reviewers]]` entry
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReviewerConfig {
    pub name: String,
    pub instruction: String,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    pub fn oracle_kind(&self) -> Result<Option<OracleType>> {
        self.oracle
            .kind
            .as_deref()
            .map(|kind| kind.parse::<OracleType>().map_err(anyhow::Error::msg))
            .transpose()
            .with_context(|| format!("Invalid [oracle] kind in {}", CONFIG_FILE_NAME))
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            binary: self.oracle.binary.clone(),
            args: self.oracle.args.clone(),
        }
    }

    /// Per-call oracle settings; `model` overrides the configured one
    pub fn oracle_config(&self, model: Option<String>) -> OracleConfig {
        let mut config = OracleConfig::new().with_timeout(self.timeout());
        if let Some(model) = model.or_else(|| self.oracle.model.clone()) {
            config = config.with_model(model);
        }
        if let Some(temperature) = self.oracle.temperature {
            config = config.with_temperature(temperature);
        }
        for (key, value) in &self.oracle.env {
            config = config.with_env(key.clone(), value.clone());
        }
        config
    }

    /// Configured reviewer panel, if any
    pub fn reviewer_roles(&self) -> Option<Vec<Role>> {
        if self.reviewers.is_empty() {
            return None;
        }
        Some(
            self.reviewers
                .iter()
                .map(|r| Role::new(r.name.clone(), r.instruction.clone()))
                .collect(),
        )
    }

    /// Retry policy with `max_retries` overridden when given
    pub fn retry_policy(&self, max_retries: Option<u32>) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy::new(
            max_retries
                .or(self.retry.max_retries)
                .unwrap_or(defaults.max_retries),
            self.retry.base_delay.unwrap_or(defaults.base_delay),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.oracle.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), content).unwrap();
        dir
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_full_config() {
        let dir = write_config(
            r#"
dimensions = ["relevance", "clarity"]
max_attempts = 4
quality_threshold = 90.0
stop_on_repeated_feedback = true

[oracle]
kind = "command"
binary = "/usr/local/bin/llm"
args = ["-m", "local"]
timeout = "90s"
temperature = 0.7
model = "gemini-1.5-pro"

[oracle.env]
LLM_PROFILE = "drafts"

[retry]
max_retries = 2
base_delay = "500ms"

[[reviewers]]
name = "Accuracy"
instruction = "Check facts. Begin with 'Accuracy Review:'"
"#,
        );

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.dimensions.as_ref().unwrap().len(), 2);
        assert_eq!(config.max_attempts, Some(4));
        assert_eq!(config.stop_on_repeated_feedback, Some(true));
        assert_eq!(config.oracle_kind().unwrap(), Some(OracleType::Command));
        assert_eq!(config.timeout(), Duration::from_secs(90));
        assert_eq!(config.oracle.args.as_ref().unwrap()[0], "-m");

        let settings = config.backend_settings();
        assert_eq!(settings.binary, Some(PathBuf::from("/usr/local/bin/llm")));
        let oracle_config = config.oracle_config(None);
        assert_eq!(oracle_config.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(oracle_config.temperature, Some(0.7));
        assert_eq!(oracle_config.env_vars["LLM_PROFILE"], "drafts");
        assert_eq!(
            config.oracle_config(Some("local".into())).model.as_deref(),
            Some("local")
        );

        let policy = config.retry_policy(None);
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(config.retry_policy(Some(5)).max_retries, 5);

        let roles = config.reviewer_roles().unwrap();
        assert_eq!(roles[0].name, "Accuracy");
    }

    #[test]
    fn test_defaults_when_empty() {
        let dir = write_config("");
        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.oracle_kind().unwrap(), None);
        assert!(config.reviewer_roles().is_none());
        assert_eq!(config.retry_policy(None), RetryPolicy::default());
        let oracle_config = config.oracle_config(None);
        assert_eq!(oracle_config.timeout, Some(DEFAULT_TIMEOUT));
        assert!(oracle_config.model.is_none());
        assert!(oracle_config.env_vars.is_empty());
    }

    #[test]
    fn test_unknown_field_is_error() {
        let dir = write_config("max_iterations = 3\n");
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_bad_oracle_kind_is_error() {
        let dir = write_config("[oracle]\nkind = \"telepathy\"\n");
        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert!(config.oracle_kind().is_err());
    }
}
