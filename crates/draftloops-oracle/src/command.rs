use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::{Completion, Oracle, OracleConfig, OracleError, ProcessSpawner};

/// Oracle backed by a non-interactive command-line tool.
///
/// The role instruction and the prompt are joined into one trailing argument;
/// the tool's stdout is the completion.
pub struct CommandOracle {
    binary_path: PathBuf,
    base_args: Vec<String>,
}

impl CommandOracle {
    /// `claude --print`, the default command backend
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from("claude"),
            base_args: vec!["--print".to_string()],
        }
    }

    pub fn with_binary_path(path: PathBuf) -> Self {
        Self {
            binary_path: path,
            base_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    fn combined_prompt(instruction: &str, prompt: &str) -> String {
        format!("{}\n\n{}", instruction.trim(), prompt)
    }
}

impl Default for CommandOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Oracle for CommandOracle {
    fn name(&self) -> &str {
        "Command"
    }

    async fn send(
        &self,
        instruction: &str,
        prompt: &str,
        config: &OracleConfig,
    ) -> Result<Completion, OracleError> {
        let full_prompt = Self::combined_prompt(instruction, prompt);

        debug!(
            oracle = self.name(),
            binary = %self.binary_path.display(),
            prompt_len = full_prompt.len(),
            "Executing command oracle"
        );

        let mut args: Vec<&str> = self.base_args.iter().map(String::as_str).collect();
        if let Some(ref model) = config.model {
            args.push("--model");
            args.push(model);
        }
        args.push(&full_prompt);

        let output = ProcessSpawner::run(&self.binary_path, &args, config).await?;

        if !output.success() {
            return Err(OracleError::Unavailable(format!(
                "{} exited with code {}: {}",
                self.binary_path.display(),
                output.exit_code,
                output.stderr.trim()
            )));
        }

        let completion = Completion::new(output.stdout, output.duration);
        if completion.is_empty() {
            return Err(OracleError::Rejected("command produced no output".into()));
        }
        Ok(completion)
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_backend_returns_combined_prompt() {
        let oracle = CommandOracle::with_binary_path(PathBuf::from("echo"));
        let completion = oracle
            .complete("Be brief.", "Rate this.", &OracleConfig::new())
            .await
            .unwrap();
        assert_eq!(completion.text, "Be brief.\n\nRate this.\n");
    }

    #[tokio::test]
    async fn test_env_vars_reach_the_process() {
        let oracle = CommandOracle::with_binary_path(PathBuf::from("sh")).with_args(vec![
            "-c".into(),
            "printf %s \"$DRAFT_TONE\"".into(),
            "sh".into(),
        ]);
        let config = OracleConfig::new().with_env("DRAFT_TONE".into(), "formal".into());
        let completion = oracle.complete("Be brief.", "Rate this.", &config).await.unwrap();
        assert_eq!(completion.text, "formal");
    }

    #[tokio::test]
    async fn test_failing_backend_is_unavailable() {
        let oracle = CommandOracle::with_binary_path(PathBuf::from("false"));
        let err = oracle
            .complete("Be brief.", "Rate this.", &OracleConfig::new())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_spawn() {
        let oracle =
            CommandOracle::with_binary_path(PathBuf::from("/nonexistent/draftloops-oracle"));
        let err = oracle
            .complete("Be brief.", "Rate this.", &OracleConfig::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::SpawnFailed(_)));
    }
}
