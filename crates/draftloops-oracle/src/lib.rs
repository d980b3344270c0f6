mod command;
mod func;
mod gemini;
mod output;
mod retry;
mod spawner;
mod traits;

use std::path::PathBuf;

pub use command::CommandOracle;
pub use func::FnOracle;
pub use gemini::{GeminiOracle, API_KEY_ENV};
pub use output::Completion;
pub use retry::{with_retry, RetryPolicy, RetryingOracle};
pub use spawner::{ProcessOutput, ProcessSpawner};
pub use traits::{Oracle, OracleConfig, OracleError, OracleType};

/// Backend settings read from configuration
#[derive(Debug, Clone, Default)]
pub struct BackendSettings {
    /// Command oracle executable; `claude --print` when unset
    pub binary: Option<PathBuf>,
    /// Command oracle arguments placed before the prompt
    pub args: Option<Vec<String>>,
}

/// Create an oracle backend by type.
///
/// Gemini reads its key from `GOOGLE_API_KEY`; the command settings only
/// apply to [`OracleType::Command`].
pub fn create_oracle(
    oracle_type: OracleType,
    settings: &BackendSettings,
) -> Result<Box<dyn Oracle>, OracleError> {
    match oracle_type {
        OracleType::Gemini => Ok(Box::new(GeminiOracle::from_env()?)),
        OracleType::Command => {
            let mut oracle = match settings.binary {
                Some(ref binary) => CommandOracle::with_binary_path(binary.clone()),
                None => CommandOracle::new(),
            };
            if let Some(ref args) = settings.args {
                oracle = oracle.with_args(args.clone());
            }
            Ok(Box::new(oracle))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_backend_uses_settings() {
        let settings = BackendSettings {
            binary: Some(PathBuf::from("echo")),
            args: Some(vec!["-n".into()]),
        };
        let oracle = create_oracle(OracleType::Command, &settings).unwrap();
        assert_eq!(oracle.name(), "Command");

        let completion = oracle
            .complete("Be brief.", "Rate this.", &OracleConfig::new())
            .await
            .unwrap();
        assert_eq!(completion.text, "Be brief.\n\nRate this.");
    }
}
