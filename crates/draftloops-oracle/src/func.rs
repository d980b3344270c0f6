use async_trait::async_trait;
use std::time::Instant;

use crate::{Completion, Oracle, OracleConfig, OracleError};

type Responder = dyn Fn(&str, &str) -> Result<String, OracleError> + Send + Sync;

/// Oracle answered by an in-process closure of `(instruction, prompt)`.
///
/// Lets loop behaviour be scripted without a network or process backend.
pub struct FnOracle {
    responder: Box<Responder>,
}

impl FnOracle {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
        }
    }
}

#[async_trait]
impl Oracle for FnOracle {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn send(
        &self,
        instruction: &str,
        prompt: &str,
        _config: &OracleConfig,
    ) -> Result<Completion, OracleError> {
        let start = Instant::now();
        let text = (self.responder)(instruction, prompt)?;
        Ok(Completion::new(text, start.elapsed()))
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_inputs_rejected_before_responder() {
        let oracle = FnOracle::new(|_, _| panic!("responder must not run"));
        let config = OracleConfig::new();
        assert!(oracle.complete("", "prompt", &config).await.unwrap_err().is_rejected());
        assert!(oracle.complete("role", "  ", &config).await.unwrap_err().is_rejected());
    }

    #[tokio::test]
    async fn test_responder_sees_instruction_and_prompt() {
        let oracle = FnOracle::new(|instruction, prompt| Ok(format!("{}|{}", instruction, prompt)));
        let completion = oracle
            .complete("writer", "topic", &OracleConfig::new())
            .await
            .unwrap();
        assert_eq!(completion.text, "writer|topic");
    }
}
