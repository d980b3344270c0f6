use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::{Completion, Oracle, OracleConfig, OracleError};

/// Retry settings for transient oracle failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first call (0 = no retry)
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each subsequent one
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Run `f`, retrying transient failures with exponential backoff
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, f: F) -> Result<T, OracleError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, OracleError>>,
{
    let mut retry = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && retry < policy.max_retries => {
                let delay = policy.delay_for(retry);
                warn!(
                    error = %e,
                    retry = retry + 1,
                    max_retries = policy.max_retries,
                    "Oracle call failed, retrying in {:?}",
                    delay
                );
                sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wraps another oracle and retries its transient failures
pub struct RetryingOracle {
    inner: Box<dyn Oracle>,
    policy: RetryPolicy,
}

impl RetryingOracle {
    pub fn new(inner: Box<dyn Oracle>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Oracle for RetryingOracle {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(
        &self,
        instruction: &str,
        prompt: &str,
        config: &OracleConfig,
    ) -> Result<Completion, OracleError> {
        with_retry(self.policy, || self.inner.send(instruction, prompt, config)).await
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }
}
