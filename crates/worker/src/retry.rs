//! Fixed-delay retry policy applied uniformly to every pipeline task.

use std::future::Future;
use std::time::Duration;

use pipeline_core::Result;
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::warn;

/// How many times a failed task is retried and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Delay between attempts in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

fn default_retries() -> u32 {
    2
}

fn default_delay_secs() -> u64 {
    300 // 5 minutes
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RetryPolicy {
    /// No retries, no delay.
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay_secs: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }
}

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// Returns the last result together with the number of attempts made.
pub async fn run_with_retry<T, F, Fut>(task: &str, policy: &RetryPolicy, mut op: F) -> (Result<T>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return (Ok(value), attempt),
            Err(e) if attempt < policy.max_attempts() => {
                warn!(
                    task = task,
                    attempt = attempt,
                    max_attempts = policy.max_attempts(),
                    delay_secs = policy.delay_secs,
                    error = %e,
                    "Task failed, retrying"
                );
                metrics().task_retries.inc();
                tokio::time::sleep(policy.delay()).await;
                attempt += 1;
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}
