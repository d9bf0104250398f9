//! Bounded retry with exponential backoff for transient source errors.
//!
//! Only errors classified transient (timeouts, connection resets, decode
//! failures) are retried; query syntax and auth errors propagate
//! immediately to the collector's failure path.

use std::future::Future;
use std::time::Duration;

use engine_core::{Error, Result};
use telemetry::metrics;
use tracing::warn;

/// Retry policy for event log queries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per attempt after that.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Runs `op`, retrying transient failures with exponential backoff.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = self.base_backoff * 2u32.pow(attempt - 1);
                warn!(
                    op = op_name,
                    attempt = attempt,
                    backoff_ms = %backoff.as_millis(),
                    "Retrying transient source error"
                );
                metrics().query_retries.inc();
                tokio::time::sleep(backoff).await;
            }

            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::internal(format!("{}: retry exhausted with no error", op_name))))
    }
}
