/*!
 * Bounded retry with exponential backoff for backend calls.
 *
 * Only transient failures (rate limits, connection problems, 5xx) are
 * retried; permanent failures (auth, malformed requests) propagate
 * immediately. Exhausting the attempt budget surfaces the last error to
 * the caller, which contains it at the unit boundary.
 */

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::errors::ProviderError;

/// Default number of attempts per operation
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base backoff between attempts
const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;

/// Executor wrapping a backend call with bounded retry
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    /// Maximum number of attempts, including the first
    max_attempts: u32,
    /// Base backoff duration, doubled after each failed attempt
    backoff_base: Duration,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(DEFAULT_BACKOFF_BASE_MS))
    }
}

impl RetryExecutor {
    /// Create an executor with the given attempt budget and base backoff
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Run `operation`, retrying transient failures with exponential backoff.
    ///
    /// The operation is a factory so each attempt issues a fresh call.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let backoff = self.backoff_base * (1u32 << (attempt - 1));
                    warn!(
                        "Transient backend error (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.max_attempts, backoff, e
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
