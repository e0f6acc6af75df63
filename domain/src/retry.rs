//! Exponential backoff retry for Google API calls.
//!
//! Retries only failures the error taxonomy marks retryable, with
//! exponentially increasing jittered delays, capped at a maximum. A server
//! that names its own wait through Retry-After gets listened to.

use crate::error::Error;
use log::*;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a retry policy allowing `max_retries` attempts after the first.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Calculate exponential backoff delay.
    fn exponential_delay(&self, n_attempts: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * 2_f64.powi(n_attempts as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Exponential delay spread over a +/-25% band so simultaneous clients
    /// don't retry in lockstep.
    fn jittered_delay(&self, n_attempts: u32) -> Duration {
        let factor = rand::thread_rng().gen_range(0.75..=1.25);
        let delay = self.exponential_delay(n_attempts).as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before the next attempt, preferring the server's explicit wait
    /// when the error carries one.
    pub fn delay_for(&self, error: &Error, n_past_retries: u32) -> Duration {
        match error.retry_after() {
            Some(wait) => wait.min(self.max_delay),
            None => self.jittered_delay(n_past_retries),
        }
    }
}

/// Runs `operation` until it succeeds, fails unretryably, or exhausts the
/// policy. The last error is returned as-is.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut past_retries = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && past_retries < policy.max_retries => {
                let delay = policy.delay_for(&e, past_retries);
                warn!(
                    "Retryable failure, waiting {delay:?} (retry {} of {}): {e}",
                    past_retries + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
                past_retries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
