//! Backoff for idempotent reads.
//!
//! Only `GET` goes through [`with_retry`]. A response with 5xx, 408 or 429 is
//! tried again after an exponentially growing pause; everything else,
//! including a failure to get any response, is handed straight back.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use ventus_core::RetrySettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Pause before the first retry; doubled for each later one
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(settings.max_retries, settings.initial_delay_ms, settings.max_delay_ms)
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, 0, 0)
    }

    /// Pause before retry number `retry` (0-based), capped at `max_delay`.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let scaled = self
            .initial_delay
            .checked_mul(1u32.checked_shl(retry).unwrap_or(u32::MAX))
            .unwrap_or(self.max_delay);
        scaled.min(self.max_delay)
    }

    /// What to do after `retries_done` retries ended with `status`.
    pub fn decide(&self, status: StatusCode, retries_done: u32) -> RetryDecision {
        if !is_retryable_status(status) {
            return RetryDecision::Done;
        }
        if retries_done >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay_for_attempt(retries_done))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Final answer from the server, good or bad
    Done,
    /// Transient status, try again after the pause
    RetryAfter(Duration),
    /// Transient status but the budget is spent
    GiveUp,
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Run `send` until the response is final or the retry budget is spent.
/// The last response is returned either way; only transport errors are `Err`.
pub async fn with_retry<F, Fut>(config: &RetryConfig, send: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut retries_done = 0;

    loop {
        let response = send().await?;
        let status = response.status();

        match config.decide(status, retries_done) {
            RetryDecision::Done => return Ok(response),
            RetryDecision::GiveUp => {
                tracing::warn!("Still {} after {} retries, giving up", status, retries_done);
                return Ok(response);
            }
            RetryDecision::RetryAfter(pause) => {
                retries_done += 1;
                tracing::info!(
                    "Got {}, retry {}/{} in {:?}",
                    status,
                    retries_done,
                    config.max_retries,
                    pause
                );
                tokio::time::sleep(pause).await;
            }
        }
    }
}
