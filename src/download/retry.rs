//! Retry policy for mirror fetches and remote reads.
//!
//! A mirror is retried a bounded number of times before the downloader moves
//! on to the next one. Every failed attempt is kept so the final error can
//! say what went wrong instead of swallowing it.

use crate::error::FetchError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

const DEFAULT_ATTEMPTS_PER_MIRROR: u32 = 1;
const DEFAULT_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// How many times to try one source and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per mirror (and per remote read); zero is treated as one
    pub attempts_per_mirror: u32,
    /// Wait before the first retry
    pub delay: Duration,
    /// Multiplier applied to the wait after each retry
    pub factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts_per_mirror: DEFAULT_ATTEMPTS_PER_MIRROR,
            delay: DEFAULT_DELAY,
            factor: 2.0,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts_per_mirror: u32, delay: Duration) -> Self {
        Self {
            attempts_per_mirror,
            delay,
            ..Self::default()
        }
    }

    /// One attempt, no waiting.
    #[must_use]
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts_per_mirror.max(1)
    }

    /// Wait to apply after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        self.delay
            .mul_f64(self.factor.max(1.0).powi(exponent))
            .min(self.max_delay)
    }
}

/// One failed attempt against one mirror
#[derive(Debug)]
pub struct MirrorFailure {
    pub mirror: Url,
    /// 1-based attempt number on this mirror
    pub attempt: u32,
    pub error: FetchError,
}

impl fmt::Display for MirrorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (attempt {}): {}", self.mirror, self.attempt, self.error)
    }
}

/// Run `operation` until it succeeds or the policy's attempts run out.
///
/// Returns the last error on exhaustion.
pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("Operation '{}' succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}",
                    operation_name, attempt, attempts, err, delay
                );
                sleep(delay).await;
            }
        }
    }
}
