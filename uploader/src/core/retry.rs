//! Bounded exponential backoff for platform calls

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::SubmissionSettings;
use crate::types::PlatformFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&SubmissionSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &SubmissionSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }

    /// Policy that retries without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay before the next attempt, or `None` when the failure is final
    pub fn should_retry(&self, failure: &PlatformFailure, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts || !failure.is_transient() {
            return None;
        }
        Some(self.backoff_for(attempt))
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    ///
    /// The closure receives the 1-based attempt number so callers can look
    /// for a remotely-completed create before trying again.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, PlatformFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, PlatformFailure>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(failure) => match self.should_retry(&failure, attempt) {
                    Some(delay) => {
                        warn!(
                            "{} failed (attempt {}/{}): {}; retrying in {:?}",
                            what, attempt, self.max_attempts, failure, delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(failure),
                },
            }
        }
    }
}
