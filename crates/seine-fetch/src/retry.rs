use std::time::Duration;

/// Statuses worth retrying: throttling and transient server failures.
pub const DEFAULT_RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Retry policy consumed by the fetcher.
///
/// Expressed as a value so the engine never carries retry logic itself:
/// `total` retries after the first attempt, backing off on the listed
/// statuses and on transport errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub total: u32,
    /// Backoff seconds are `backoff_factor * 2^(retry - 1)`.
    pub backoff_factor: f64,
    /// HTTP statuses that trigger a retry.
    pub retry_on: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor: 1.0,
            retry_on: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn new(total: u32, backoff_factor: f64) -> Self {
        Self {
            total,
            backoff_factor,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, status: u16) -> bool {
        self.retry_on.contains(&status)
    }

    /// Backoff before the given retry (1-based), capped at one minute.
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let seconds = self.backoff_factor * f64::from(2u32.pow(exponent));
        if !seconds.is_finite() || seconds <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(seconds).min(MAX_BACKOFF)
    }
}
