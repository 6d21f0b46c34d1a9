use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Process-wide spacer enforcing a minimum delay between the start of two
/// outbound requests. Single-stream politeness: not per-host.
///
/// Backed by a governor token bucket with a one-token burst, so a waiter
/// is released exactly once per period.
#[derive(Clone)]
pub struct RequestSpacer {
    limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
}

impl RequestSpacer {
    /// Creates a spacer with the given minimum period. A zero period
    /// disables spacing entirely.
    pub fn new(period: Duration) -> Self {
        let limiter = Quota::with_period(period).map(|quota| {
            debug!(period_ms = period.as_millis() as u64, "request spacer enabled");
            Arc::new(RateLimiter::direct(quota))
        });
        Self { limiter }
    }

    /// Creates a spacer from the configured delay in seconds.
    pub fn from_secs_f64(delay: f64) -> Self {
        if delay.is_finite() && delay > 0.0 {
            Self::new(Duration::from_secs_f64(delay))
        } else {
            Self { limiter: None }
        }
    }

    /// Waits until the next request slot opens.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}
