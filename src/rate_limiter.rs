//! Outbound request pacing for the remote metadata service.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;

/// Minimum spacing between two IGDB requests.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(330);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Blocks callers so consecutive remote calls respect a minimum spacing.
pub trait Throttle: Send + Sync {
    fn wait(&self);
}

/// GCRA-backed throttle allowing one request per interval with no burst.
///
/// Every `wait()` blocks for at least the interval, including the first one
/// after an idle period, so the untracked call preceding it gets a gap too.
pub struct RequestThrottle {
    interval: Duration,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RequestThrottle {
    /// Creates a throttle spacing requests by `interval` (clamped to >= 1ms).
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let quota = Quota::with_period(interval)
            .expect("non-zero throttle period")
            .allow_burst(NonZeroU32::MIN);
        Self {
            interval,
            limiter: RateLimiter::direct(quota),
        }
    }

    #[cfg(test)]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}

impl Throttle for RequestThrottle {
    fn wait(&self) {
        debug!("Throttle: waiting {:?} before next request", self.interval);
        std::thread::sleep(self.interval);
        while self.limiter.check().is_err() {
            std::thread::sleep(POLL_INTERVAL.min(self.interval));
        }
    }
}
