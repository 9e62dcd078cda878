use std::time::{Duration, Instant};

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tokio_util::sync::CancellationToken;

/// How long to wait between slices of a retry wait before looking at the
/// cancel flag again.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Retry behaviour for the inference endpoint.
///
/// A model that is still loading is polled at a fixed interval. A rate limit
/// backs off exponentially from `rate_limit_base`, clamped to
/// `rate_limit_max`. Both share one attempt ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub loading_interval: Duration,
    pub rate_limit_base: Duration,
    pub rate_limit_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            loading_interval: Duration::from_secs(20),
            rate_limit_base: Duration::from_secs(20),
            rate_limit_max: Duration::from_secs(80),
        }
    }
}

impl RetryPolicy {
    /// Same ceiling, no waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            loading_interval: Duration::ZERO,
            rate_limit_base: Duration::ZERO,
            rate_limit_max: Duration::ZERO,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.loading_interval = interval;
        self.rate_limit_base = interval;
        self.rate_limit_max = interval.saturating_mul(4);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delays for successive rate-limited answers: doubling from the base,
    /// no jitter, never giving up on its own (the attempt ceiling does that).
    pub fn rate_limit_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.rate_limit_base)
            .with_max_interval(self.rate_limit_max)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Aborts an in-flight analysis between attempts or during a retry wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    token: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Sleeps for `total` unless the token fires first. Returns `false` when
/// cancelled.
pub fn wait_or_cancel(total: Duration, cancel: &CancelToken) -> bool {
    // A wait too long to represent only ends by cancellation.
    let deadline = Instant::now().checked_add(total);
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let slice = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return true;
                }
                (deadline - now).min(CANCEL_POLL)
            }
            None => CANCEL_POLL,
        };
        std::thread::sleep(slice);
    }
}

#[cfg(test)]
mod tests {
    use backoff::backoff::Backoff;

    use super::*;

    #[test]
    fn rate_limit_backoff_doubles_and_clamps() {
        let mut backoff = RetryPolicy::default().rate_limit_backoff();
        let delays: Vec<_> = (0..4).filter_map(|_| backoff.next_backoff()).collect();
        assert_eq!(
            delays,
            [20, 40, 80, 80].map(Duration::from_secs).to_vec()
        );
    }

    #[test]
    fn huge_intervals_saturate() {
        let policy = RetryPolicy::default().with_interval(Duration::from_secs(u64::MAX));
        assert_eq!(policy.rate_limit_max, Duration::MAX);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::immediate(0).attempts(), 1);
    }

    #[test]
    fn cancelled_wait_returns_early() {
        let token = CancelToken::new();
        token.cancel();
        let started = Instant::now();
        assert!(!wait_or_cancel(Duration::from_secs(30), &token));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn cancel_from_another_thread_interrupts_the_wait() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });
        assert!(!wait_or_cancel(Duration::MAX, &token));
        handle.join().unwrap();
    }

    #[test]
    fn uncancelled_wait_completes() {
        assert!(wait_or_cancel(Duration::from_millis(10), &CancelToken::new()));
    }
}
