//! Per-notifier send pacing.
//!
//! Every notifier owns one [`Throttle`]. Before each outbound request the
//! notifier calls [`Throttle::wait`], which sleeps just long enough to keep
//! consecutive requests at least `interval` apart, then [`Throttle::mark`]
//! once the request has been issued.
//!
//! A zero interval disables the wait entirely, which is what tests use.

use std::time::{Duration, Instant};

/// Default spacing between two requests of the same notifier.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(5500);

/// Minimum-interval gate for one notifier instance.
///
/// Not shared: `notify` takes `&mut self`, so calls on one instance are
/// already serialized by the borrow checker.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_send: Option<Instant>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_INTERVAL)
    }
}

impl Throttle {
    /// Create a throttle with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: None,
        }
    }

    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Time left before the next request may go out, as seen at `now`.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_send {
            Some(last) if !self.interval.is_zero() => {
                self.interval.saturating_sub(now.saturating_duration_since(last))
            }
            _ => Duration::ZERO,
        }
    }

    /// Block the current thread until the next request may go out.
    pub fn wait(&self) {
        let remaining = self.remaining(Instant::now());
        if !remaining.is_zero() {
            tracing::debug!(
                wait_ms = remaining.as_millis() as u64,
                "throttling outbound request"
            );
            std::thread::sleep(remaining);
        }
    }

    /// Record that a request was just issued.
    pub fn mark(&mut self) {
        self.last_send = Some(Instant::now());
    }

    /// Forget the last request; the next one goes out immediately.
    pub fn reset(&mut self) {
        self.last_send = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_never_waits() {
        let throttle = Throttle::default();
        assert_eq!(throttle.interval(), DEFAULT_THROTTLE_INTERVAL);
        assert_eq!(throttle.remaining(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn remaining_counts_down_from_last_send() {
        let mut throttle = Throttle::new(Duration::from_secs(10));
        throttle.mark();

        let now = Instant::now();
        let remaining = throttle.remaining(now);
        assert!(remaining > Duration::from_secs(9));
        assert!(remaining <= Duration::from_secs(10));

        let later = now + Duration::from_secs(4);
        assert!(throttle.remaining(later) <= Duration::from_secs(6));

        let much_later = now + Duration::from_secs(30);
        assert_eq!(throttle.remaining(much_later), Duration::ZERO);
    }

    #[test]
    fn zero_interval_disables_wait() {
        let mut throttle = Throttle::disabled();
        throttle.mark();
        assert_eq!(throttle.remaining(Instant::now()), Duration::ZERO);

        let start = Instant::now();
        throttle.wait();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn wait_enforces_interval() {
        let mut throttle = Throttle::new(Duration::from_millis(60));
        throttle.mark();

        let start = Instant::now();
        throttle.wait();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn set_interval_and_reset() {
        let mut throttle = Throttle::new(Duration::from_secs(60));
        throttle.mark();
        assert!(!throttle.remaining(Instant::now()).is_zero());

        throttle.reset();
        assert_eq!(throttle.remaining(Instant::now()), Duration::ZERO);

        throttle.mark();
        throttle.set_interval(Duration::ZERO);
        assert_eq!(throttle.remaining(Instant::now()), Duration::ZERO);
    }
}
