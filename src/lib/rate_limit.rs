//! Minimum-interval throttling of calls to a shared remote service.
//!
//! The remote prediction service has a presumed per-minute quota, so calls issued without a
//! local executable are spaced at least [`RateLimiter::interval`] apart. The limiter is a
//! plain object owning its lock; it is created once per run and shared by reference with
//! every worker.
//!
//! Spacing is strictly serialised: a caller reserves the next free start slot while holding
//! the lock, so two workers can never both observe a stale timestamp and start within the
//! same window. Sleeping happens outside the lock. After the call finishes,
//! [`RateLimiter::record_completion`] pushes the timestamp forward to the completion time, so
//! for sequential calls the interval is measured from the end of one call to the start of
//! the next.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Longest single sleep while waiting, so cancellation is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Shared flag telling workers that the run is already doomed.
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals every holder of this token to stop starting new work.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration`, waking early if cancelled.
    ///
    /// Returns false if the sleep was cut short by cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// Enforces a minimum interval between throttled calls.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_invocation: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter that spaces calls at least `interval` apart.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_invocation: Mutex::new(None) }
    }

    /// A limiter that never waits.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The minimum spacing between calls.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserves the next start slot and returns how long the caller must wait for it.
    ///
    /// The first call never waits.
    pub fn reserve(&self) -> Duration {
        let mut last = self.last_invocation.lock();
        let now = Instant::now();
        let start = match *last {
            Some(previous) => (previous + self.interval).max(now),
            None => now,
        };
        *last = Some(start);
        start - now
    }

    /// Waits for the next start slot.
    ///
    /// Returns false if the wait was interrupted by `cancel`.
    pub fn acquire(&self, cancel: &CancellationToken) -> bool {
        let wait = self.reserve();
        if wait.is_zero() {
            return !cancel.is_cancelled();
        }
        log::debug!("Waiting {:.1}s before the next prediction request", wait.as_secs_f64());
        cancel.sleep(wait)
    }

    /// Records that a throttled call has finished.
    pub fn record_completion(&self) {
        let mut last = self.last_invocation.lock();
        let now = Instant::now();
        *last = Some(last.map_or(now, |reserved| reserved.max(now)));
    }
}
