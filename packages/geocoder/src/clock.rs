//! Time abstraction for the rate limiter.
//!
//! The limiter needs a monotonic "now" and a way to sleep. Production
//! uses the tokio clock; tests use [`ManualClock`] so pacing is asserted
//! without real waiting.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Monotonic time source with an async sleep.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Sleeps for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// The real clock: `Instant::now` plus `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// A clock that only moves when slept on. Records every sleep so tests
/// can assert the pacing behavior.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a clock frozen at an arbitrary base instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Advances the clock without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap_or_else(std::sync::PoisonError::into_inner) += duration;
    }

    /// Every duration passed to [`Clock::sleep`] so far.
    #[must_use]
    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base
            + *self
                .offset
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        {
            let mut offset = self
                .offset
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *offset += duration;
        }
        self.sleeps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(duration);
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();

        futures_block(clock.sleep(Duration::from_secs(2)));

        assert_eq!(clock.now() - start, Duration::from_secs(2));
        assert_eq!(clock.recorded_sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn manual_clock_advance_does_not_record() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(500));
        assert!(clock.recorded_sleeps().is_empty());
    }

    /// Drives a ready future to completion without a runtime.
    fn futures_block<F: Future>(future: F) -> F::Output {
        let mut future = std::pin::pin!(future);
        let waker = std::task::Waker::noop();
        let mut cx = std::task::Context::from_waker(waker);
        match future.as_mut().poll(&mut cx) {
            std::task::Poll::Ready(out) => out,
            std::task::Poll::Pending => unreachable!("manual clock sleeps are ready"),
        }
    }
}
