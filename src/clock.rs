//! Clock hooks decoupling the scheduler from the wall clock.
//!
//! A `Clock` is nothing but the two functions the run loop needs: read the
//! current instant, and block for a duration. The default wiring uses the
//! real wall clock; tests and simulations inject their own pair, usually
//! through a shared `ManualClock`.
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

/// Current-time function injected into a scheduler.
pub type NowFn = Box<dyn Fn() -> Instant + Send + Sync>;
/// Blocking-wait function injected into a scheduler.
pub type SleepFn = Box<dyn Fn(Duration) + Send + Sync>;

/// The pair of time functions a scheduler runs against.
pub struct Clock {
    now: NowFn,
    sleep: SleepFn,
}

impl Clock {
    /// Real wall clock, backed by `Instant::now` and `thread::sleep`.
    pub fn wall() -> Self {
        Self {
            now: Box::new(Instant::now),
            sleep: Box::new(thread::sleep),
        }
    }

    /// Clock from arbitrary `now`/`sleep` hooks.
    pub fn from_hooks<N, S>(now: N, sleep: S) -> Self
    where
        N: Fn() -> Instant + Send + Sync + 'static,
        S: Fn(Duration) + Send + Sync + 'static,
    {
        Self {
            now: Box::new(now),
            sleep: Box::new(sleep),
        }
    }

    /// Read the current instant.
    pub fn now(&self) -> Instant {
        (self.now)()
    }

    /// Block for `d` according to this clock.
    pub fn sleep(&self, d: Duration) {
        (self.sleep)(d)
    }
}

/// A hand-driven clock for deterministic tests.
///
/// Cloned handles share the same instant. `hooks` yields a `(now, sleep)`
/// pair whose sleep advances the clock by the requested duration instead of
/// blocking, so a run loop "waits" by jumping straight to the due time.
#[derive(Clone)]
pub struct ManualClock {
    instant: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Manual clock frozen at `start` until advanced.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            instant: Arc::new(Mutex::new(start)),
        }
    }

    /// Current simulated instant.
    pub fn now(&self) -> Instant {
        *self.instant.lock()
    }

    /// Move the clock forward by `d`.
    pub fn advance(&self, d: Duration) {
        *self.instant.lock() += d;
    }

    /// `now`/`sleep` hook pair driving this clock.
    pub fn hooks(
        &self,
    ) -> (
        impl Fn() -> Instant + Send + Sync + 'static,
        impl Fn(Duration) + Send + Sync + 'static,
    ) {
        let reader = self.clone();
        let sleeper = self.clone();
        (move || reader.now(), move |d| sleeper.advance(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_shares_time_across_clones() {
        let clock = ManualClock::starting_at(Instant::now());
        let other = clock.clone();
        let before = other.now();

        clock.advance(Duration::from_secs(3));
        assert_eq!(other.now(), before + Duration::from_secs(3));
    }

    #[test]
    fn manual_hooks_sleep_by_advancing() {
        let clock = ManualClock::starting_at(Instant::now());
        let (now, sleep) = clock.hooks();
        let t0 = now();

        sleep(Duration::from_millis(250));
        assert_eq!(now(), t0 + Duration::from_millis(250));
        assert_eq!(clock.now(), t0 + Duration::from_millis(250));
    }

    #[test]
    fn wall_clock_moves_forward() {
        let clock = Clock::wall();
        let before = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now() >= before + Duration::from_millis(5));
    }
}
