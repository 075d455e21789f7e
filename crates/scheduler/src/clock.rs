//! Monotonic time source for the scheduler.
//!
//! The scheduler never calls `Instant::now()` or `Performance::now()`
//! directly; everything reads through a [`Clock`] so tests can substitute a
//! [`ManualClock`] and get fully deterministic frame math.

use std::cell::Cell;
use std::time::Instant;

/// A source of monotonically non-decreasing milliseconds.
///
/// All timestamps returned by a single `Clock` share the same origin, but
/// nothing in the scheduler assumes that origin is the Unix epoch — only
/// that `now()` never goes backwards.
pub trait Clock {
    fn now(&self) -> f64;
}

/// `std::time::Instant`-backed clock used on every non-wasm target.
///
/// `Copy` because `Instant` is: cloning just copies the origin snapshot, so
/// a clone reports the same timeline as the original rather than starting
/// its own — useful when a host adapter needs its own `Clock` handle that
/// still agrees with the scheduler's.
#[derive(Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// `web_sys::Performance::now()`-backed clock, used on wasm32 where
/// `Instant::now()` panics without extra shims.
#[cfg(target_arch = "wasm32")]
pub struct PerformanceClock {
    performance: web_sys::Performance,
}

#[cfg(target_arch = "wasm32")]
impl PerformanceClock {
    pub fn new() -> Self {
        let performance = web_sys::window()
            .and_then(|w| w.performance())
            .expect("host has no Performance API");
        Self { performance }
    }
}

#[cfg(target_arch = "wasm32")]
impl Clock for PerformanceClock {
    fn now(&self) -> f64 {
        self.performance.now()
    }
}

/// Deterministic clock for tests and for embedding hosts that drive the
/// scheduler from their own tick source instead of a wall clock.
///
/// Time only moves when [`ManualClock::advance`] or [`ManualClock::set`] is
/// called — nothing in the scheduler advances it implicitly.
#[derive(Clone)]
pub struct ManualClock {
    now: std::rc::Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: std::rc::Rc::new(Cell::new(0.0)) }
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }

    pub fn set(&self, value_ms: f64) {
        self.now.set(value_ms);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_told() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), 0.0);
        clock.advance(10.0);
        assert_eq!(clock.now(), 10.0);
        clock.set(100.0);
        assert_eq!(clock.now(), 100.0);
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
