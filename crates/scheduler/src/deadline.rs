//! The mutable "deadline view" handed to a running callback (spec §3,
//! "Deadline view").
//!
//! A single `Deadline` is reused across every callback invocation rather
//! than allocated per call (spec §9, "Deadline view mutation"). Because
//! Rust doesn't let a closure share mutable state with its caller without
//! an explicit handle, `Deadline` holds a clone of the scheduler's `Rc`
//! instead of owning the fields directly — cloning an `Rc` is not an
//! allocation, so the "no allocation pressure" intent still holds.

use std::rc::Rc;
use std::cell::RefCell;

use crate::drain::Inner;

#[derive(Clone)]
pub struct Deadline {
    pub(crate) inner: Rc<RefCell<Inner>>,
}

impl Deadline {
    /// `max(0, frameDeadline - now)` unless a higher-priority callback has
    /// since been enqueued at the head, in which case the current callback
    /// is asked to yield immediately (spec §3's `timeRemaining()`).
    ///
    /// This is the check spec §9 calls out as a "likely source bug" in the
    /// original: `current_expiration_time` must reflect the *running*
    /// node's expiration (set in `flush_first_callback`, restored after)
    /// for this comparison to ever fire. We implement it exactly as
    /// specified and test it explicitly rather than silently "fixing" it
    /// into e.g. a priority-enum comparison.
    pub fn time_remaining(&self) -> f64 {
        let inner = self.inner.borrow();
        let higher_priority_waiting = match inner.queue.head_expiration() {
            Some(head_expiration) => head_expiration < inner.current_expiration_time,
            None => false,
        };
        if higher_priority_waiting {
            return 0.0;
        }
        let now = inner.clock.now();
        let frame_deadline = inner.host.frame_deadline();
        (frame_deadline - now).max(0.0)
    }

    /// Convenience wrapper most real callers reach for instead of
    /// re-deriving a boolean from `time_remaining()` themselves (see
    /// SPEC_FULL.md SUPPLEMENT).
    pub fn should_yield(&self) -> bool {
        self.time_remaining() <= 0.0
    }

    /// True when the current drain pass is running because the callback's
    /// deadline has already passed, not because frame time is available.
    pub fn did_timeout(&self) -> bool {
        self.inner.borrow().did_timeout
    }
}
