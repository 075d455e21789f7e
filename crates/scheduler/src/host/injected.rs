//! Deterministic host adapter for tests (spec §4.3, "Injected backend").
//!
//! Nothing here runs on a timer or an event loop: a test drives frame
//! ticks and timeout firing explicitly, which is what makes the seed
//! scenarios in spec §8 reproducible instead of racy.

use std::cell::Cell;

use super::{HostAdapter, HostCallback};

pub struct InjectedHostAdapter {
    callback: Option<HostCallback>,
    timeout_time: Option<f64>,
    frame_deadline: Cell<f64>,
}

impl InjectedHostAdapter {
    pub fn new() -> Self {
        Self { callback: None, timeout_time: None, frame_deadline: Cell::new(f64::INFINITY) }
    }

    /// Set the frame deadline the next `fire_frame` / `Deadline::time_remaining`
    /// read will see, as if a frame tick had just computed it (spec §4.3
    /// `animationTick` step 4).
    pub fn set_frame_deadline(&self, value: f64) {
        self.frame_deadline.set(value);
    }

    /// Invoke the pending callback as if frame time were available
    /// (`did_timeout = false`).
    pub fn fire_cooperative(&mut self) {
        if let Some(mut cb) = self.callback.take() {
            self.timeout_time = None;
            cb(false);
        }
    }

    /// Invoke the pending callback as if its timeout had elapsed
    /// (`did_timeout = true`), regardless of whether `timeout_time` has
    /// actually passed on whatever clock the test is using — tests assert
    /// the scheduler's own reaction to this flag, not the wall clock.
    pub fn fire_expired(&mut self) {
        if let Some(mut cb) = self.callback.take() {
            self.timeout_time = None;
            cb(true);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.callback.is_some()
    }

    pub fn pending_timeout(&self) -> Option<f64> {
        self.timeout_time
    }
}

impl Default for InjectedHostAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for InjectedHostAdapter {
    fn request_host_callback(&mut self, callback: HostCallback, absolute_timeout: f64) {
        self.callback = Some(callback);
        self.timeout_time = Some(absolute_timeout);
    }

    fn cancel_host_callback(&mut self) {
        self.callback = None;
        self.timeout_time = None;
    }

    fn frame_deadline(&self) -> f64 {
        self.frame_deadline.get()
    }
}

/// `Rc<RefCell<InjectedHostAdapter>>` wrapper so a test can hold a handle to
/// poke `fire_cooperative`/`fire_expired`/`set_frame_deadline` on the same
/// adapter instance the scheduler owns, instead of losing it behind the
/// `Box<dyn HostAdapter>` the scheduler stores internally.
#[derive(Clone)]
pub struct SharedInjectedHost(std::rc::Rc<std::cell::RefCell<InjectedHostAdapter>>);

impl SharedInjectedHost {
    pub fn new() -> Self {
        Self(std::rc::Rc::new(std::cell::RefCell::new(InjectedHostAdapter::new())))
    }

    pub fn set_frame_deadline(&self, value: f64) {
        self.0.borrow().set_frame_deadline(value);
    }

    pub fn fire_cooperative(&self) {
        self.0.borrow_mut().fire_cooperative();
    }

    pub fn fire_expired(&self) {
        self.0.borrow_mut().fire_expired();
    }

    pub fn has_pending(&self) -> bool {
        self.0.borrow().has_pending()
    }

    pub fn pending_timeout(&self) -> Option<f64> {
        self.0.borrow().pending_timeout()
    }
}

impl Default for SharedInjectedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for SharedInjectedHost {
    fn request_host_callback(&mut self, callback: HostCallback, absolute_timeout: f64) {
        self.0.borrow_mut().request_host_callback(callback, absolute_timeout);
    }

    fn cancel_host_callback(&mut self) {
        self.0.borrow_mut().cancel_host_callback();
    }

    fn frame_deadline(&self) -> f64 {
        self.0.borrow().frame_deadline()
    }
}
