//! # frame-scheduler
//!
//! A cooperative, priority-aware task scheduler that time-slices work
//! against a host's frame cadence. It is the engine behind interleaving
//! many small units of work with a host's paint pipeline: each frame it
//! consumes whatever portion of the frame budget remains after layout and
//! paint, runs as many queued callbacks as fit, and defers the rest to
//! later frames. A callback whose deadline has already passed runs
//! synchronously, regardless of remaining frame time.
//!
//! The four pieces are a priority-ordered callback queue ([`node`]), a
//! priority/deadline policy ([`priority`]), a pluggable host adapter
//! ([`host`]) with browser, native, and injected-for-tests backends, and
//! the drain loop ([`drain`]) that ties them together. [`Scheduler`] is
//! the public handle; everything else is an implementation detail reached
//! through it.
//!
//! Building and diffing a UI tree, context plumbing, and component base
//! classes are explicitly out of scope here — this crate only knows how
//! to run callbacks on time, not what they do.

pub mod clock;
pub mod config;
pub mod deadline;
mod drain;
pub mod error;
pub mod host;
pub mod node;
pub mod pool;
pub mod priority;

use std::cell::RefCell;
use std::rc::Rc;

pub use clock::{Clock, ManualClock, MonotonicClock};
#[cfg(target_arch = "wasm32")]
pub use clock::PerformanceClock;
pub use config::{PriorityTimeouts, SchedulerConfig};
pub use deadline::Deadline;
pub use error::SchedulerError;
#[cfg(target_arch = "wasm32")]
pub use host::browser::BrowserHostAdapter;
pub use host::injected::SharedInjectedHost;
pub use host::native::{NativeHostAdapter, SharedNativeHost};
pub use host::HostAdapter;
pub use node::{Callback, Continuation, NodeHandle};
pub use priority::Priority;

use drain::Inner;

/// `Scheduler` is a cheap-to-clone handle (an `Rc` underneath) around the
/// process-wide scheduler state described in spec §3. Cloning shares the
/// same queue and host adapter; it does not create an independent
/// scheduler. Use one `Scheduler` per host execution context, or per test,
/// rather than a process-global `static` — embedding hosts that want a
/// singleton can still stash one in a `thread_local!`, matching the
/// pattern this crate's own test harness and `dx-sched` both use.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<Inner>>,
}

impl Scheduler {
    pub fn new(clock: Box<dyn Clock>, host: Box<dyn HostAdapter>, config: SchedulerConfig) -> Self {
        Self { inner: Rc::new(RefCell::new(Inner::new(clock, host, config))) }
    }

    /// Non-wasm convenience constructor: a real monotonic clock over a
    /// [`NativeHostAdapter`] (no animation-frame concept, timers only).
    pub fn native(config: SchedulerConfig) -> Self {
        let clock = MonotonicClock::new();
        let host = NativeHostAdapter::with_config(clock, config.clone());
        Self::new(Box::new(clock), Box::new(host), config)
    }

    /// Like [`Scheduler::native`], but also returns a [`SharedNativeHost`]
    /// handle so a host binary with no event loop of its own can drive the
    /// adapter with a simple `loop { pump.pump_blocking(); }` (see
    /// `demos/frame-demo`).
    pub fn native_with_pump(config: SchedulerConfig) -> (Self, SharedNativeHost<MonotonicClock>) {
        let clock = MonotonicClock::new();
        let host = SharedNativeHost::with_config(clock, config.clone());
        let scheduler = Self::new(Box::new(clock), Box::new(host.clone()), config);
        (scheduler, host)
    }

    /// wasm32 convenience constructor: `Performance::now` over a real
    /// `requestAnimationFrame` + `MessageChannel` pipeline.
    #[cfg(target_arch = "wasm32")]
    pub fn browser(config: SchedulerConfig) -> Self {
        let clock = clock::PerformanceClock::new();
        let host = BrowserHostAdapter::new(config.clone());
        Self::new(Box::new(clock), Box::new(host), config)
    }

    /// Deterministic constructor for tests (spec §4.3, "Injected
    /// backend"): returns the scheduler plus handles to drive its clock
    /// and fire its host callback explicitly, with no real timers
    /// involved anywhere.
    pub fn with_injected_host(config: SchedulerConfig) -> (Self, ManualClock, SharedInjectedHost) {
        let clock = ManualClock::new();
        let host = SharedInjectedHost::new();
        let scheduler = Self::new(Box::new(clock.clone()), Box::new(host.clone()), config);
        (scheduler, clock, host)
    }

    /// spec §4.2 `scheduleCallback(callback, options)`. `timeout`, if
    /// given, overrides `priority`'s table offset verbatim (spec §4.1).
    pub fn schedule_callback(&self, priority: Priority, timeout: Option<f64>, callback: Callback) -> NodeHandle {
        let mut inner = self.inner.borrow_mut();
        let start_time = if inner.current_event_start_time != -1.0 {
            inner.current_event_start_time
        } else {
            inner.clock.now()
        };
        let expiration_time = match timeout {
            Some(explicit) => start_time + explicit,
            None => start_time + priority.timeout_offset(&inner.config.priority_timeouts),
        };

        let handle = inner.queue.insert(priority, expiration_time, callback);
        let became_head = inner.queue.is_head(handle);
        drop(inner);

        tracing::trace!(?priority, expiration_time, became_head, "callback scheduled");
        if became_head {
            drain::ensure_host_callback_is_scheduled(&self.inner);
        }
        handle
    }

    /// spec §6 frames priority levels as the raw external constants
    /// `{1, 2, 3, 4}` rather than an enum at the interface boundary — this
    /// is the entry point for an embedding host that only has that raw
    /// level (e.g. one arriving across an FFI/JSON boundary) instead of a
    /// `Priority` value in hand. Delegates to [`Scheduler::schedule_callback`]
    /// once the level validates.
    pub fn schedule_callback_at_level(
        &self,
        level: u8,
        timeout: Option<f64>,
        callback: Callback,
    ) -> Result<NodeHandle, SchedulerError> {
        let priority = Priority::try_from(level)?;
        Ok(self.schedule_callback(priority, timeout, callback))
    }

    /// spec §4.2 `cancelCallback(node)`: O(1) and idempotent.
    pub fn cancel_callback(&self, handle: NodeHandle) {
        let mut inner = self.inner.borrow_mut();
        let is_executing = inner.is_executing_callback;
        let removed = inner.queue.cancel(handle);
        if !removed && is_executing {
            // spec §7: "callback returned continuation while cancelled
            // concurrently" — the node this handle named is already
            // detached (it's the one currently running), so cancelling it
            // is a documented no-op (spec §5), but it's still worth a
            // diagnostic since it usually means two collaborators raced
            // over the same handle.
            tracing::warn!("cancel_callback called on a handle whose node is already running; no-op");
        }
    }

    /// spec §4.1 `runWithPriority(level, fn)`: scopes `level` and "now" as
    /// the ambient priority/start-time for the duration of `f`, restoring
    /// both on every exit path (including a panic unwinding through `f`),
    /// then triggers an Immediate drain pass.
    pub fn run_with_priority<F, R>(&self, level: Priority, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        struct Restore {
            inner: Rc<RefCell<Inner>>,
            prior_priority: Priority,
            prior_event_start: f64,
        }
        impl Drop for Restore {
            fn drop(&mut self) {
                let mut inner = self.inner.borrow_mut();
                inner.current_priority_level = self.prior_priority;
                inner.current_event_start_time = self.prior_event_start;
            }
        }

        let guard = {
            let mut inner = self.inner.borrow_mut();
            let prior_priority = inner.current_priority_level;
            let prior_event_start = inner.current_event_start_time;
            let now = inner.clock.now();
            inner.current_priority_level = level;
            inner.current_event_start_time = now;
            Restore { inner: self.inner.clone(), prior_priority, prior_event_start }
        };

        let result = f();
        drop(guard);
        drain::flush_immediate_work(&self.inner);
        result
    }

    /// spec §4.1 `wrapCallback(fn)`: captures `get_current_priority_level()`
    /// at wrap time; every invocation of the returned closure behaves as
    /// if `run_with_priority(captured, fn)` were called.
    pub fn wrap_callback<F>(&self, mut f: F) -> impl FnMut()
    where
        F: FnMut() + 'static,
    {
        let captured = self.get_current_priority_level();
        let scheduler = self.clone();
        move || {
            let f = &mut f;
            scheduler.run_with_priority(captured, move || f());
        }
    }

    pub fn get_current_priority_level(&self) -> Priority {
        self.inner.borrow().current_priority_level
    }

    /// Takes the most recent callback panic caught by the drain loop, if
    /// any (spec §7, "Callback failure": caught rather than propagated,
    /// queue invariants restored, the host's task runner is left to log it
    /// per its own policy — this is that logging hook for an embedding
    /// host that wants one). Returns `None` and clears nothing if no
    /// callback has panicked since the last call.
    pub fn take_last_panic(&self) -> Option<SchedulerError> {
        self.inner.borrow_mut().last_panic.take().map(SchedulerError::CallbackPanicked)
    }

    /// Monotonic (or wall-clock, if the host has nothing better) "now", on
    /// whatever [`Clock`] this scheduler was built with.
    pub fn now(&self) -> f64 {
        self.inner.borrow().clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Callback {
        Box::new(|_| None)
    }

    #[test]
    fn schedule_then_cancel_before_any_tick_is_bit_identical_to_empty() {
        let (scheduler, _clock, host) = Scheduler::with_injected_host(SchedulerConfig::default());
        let handle = scheduler.schedule_callback(Priority::Normal, None, noop());
        assert!(host.has_pending());
        scheduler.cancel_callback(handle);
        assert!(scheduler.inner.borrow().queue.is_empty());
    }

    #[test]
    fn schedule_callback_at_level_accepts_the_documented_raw_constants() {
        let (scheduler, clock, _host) = Scheduler::with_injected_host(SchedulerConfig::default());
        let handle = scheduler
            .schedule_callback_at_level(2, None, noop()) // UserBlocking
            .expect("2 is a valid documented priority constant");
        assert_eq!(scheduler.inner.borrow().queue.head_expiration(), Some(clock.now() + 250.0));
        scheduler.cancel_callback(handle);
        assert!(scheduler.inner.borrow().queue.is_empty());
    }

    #[test]
    fn schedule_callback_at_level_rejects_out_of_range_levels() {
        let (scheduler, _clock, _host) = Scheduler::with_injected_host(SchedulerConfig::default());
        let err = scheduler.schedule_callback_at_level(0, None, noop()).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCallback(_)));
    }

    #[test]
    fn run_with_priority_returns_value_and_restores_afterwards() {
        let (scheduler, _clock, _host) = Scheduler::with_injected_host(SchedulerConfig::default());
        assert_eq!(scheduler.get_current_priority_level(), Priority::Normal);
        let observed = scheduler.run_with_priority(Priority::UserBlocking, || scheduler.get_current_priority_level());
        assert_eq!(observed, Priority::UserBlocking);
        assert_eq!(scheduler.get_current_priority_level(), Priority::Normal);
    }

    #[test]
    fn run_with_priority_restores_even_if_closure_panics() {
        let (scheduler, _clock, _host) = Scheduler::with_injected_host(SchedulerConfig::default());
        let outer = scheduler.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            outer.run_with_priority(Priority::Idle, || panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(scheduler.get_current_priority_level(), Priority::Normal);
    }

    #[test]
    fn panicking_callback_ends_the_pass_without_corrupting_the_queue() {
        let (scheduler, clock, host) = Scheduler::with_injected_host(SchedulerConfig::default());
        assert!(scheduler.take_last_panic().is_none());

        scheduler.schedule_callback(Priority::Normal, Some(100.0), Box::new(|_| panic!("callback blew up")));
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_b = log.clone();
        scheduler.schedule_callback(
            Priority::Normal,
            Some(100.0),
            Box::new(move |_| {
                log_b.borrow_mut().push("B");
                None
            }),
        );

        clock.set(101.0);
        host.fire_expired();

        assert!(matches!(scheduler.take_last_panic(), Some(SchedulerError::CallbackPanicked(_))));
        // Spec §7: "The pass ends; isExecutingCallback is cleared; the host
        // is re-armed if work remains." B must NOT run in the same pass as
        // A's panic — it only runs once the host fires again.
        assert!(log.borrow().is_empty());
        assert!(host.has_pending(), "queue still has B, so the host must be re-armed");
        assert!(scheduler.take_last_panic().is_none());

        host.fire_expired();
        assert_eq!(*log.borrow(), vec!["B"]);
        assert!(scheduler.take_last_panic().is_none());
    }

    #[test]
    fn wrap_callback_runs_at_captured_priority_even_after_ambient_changes() {
        let (scheduler, _clock, _host) = Scheduler::with_injected_host(SchedulerConfig::default());
        let mut wrapped = scheduler.run_with_priority(Priority::UserBlocking, || {
            let captured_scheduler = scheduler.clone();
            scheduler.wrap_callback(move || {
                assert_eq!(captured_scheduler.get_current_priority_level(), Priority::UserBlocking);
            })
        });
        assert_eq!(scheduler.get_current_priority_level(), Priority::Normal);
        wrapped();
        assert_eq!(scheduler.get_current_priority_level(), Priority::Normal);
    }
}
