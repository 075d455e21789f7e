//! The Drain Loop (spec §4.4): pops callbacks in order, invokes each under
//! the shared [`Deadline`] view, enforces the reentrancy guard, and
//! re-arms the host as needed.
//!
//! Everything here operates over `&Rc<RefCell<Inner>>` rather than `&mut
//! self` because the host adapter's callback is itself a closure that
//! re-enters this module later, after the call that armed it has already
//! returned — there is no borrow to hand it, only a cloned handle.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::deadline::Deadline;
use crate::host::{HostAdapter, HostCallback};
use crate::node::{PoppedNode, Queue};
use crate::priority::Priority;

pub(crate) struct Inner {
    pub(crate) queue: Queue,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) host: Box<dyn HostAdapter>,
    pub(crate) config: SchedulerConfig,

    pub(crate) current_priority_level: Priority,
    pub(crate) current_event_start_time: f64,
    pub(crate) current_expiration_time: f64,

    pub(crate) is_executing_callback: bool,
    pub(crate) is_host_callback_scheduled: bool,

    pub(crate) did_timeout: bool,

    /// The most recent callback panic, if one hasn't been collected yet via
    /// `Scheduler::take_last_panic` (spec §7, "Callback failure": a panic
    /// must not corrupt queue invariants or abort the process — it's
    /// caught, logged, and surfaced to whoever polls for it).
    pub(crate) last_panic: Option<Box<dyn Any + Send + 'static>>,
}

impl Inner {
    pub(crate) fn new(clock: Box<dyn Clock>, host: Box<dyn HostAdapter>, config: SchedulerConfig) -> Self {
        Self {
            queue: Queue::new(),
            clock,
            host,
            config,
            current_priority_level: Priority::Normal,
            current_event_start_time: -1.0,
            current_expiration_time: -1.0,
            is_executing_callback: false,
            is_host_callback_scheduled: false,
            did_timeout: false,
            last_panic: None,
        }
    }
}

fn head_expiration(inner_rc: &Rc<RefCell<Inner>>) -> Option<f64> {
    inner_rc.borrow().queue.head_expiration()
}

fn clock_now(inner_rc: &Rc<RefCell<Inner>>) -> f64 {
    inner_rc.borrow().clock.now()
}

fn frame_deadline(inner_rc: &Rc<RefCell<Inner>>) -> f64 {
    inner_rc.borrow().host.frame_deadline()
}

/// spec §4.4 `ensureHostCallbackIsScheduled`. A no-op while a pass is
/// already running — the finally block in [`flush_work`] re-arms exactly
/// once after the pass instead, which is what keeps this safe to call from
/// inside a running callback (spec §5, "Reentrancy").
pub(crate) fn ensure_host_callback_is_scheduled(inner_rc: &Rc<RefCell<Inner>>) {
    let mut inner = inner_rc.borrow_mut();
    if inner.is_executing_callback {
        return;
    }
    if inner.is_host_callback_scheduled {
        inner.host.cancel_host_callback();
    }
    inner.is_host_callback_scheduled = true;
    let expiration = inner
        .queue
        .head_expiration()
        .expect("ensure_host_callback_is_scheduled called on an empty queue");

    let inner_for_closure = inner_rc.clone();
    let host_callback: HostCallback = Box::new(move |did_timeout| {
        flush_work(&inner_for_closure, did_timeout);
    });
    inner.host.request_host_callback(host_callback, expiration);
    tracing::debug!(expiration, "host callback (re-)armed");
}

/// spec §4.4 `flushWork(didTimeout)`, the entry point the Host Adapter
/// invokes once frame time is available or a timeout has fired.
pub(crate) fn flush_work(inner_rc: &Rc<RefCell<Inner>>, did_timeout: bool) {
    {
        let mut inner = inner_rc.borrow_mut();
        inner.is_executing_callback = true;
        inner.did_timeout = did_timeout;
    }

    if did_timeout {
        drain_expired(inner_rc);
    } else {
        drain_cooperative(inner_rc);
    }

    inner_rc.borrow_mut().is_executing_callback = false;

    let queue_empty = inner_rc.borrow().queue.is_empty();
    if queue_empty {
        inner_rc.borrow_mut().is_host_callback_scheduled = false;
    } else {
        ensure_host_callback_is_scheduled(inner_rc);
    }

    flush_immediate_work(inner_rc);
}

/// spec §4.4 step 2: run every already-expired callback, amortizing `now`
/// reads across bursts rather than sampling the clock per node.
///
/// spec §7, "Callback failure": a panicking callback ends the pass right
/// there — it does not run any more callbacks in this invocation of
/// `flushWork`. The remaining queued work is left for the next re-armed
/// pass, which `flush_work`'s caller still triggers afterward.
fn drain_expired(inner_rc: &Rc<RefCell<Inner>>) {
    loop {
        let now = clock_now(inner_rc);
        while head_expiration(inner_rc).is_some_and(|exp| exp <= now) {
            if flush_first_callback(inner_rc).panicked() {
                return;
            }
        }
        match head_expiration(inner_rc) {
            Some(exp) if exp <= clock_now(inner_rc) => continue,
            _ => break,
        }
    }
}

/// spec §4.4 step 3: run callbacks while frame time remains. See
/// `drain_expired` above on why a panic ends the pass immediately.
fn drain_cooperative(inner_rc: &Rc<RefCell<Inner>>) {
    loop {
        if head_expiration(inner_rc).is_none() {
            break;
        }
        let now = clock_now(inner_rc);
        if frame_deadline(inner_rc) - now <= 0.0 {
            break;
        }
        if flush_first_callback(inner_rc).panicked() {
            return;
        }
    }
}

/// Whether a [`flush_first_callback`] invocation panicked. The enclosing
/// drain loops use this to stop popping further work in the same pass
/// (spec §7: "The pass ends; `isExecutingCallback` is cleared; the host is
/// re-armed if work remains").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallbackOutcome {
    Completed,
    Panicked,
}

impl CallbackOutcome {
    fn panicked(self) -> bool {
        matches!(self, CallbackOutcome::Panicked)
    }
}

/// spec §4.4 `flushFirstCallback()`.
fn flush_first_callback(inner_rc: &Rc<RefCell<Inner>>) -> CallbackOutcome {
    let popped = inner_rc
        .borrow_mut()
        .queue
        .pop_front()
        .expect("flush_first_callback called against an empty queue");

    let PoppedNode { priority, expiration_time, callback } = popped;

    let (prior_priority, prior_expiration) = {
        let mut inner = inner_rc.borrow_mut();
        let prior = (inner.current_priority_level, inner.current_expiration_time);
        inner.current_priority_level = priority;
        inner.current_expiration_time = expiration_time;
        prior
    };

    let deadline = Deadline { inner: inner_rc.clone() };
    let result = panic::catch_unwind(AssertUnwindSafe(|| callback(&deadline)));

    {
        let mut inner = inner_rc.borrow_mut();
        inner.current_priority_level = prior_priority;
        inner.current_expiration_time = prior_expiration;
    }

    match result {
        Ok(Some(continuation)) => {
            let handle = inner_rc
                .borrow_mut()
                .queue
                .insert_continuation(priority, expiration_time, continuation);
            if inner_rc.borrow().queue.is_head(handle) {
                ensure_host_callback_is_scheduled(inner_rc);
            }
            CallbackOutcome::Completed
        }
        Ok(None) => CallbackOutcome::Completed,
        Err(payload) => {
            tracing::error!("callback panicked; queue invariants restored, ending this drain pass");
            inner_rc.borrow_mut().last_panic = Some(payload);
            CallbackOutcome::Panicked
        }
    }
}

/// spec §4.4 `flushImmediateWork()`. As spec §9 notes, standard enqueues
/// never assign `Immediate` through the default priority path in the
/// upstream design this crate is modeled on (only an explicit `timeout`
/// override reaches it), so this rarely fires in practice; the gating is
/// preserved verbatim rather than "fixed" into something that always runs.
pub(crate) fn flush_immediate_work(inner_rc: &Rc<RefCell<Inner>>) {
    let should_run = {
        let inner = inner_rc.borrow();
        inner.current_event_start_time == -1.0 && inner.queue.head_priority() == Some(Priority::Immediate)
    };
    if !should_run {
        return;
    }

    inner_rc.borrow_mut().did_timeout = true;
    while inner_rc.borrow().queue.head_priority() == Some(Priority::Immediate) {
        if flush_first_callback(inner_rc).panicked() {
            break;
        }
    }

    if !inner_rc.borrow().queue.is_empty() {
        ensure_host_callback_is_scheduled(inner_rc);
    }
}
