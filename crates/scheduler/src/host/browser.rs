//! Browser-like host adapter (spec §4.3), wasm32 only. Drives the drain
//! loop off `requestAnimationFrame` + a `MessageChannel` deferred task,
//! adapting `active_frame_time` to the host's observed refresh rate, with
//! a `setTimeout` race so a backgrounded tab (no rAF callbacks) still makes
//! forward progress.
//!
//! Structurally this generalizes `crates/dx-sched`'s `request_next_frame`
//! (the `Rc<RefCell<Option<Closure>>>` trick for a self-rescheduling rAF
//! closure) to the full two-stage rAF → deferred-task pipeline the spec
//! describes instead of driving work directly off the rAF callback.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::Function;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, MessageChannel, MessageEvent, MessagePort};

use super::{HostAdapter, HostCallback};
use crate::clock::{Clock, PerformanceClock};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

struct Shared {
    performance: PerformanceClock,
    config: SchedulerConfig,

    scheduled_host_callback: RefCell<Option<HostCallback>>,
    timeout_time: Cell<f64>,

    is_animation_frame_scheduled: Cell<bool>,
    is_message_event_scheduled: Cell<bool>,
    is_flushing_host_callback: Cell<bool>,

    frame_deadline: Cell<f64>,
    active_frame_time: Cell<f64>,
    previous_frame_time: Cell<f64>,

    port: MessagePort,
    /// Unique per-adapter token so our `MessageEvent`s never get confused
    /// with unrelated `postMessage` traffic on the same channel (spec
    /// §4.3: "keyed by a unique token").
    token: u64,

    // Keep closures alive for the lifetime of the adapter.
    raf_closure: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    message_closure: RefCell<Option<Closure<dyn FnMut(MessageEvent)>>>,
    raf_timeout_id: Cell<Option<i32>>,
}

pub struct BrowserHostAdapter {
    shared: Rc<Shared>,
}

impl BrowserHostAdapter {
    pub fn new(config: SchedulerConfig) -> Self {
        if let Err(err) = Self::probe_environment() {
            tracing::warn!(%err, "browser host adapter's environment is missing a capability it expects");
        }

        let channel = MessageChannel::new().expect("host is missing MessageChannel");
        let port = channel.port2();

        let shared = Rc::new(Shared {
            performance: PerformanceClock::new(),
            active_frame_time: Cell::new(config.initial_frame_time_ms),
            previous_frame_time: Cell::new(config.initial_frame_time_ms),
            config,
            scheduled_host_callback: RefCell::new(None),
            timeout_time: Cell::new(-1.0),
            is_animation_frame_scheduled: Cell::new(false),
            is_message_event_scheduled: Cell::new(false),
            is_flushing_host_callback: Cell::new(false),
            frame_deadline: Cell::new(0.0),
            port,
            token: next_token(),
            raf_closure: RefCell::new(None),
            message_closure: RefCell::new(None),
            raf_timeout_id: Cell::new(None),
        });

        install_message_listener(&shared, &channel.port1());

        Self { shared }
    }

    /// spec §7, "Host-missing-capability": checks for `window`,
    /// `window.performance`, and `MessageChannel` without constructing
    /// anything, so a host that merely *resembles* a browser (compiled for
    /// `wasm32`) but actually lacks these — a Worker has no `window` — is
    /// diagnosed instead of discovered via a blind `.expect()` panic the
    /// first time one of them is touched.
    fn probe_environment() -> Result<(), SchedulerError> {
        let window = window().ok_or_else(|| SchedulerError::HostCapabilityMissing {
            reason: "no `window` object in this wasm32 host (running in a Worker?)".to_string(),
        })?;
        if window.performance().is_none() {
            return Err(SchedulerError::HostCapabilityMissing {
                reason: "`window.performance` is unavailable".to_string(),
            });
        }
        MessageChannel::new().map(|_| ()).map_err(|_| SchedulerError::HostCapabilityMissing {
            reason: "`MessageChannel` construction failed".to_string(),
        })
    }
}

thread_local! {
    static TOKEN_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn next_token() -> u64 {
    TOKEN_COUNTER.with(|c| {
        let v = c.get() + 1;
        c.set(v);
        v
    })
}

fn install_message_listener(shared: &Rc<Shared>, listening_port: &MessagePort) {
    let shared_for_closure = shared.clone();
    let token = shared.token;
    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        let matches_token = event.data().as_f64().map(|v| v as u64 == token).unwrap_or(false);
        if !matches_token {
            tracing::warn!(expected = token, "deferred-task message token mismatch; ignoring unrelated postMessage");
            return;
        }
        idle_tick(&shared_for_closure);
    }) as Box<dyn FnMut(MessageEvent)>);

    listening_port
        .set_onmessage(Some(closure.as_ref().unchecked_ref::<Function>()));
    *shared.message_closure.borrow_mut() = Some(closure);
}

fn post_deferred_task(shared: &Rc<Shared>) {
    if shared.is_message_event_scheduled.get() {
        return;
    }
    shared.is_message_event_scheduled.set(true);
    let _ = shared.port.post_message(&JsValue::from_f64(shared.token as f64));
}

/// spec §4.3 `animationTick(rafTime)`.
fn animation_tick(shared: &Rc<Shared>, raf_time: f64) {
    if shared.scheduled_host_callback.borrow().is_some() {
        request_animation_frame(shared);
    } else {
        shared.is_animation_frame_scheduled.set(false);
        return;
    }

    let next_frame_time = raf_time - shared.frame_deadline.get() + shared.active_frame_time.get();
    let previous_active = shared.active_frame_time.get();
    let (new_active, new_previous) = super::frame_time::adapt(
        next_frame_time,
        shared.previous_frame_time.get(),
        previous_active,
        shared.config.min_frame_time_ms,
    );
    if new_active != previous_active {
        tracing::debug!(from = previous_active, to = new_active, "active_frame_time adapted to observed refresh rate");
    }
    shared.active_frame_time.set(new_active);
    shared.previous_frame_time.set(new_previous);

    shared.frame_deadline.set(raf_time + shared.active_frame_time.get());

    if !shared.is_message_event_scheduled.get() {
        post_deferred_task(shared);
    }
}

/// spec §4.3 `idleTick` (the deferred-task / `MessageChannel` handler).
fn idle_tick(shared: &Rc<Shared>) {
    shared.is_message_event_scheduled.set(false);

    let callback = shared.scheduled_host_callback.borrow_mut().take();
    let timeout_time = shared.timeout_time.get();
    shared.timeout_time.set(-1.0);

    let Some(mut callback) = callback else { return };

    let now = shared.performance.now();
    if shared.frame_deadline.get() - now <= 0.0 {
        if timeout_time != -1.0 && timeout_time <= now {
            shared.is_flushing_host_callback.set(true);
            callback(true);
            shared.is_flushing_host_callback.set(false);
            return;
        }
        // Not actually expired yet: restore the snapshot and wait for the
        // next frame instead of running early.
        *shared.scheduled_host_callback.borrow_mut() = Some(callback);
        shared.timeout_time.set(timeout_time);
        if !shared.is_animation_frame_scheduled.get() {
            shared.is_animation_frame_scheduled.set(true);
            request_animation_frame(shared);
        }
        return;
    }

    shared.is_flushing_host_callback.set(true);
    callback(false);
    shared.is_flushing_host_callback.set(false);
}

fn request_animation_frame(shared: &Rc<Shared>) {
    let window = window().expect("host has no window");
    let shared_for_closure = shared.clone();
    let closure = Closure::wrap(Box::new(move |raf_time: f64| {
        animation_tick(&shared_for_closure, raf_time);
    }) as Box<dyn FnMut(f64)>);

    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .expect("requestAnimationFrame failed");
    *shared.raf_closure.borrow_mut() = Some(closure);
}

/// spec §4.3 `requestAnimationFrameWithTimeout`: races the real rAF
/// against a `setTimeout`, whichever fires first wins and cancels the
/// other — guarantees forward progress when the host suspends animation
/// frames (a backgrounded tab).
fn request_animation_frame_with_timeout(shared: &Rc<Shared>) {
    let window = window().expect("host has no window");
    let did_run = Rc::new(Cell::new(false));

    let raf_shared = shared.clone();
    let raf_did_run = did_run.clone();
    let raf_closure = Closure::wrap(Box::new(move |raf_time: f64| {
        if raf_did_run.get() {
            return;
        }
        raf_did_run.set(true);
        if let Some(id) = raf_shared.raf_timeout_id.take() {
            if let Some(win) = window_ref() {
                win.clear_timeout_with_handle(id);
            }
        }
        animation_tick(&raf_shared, raf_time);
    }) as Box<dyn FnMut(f64)>);

    let raf_id = window
        .request_animation_frame(raf_closure.as_ref().unchecked_ref())
        .expect("requestAnimationFrame failed");
    *shared.raf_closure.borrow_mut() = Some(raf_closure);

    let timeout_shared = shared.clone();
    let timeout_did_run = did_run;
    let timeout_closure = Closure::once(move || {
        if timeout_did_run.get() {
            return;
        }
        timeout_did_run.set(true);
        if let Some(win) = window_ref() {
            let _ = win.cancel_animation_frame(raf_id);
        }
        let now = timeout_shared.performance.now();
        animation_tick(&timeout_shared, now);
    });

    let timeout_id = window
        .set_timeout_with_callback_and_timeout_and_ms_0(
            timeout_closure.as_ref().unchecked_ref(),
            shared.config.animation_frame_fallback_ms as i32,
        )
        .expect("setTimeout failed");
    shared.raf_timeout_id.set(Some(timeout_id));
    timeout_closure.forget();
}

fn window_ref() -> Option<web_sys::Window> {
    window()
}

impl HostAdapter for BrowserHostAdapter {
    fn request_host_callback(&mut self, callback: HostCallback, absolute_timeout: f64) {
        *self.shared.scheduled_host_callback.borrow_mut() = Some(callback);
        self.shared.timeout_time.set(absolute_timeout);

        if self.shared.is_flushing_host_callback.get() || absolute_timeout < 0.0 {
            post_deferred_task(&self.shared);
        } else if !self.shared.is_animation_frame_scheduled.get() {
            self.shared.is_animation_frame_scheduled.set(true);
            request_animation_frame_with_timeout(&self.shared);
        }
    }

    fn cancel_host_callback(&mut self) {
        *self.shared.scheduled_host_callback.borrow_mut() = None;
        self.shared.is_message_event_scheduled.set(false);
    }

    fn frame_deadline(&self) -> f64 {
        self.shared.frame_deadline.get()
    }

    fn probe(&self) -> Result<(), SchedulerError> {
        Self::probe_environment()
    }
}
