//! Host Adapter: the pluggable binding to the host's animation-frame,
//! deferred-task, and clock primitives (spec §4.3).
//!
//! Three backends implement [`HostAdapter`]:
//! - [`browser::BrowserHostAdapter`] (wasm32 only) — real `requestAnimationFrame`
//!   + a `MessageChannel` deferred task, adapting `active_frame_time` to the
//!   observed refresh rate.
//! - [`native::NativeHostAdapter`] — no animation-frame concept; timers only,
//!   `frame_deadline()` is always `+inf`.
//! - [`injected::InjectedHostAdapter`] — deterministic, test-only: frame
//!   ticks and deferred-task firing are both driven explicitly by the test.

pub mod frame_time;
pub mod injected;
pub mod native;

#[cfg(target_arch = "wasm32")]
pub mod browser;

/// A callback invoked by the host adapter once the frame deadline is known
/// (or once a timeout fires). `did_timeout` is true when the invocation
/// happened because a callback's expiration passed, not because frame time
/// was available — it becomes `Deadline::did_timeout()`.
pub type HostCallback = Box<dyn FnMut(bool)>;

/// The three operations spec §4.3 says every backend must provide.
pub trait HostAdapter {
    /// Arm the host to invoke `callback` once frame time is available or
    /// `absolute_timeout` (an absolute timestamp on the scheduler's clock)
    /// has passed, whichever comes first.
    fn request_host_callback(&mut self, callback: HostCallback, absolute_timeout: f64);

    /// Cancel any pending request. Idempotent.
    fn cancel_host_callback(&mut self);

    /// The projected end-of-frame timestamp. `+inf` on backends with no
    /// frame concept (spec §4.3, "Non-browser backend").
    fn frame_deadline(&self) -> f64;

    /// spec §7, "Host-missing-capability": a diagnostic check for whether
    /// this backend's host environment actually has the primitives it
    /// needs, so a host that merely *resembles* a browser (e.g. compiled
    /// for `wasm32` but running in a Worker with no `window`) gets a
    /// `tracing::warn!` instead of a blind panic the first time something
    /// is missing. Backends with nothing to probe (native, injected) just
    /// return `Ok(())`.
    fn probe(&self) -> Result<(), crate::error::SchedulerError> {
        Ok(())
    }
}
