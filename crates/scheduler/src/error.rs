//! Error taxonomy for the scheduler (spec §7).
//!
//! The hot path — `schedule_callback`, `cancel_callback`, the drain loop
//! itself — stays infallible, matching the original design: a callback
//! panicking is the only failure the core loop has to deal with, and it is
//! caught rather than threaded through a `Result`. `SchedulerError` exists
//! for the handful of boundaries where a `Result` actually makes sense.

use std::any::Any;
use std::fmt;

#[derive(thiserror::Error)]
pub enum SchedulerError {
    /// A caller passed a raw priority level (spec §6's `{1, 2, 3, 4}`
    /// constants) outside that range to [`crate::Scheduler::schedule_callback_at_level`].
    /// Reaching this is a programming error in an external collaborator,
    /// not a runtime condition — rejected with a `Result` rather than
    /// silently clamped or defaulted.
    #[error("invalid callback: {0}")]
    InvalidCallback(&'static str),

    /// [`crate::host::HostAdapter::probe`] found the host missing an
    /// animation-frame or deferred-task primitive it needs (only
    /// `BrowserHostAdapter` overrides `probe` with a real check; every
    /// other backend returns `Ok(())`). There is no runtime fallback to
    /// another backend on `wasm32` — `BrowserHostAdapter::new` logs this as
    /// a `tracing::warn!` diagnostic rather than discovering the gap later
    /// via a blind panic.
    #[error("host is missing a capability the browser backend needs: {reason}")]
    HostCapabilityMissing { reason: String },

    /// A callback panicked while running. The drain loop has already
    /// restored queue invariants (detached node, restored priority state)
    /// before this is surfaced via `Scheduler::take_last_panic`.
    #[error("callback panicked during drain")]
    CallbackPanicked(Box<dyn Any + Send + 'static>),
}

// Manual `Debug`: the panic payload inside `CallbackPanicked` is `dyn Any`,
// which has no `Debug` impl of its own, so this can't be `#[derive(Debug)]`.
impl fmt::Debug for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCallback(reason) => f.debug_tuple("InvalidCallback").field(reason).finish(),
            Self::HostCapabilityMissing { reason } => {
                f.debug_struct("HostCapabilityMissing").field("reason", reason).finish()
            }
            Self::CallbackPanicked(_) => f.debug_tuple("CallbackPanicked").field(&"<panic payload>").finish(),
        }
    }
}
