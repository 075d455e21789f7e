//! Minimal host binary exercising `frame-scheduler` on the native (no
//! animation-frame) backend: schedules a handful of callbacks across all
//! four priority levels and pumps the host adapter until every one of them
//! has run.
//!
//! Not a UI — there is no paint pipeline on the command line — this just
//! demonstrates the external interface a real embedding host (a renderer's
//! event loop) would drive.

use std::cell::Cell;
use std::rc::Rc;

use frame_scheduler::{Priority, Scheduler, SchedulerConfig};

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    init_tracing();

    let (scheduler, pump) = Scheduler::native_with_pump(SchedulerConfig::default());
    let remaining = Rc::new(Cell::new(0usize));

    for (priority, label) in [
        (Priority::Idle, "idle work"),
        (Priority::Normal, "normal work"),
        (Priority::UserBlocking, "user-blocking work"),
        (Priority::Immediate, "immediate work"),
    ] {
        remaining.set(remaining.get() + 1);
        let remaining_for_cb = remaining.clone();
        scheduler.schedule_callback(
            priority,
            None,
            Box::new(move |deadline| {
                tracing::info!(label, did_timeout = deadline.did_timeout(), "running callback");
                remaining_for_cb.set(remaining_for_cb.get() - 1);
                None
            }),
        );
    }

    tracing::info!(count = remaining.get(), "frame-demo: scheduled callbacks, pumping host adapter");
    while remaining.get() > 0 {
        pump.pump_blocking();
    }
    tracing::info!("frame-demo: drained");
}
