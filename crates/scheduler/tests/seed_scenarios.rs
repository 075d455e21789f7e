//! The six end-to-end scenarios named in spec §8, run verbatim against the
//! public `Scheduler` API with a `ManualClock` and `SharedInjectedHost` so
//! nothing here depends on real wall-clock timing.

use std::cell::RefCell;
use std::rc::Rc;

use frame_scheduler::{Priority, Scheduler, SchedulerConfig};

fn log_push(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) {
    log.borrow_mut().push(name);
}

/// Scenario 1: FIFO at equal deadline.
#[test]
fn fifo_at_equal_deadline() {
    let (scheduler, clock, host) = Scheduler::with_injected_host(SchedulerConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_a = log.clone();
    scheduler.schedule_callback(
        Priority::Normal,
        Some(100.0),
        Box::new(move |_| {
            log_push(&log_a, "A");
            None
        }),
    );
    let log_b = log.clone();
    scheduler.schedule_callback(
        Priority::Normal,
        Some(100.0),
        Box::new(move |_| {
            log_push(&log_b, "B");
            None
        }),
    );

    clock.set(101.0);
    host.fire_expired();

    assert_eq!(*log.borrow(), vec!["A", "B"]);
}

/// Scenario 2: priority by deadline, not enqueue order.
#[test]
fn priority_by_deadline_not_enqueue_order() {
    let (scheduler, clock, host) = Scheduler::with_injected_host(SchedulerConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_a = log.clone();
    scheduler.schedule_callback(
        Priority::Normal,
        Some(5_000.0),
        Box::new(move |_| {
            log_push(&log_a, "A");
            None
        }),
    );
    let log_b = log.clone();
    scheduler.schedule_callback(
        Priority::UserBlocking,
        Some(250.0),
        Box::new(move |_| {
            log_push(&log_b, "B");
            None
        }),
    );

    clock.set(251.0);
    host.fire_expired();

    // Only B's deadline (251 >= 250) has passed; A (expires at 5000) stays queued.
    assert_eq!(*log.borrow(), vec!["B"]);
}

/// Scenario 3: cooperative yield stops before an unexpired callback once
/// frame time runs out.
#[test]
fn cooperative_yield_stops_at_frame_boundary() {
    let (scheduler, clock, host) = Scheduler::with_injected_host(SchedulerConfig::default());
    host.set_frame_deadline(16.0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_a = log.clone();
    let clock_a = clock.clone();
    scheduler.schedule_callback(
        Priority::Normal,
        Some(5_000.0),
        Box::new(move |_| {
            clock_a.advance(10.0); // simulated 10ms of work
            log_push(&log_a, "A");
            None
        }),
    );
    let log_b = log.clone();
    let clock_b = clock.clone();
    scheduler.schedule_callback(
        Priority::Normal,
        Some(5_000.0),
        Box::new(move |_| {
            clock_b.advance(10.0);
            log_push(&log_b, "B");
            None
        }),
    );
    let log_c = log.clone();
    scheduler.schedule_callback(
        Priority::Normal,
        Some(5_000.0),
        Box::new(move |_| {
            log_push(&log_c, "C");
            None
        }),
    );

    host.fire_cooperative();

    // A runs (now -> 10, 6ms of frame budget left), B runs (now -> 20,
    // budget exhausted), C never gets a turn and stays queued.
    assert_eq!(*log.borrow(), vec!["A", "B"]);
}

/// Scenario 4: a continuation runs ahead of an equal-deadline sibling.
#[test]
fn continuation_runs_before_equal_deadline_sibling() {
    let (scheduler, clock, host) = Scheduler::with_injected_host(SchedulerConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_a = log.clone();
    scheduler.schedule_callback(
        Priority::Normal,
        Some(100.0),
        Box::new(move |_| {
            log_push(&log_a, "A");
            let log_continuation = log_a.clone();
            Some(Box::new(move |_: &frame_scheduler::Deadline| {
                log_push(&log_continuation, "A'");
                None
            }))
        }),
    );
    let log_b = log.clone();
    scheduler.schedule_callback(
        Priority::Normal,
        Some(100.0),
        Box::new(move |_| {
            log_push(&log_b, "B");
            None
        }),
    );

    clock.set(101.0);
    host.fire_expired();

    assert_eq!(*log.borrow(), vec!["A", "A'", "B"]);
}

/// Scenario 5: a callback cancelling its own handle mid-run is a no-op;
/// the continuation it returns is still enqueued normally.
#[test]
fn cancel_during_run_is_noop_continuation_still_enqueued() {
    let (scheduler, clock, host) = Scheduler::with_injected_host(SchedulerConfig::default());
    let log = Rc::new(RefCell::new(Vec::new()));
    let handle_cell: Rc<RefCell<Option<frame_scheduler::NodeHandle>>> = Rc::new(RefCell::new(None));

    let scheduler_for_cb = scheduler.clone();
    let handle_cell_for_cb = handle_cell.clone();
    let log_a = log.clone();
    let handle = scheduler.schedule_callback(
        Priority::Normal,
        Some(100.0),
        Box::new(move |_| {
            log_push(&log_a, "A");
            let own_handle = handle_cell_for_cb.borrow().expect("handle stored before A runs");
            scheduler_for_cb.cancel_callback(own_handle); // no-op: A is already detached
            let log_continuation = log_a.clone();
            Some(Box::new(move |_: &frame_scheduler::Deadline| {
                log_push(&log_continuation, "A'");
                None
            }))
        }),
    );
    *handle_cell.borrow_mut() = Some(handle);

    clock.set(101.0);
    host.fire_expired();

    assert_eq!(*log.borrow(), vec!["A", "A'"]);
}

// Scenario 6 (adaptive frame time) lives in `host::frame_time`'s own unit
// tests, next to the pure math it exercises.
