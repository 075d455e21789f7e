//! The frame-time adaptation math from spec §4.3 `animationTick` step 3,
//! pulled out of [`super::browser`] so it can be unit-tested on every
//! target instead of only wasm32 (the browser backend itself needs real
//! `requestAnimationFrame`/`MessageChannel`, but the arithmetic that
//! decides how `active_frame_time` moves does not).

/// Given the frame interval just observed (`next_frame_time`) and the
/// adapter's current `previous_frame_time`/`active_frame_time`, returns the
/// `(new_active_frame_time, new_previous_frame_time)` pair spec §4.3 step 3
/// describes:
///
/// - If both `next_frame_time` and `previous_frame_time` are under the
///   current `active_frame_time`, the host appears to be running faster
///   than our estimate assumed: clamp `next_frame_time` to `min_frame_time`
///   (the 120 Hz ceiling) and adopt `max(next_frame_time, previous_frame_time)`
///   as the new `active_frame_time`. `previous_frame_time` is left alone.
/// - Otherwise, the estimate still holds: keep `active_frame_time` and just
///   record `next_frame_time` as the new `previous_frame_time`.
pub fn adapt(
    next_frame_time: f64,
    previous_frame_time: f64,
    active_frame_time: f64,
    min_frame_time: f64,
) -> (f64, f64) {
    if next_frame_time < active_frame_time && previous_frame_time < active_frame_time {
        let clamped = if next_frame_time < min_frame_time { min_frame_time } else { next_frame_time };
        (clamped.max(previous_frame_time), previous_frame_time)
    } else {
        (active_frame_time, next_frame_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_steady_when_previous_already_matches_active() {
        // previous_frame_time == active_frame_time, so the "both under
        // active" condition is false even though next_frame_time is low.
        let (active, previous) = adapt(10.0, 33.0, 33.0, 8.0);
        assert_eq!(active, 33.0);
        assert_eq!(previous, 10.0);
    }

    #[test]
    fn adapts_toward_observed_interval_after_two_consistent_ticks() {
        // Scenario 6: two ticks 10ms apart starting from the 33ms seed.
        let active0 = 33.0;
        let previous0 = 33.0;

        let (active1, previous1) = adapt(10.0, previous0, active0, 8.0);
        assert_eq!((active1, previous1), (33.0, 10.0));

        let (active2, _previous2) = adapt(10.0, previous1, active1, 8.0);
        assert_eq!(active2, 10.0);
        assert!(active2 >= 8.0);
    }

    #[test]
    fn never_drops_active_frame_time_below_the_floor() {
        let (active, _) = adapt(2.0, 20.0, 33.0, 8.0);
        assert_eq!(active, 20.0); // clamped to 8, then max(8, previous=20) = 20
    }

    #[test]
    fn floor_binds_when_previous_is_also_low() {
        let (active, _) = adapt(2.0, 3.0, 33.0, 8.0);
        assert_eq!(active, 8.0);
    }
}
