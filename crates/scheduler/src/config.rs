//! Tunables for the scheduler, expressed the way `dx-cli`'s project config
//! is: a `serde`-derived struct with `Default` wired through named
//! `default_*` functions so every magic number in the spec has one place to
//! live. This is not read from a file — the scheduler persists nothing —
//! it just gives an embedding host a typed knob instead of a constant
//! scattered through the drain loop.

use serde::{Deserialize, Serialize};

/// Timeout offsets (milliseconds from enqueue time) for each priority
/// level, per spec §4.1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriorityTimeouts {
    #[serde(default = "default_immediate_timeout")]
    pub immediate_ms: f64,
    #[serde(default = "default_user_blocking_timeout")]
    pub user_blocking_ms: f64,
    #[serde(default = "default_normal_timeout")]
    pub normal_ms: f64,
    #[serde(default = "default_idle_timeout")]
    pub idle_ms: f64,
}

impl Default for PriorityTimeouts {
    fn default() -> Self {
        Self {
            immediate_ms: default_immediate_timeout(),
            user_blocking_ms: default_user_blocking_timeout(),
            normal_ms: default_normal_timeout(),
            idle_ms: default_idle_timeout(),
        }
    }
}

fn default_immediate_timeout() -> f64 {
    -1.0
}
fn default_user_blocking_timeout() -> f64 {
    250.0
}
fn default_normal_timeout() -> f64 {
    5_000.0
}
/// 2^30 - 1, the "effectively never" offset from spec §4.1.
fn default_idle_timeout() -> f64 {
    1_073_741_823.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub priority_timeouts: PriorityTimeouts,

    /// Floor on `active_frame_time`, spec §4.3 step 3 / §8 boundary.
    #[serde(default = "default_min_frame_time_ms")]
    pub min_frame_time_ms: f64,

    /// Seed value for `active_frame_time` and `previous_frame_time`.
    #[serde(default = "default_initial_frame_time_ms")]
    pub initial_frame_time_ms: f64,

    /// How long the browser backend's animation-frame race (§4.3,
    /// `requestAnimationFrameWithTimeout`) waits before falling back to the
    /// `setTimeout` side of the race.
    #[serde(default = "default_animation_frame_fallback_ms")]
    pub animation_frame_fallback_ms: f64,

    /// The non-browser backend's long-tail timer horizon (spec §4.3,
    /// "Non-browser backend": "a second timer for 'max signed 31-bit
    /// int'"), so `NativeHostAdapter` reads this instead of a private
    /// constant of its own.
    #[serde(default = "default_non_browser_idle_offset_ms")]
    pub non_browser_idle_offset_ms: f64,
}

fn default_min_frame_time_ms() -> f64 {
    8.0
}
fn default_initial_frame_time_ms() -> f64 {
    33.0
}
fn default_animation_frame_fallback_ms() -> f64 {
    100.0
}
/// 2^30 - 1, the "effectively never" offset from spec §4.1, reused as the
/// native backend's long-tail timer horizon.
fn default_non_browser_idle_offset_ms() -> f64 {
    1_073_741_823.0
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            priority_timeouts: PriorityTimeouts::default(),
            min_frame_time_ms: default_min_frame_time_ms(),
            initial_frame_time_ms: default_initial_frame_time_ms(),
            animation_frame_fallback_ms: default_animation_frame_fallback_ms(),
            non_browser_idle_offset_ms: default_non_browser_idle_offset_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.priority_timeouts.immediate_ms, -1.0);
        assert_eq!(cfg.priority_timeouts.user_blocking_ms, 250.0);
        assert_eq!(cfg.priority_timeouts.normal_ms, 5_000.0);
        assert_eq!(cfg.priority_timeouts.idle_ms, 1_073_741_823.0);
        assert_eq!(cfg.min_frame_time_ms, 8.0);
        assert_eq!(cfg.initial_frame_time_ms, 33.0);
        assert_eq!(cfg.non_browser_idle_offset_ms, 1_073_741_823.0);
    }

    #[test]
    fn deserializes_with_partial_overrides() {
        let json = r#"{ "priority_timeouts": { "normal_ms": 1000.0 } }"#;
        let cfg: SchedulerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.priority_timeouts.normal_ms, 1000.0);
        // Untouched fields keep spec defaults.
        assert_eq!(cfg.priority_timeouts.user_blocking_ms, 250.0);
        assert_eq!(cfg.min_frame_time_ms, 8.0);
    }
}
