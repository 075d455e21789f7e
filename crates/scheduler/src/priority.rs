//! Priority levels and the scoped-priority policy (spec §4.1).

use crate::config::PriorityTimeouts;

/// The four priority levels a callback can be scheduled at.
///
/// Numeric values match the external interface in spec §6
/// (`Immediate=1, UserBlocking=2, Normal=3, Idle=4`) so embedders that pass
/// a raw level across an FFI boundary get the documented constants.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Immediate = 1,
    UserBlocking = 2,
    Normal = 3,
    Idle = 4,
}

impl Priority {
    /// `expirationTime = startTime + offset(priority)`, spec §4.1.
    pub fn timeout_offset(self, timeouts: &PriorityTimeouts) -> f64 {
        match self {
            Priority::Immediate => timeouts.immediate_ms,
            Priority::UserBlocking => timeouts.user_blocking_ms,
            Priority::Normal => timeouts.normal_ms,
            Priority::Idle => timeouts.idle_ms,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl TryFrom<u8> for Priority {
    type Error = crate::error::SchedulerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Immediate),
            2 => Ok(Priority::UserBlocking),
            3 => Ok(Priority::Normal),
            4 => Ok(Priority::Idle),
            _ => Err(crate::error::SchedulerError::InvalidCallback(
                "priority level must be 1 (Immediate), 2 (UserBlocking), 3 (Normal) or 4 (Idle)",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_match_spec_table() {
        let t = PriorityTimeouts::default();
        assert_eq!(Priority::Immediate.timeout_offset(&t), -1.0);
        assert_eq!(Priority::UserBlocking.timeout_offset(&t), 250.0);
        assert_eq!(Priority::Normal.timeout_offset(&t), 5_000.0);
        assert_eq!(Priority::Idle.timeout_offset(&t), 1_073_741_823.0);
    }

    #[test]
    fn ordering_is_severity_not_urgency() {
        // Priority::Ord is declaration order, used only for Vec/BTree
        // convenience elsewhere — the queue itself orders by
        // expiration_time, never by this enum's Ord.
        assert!(Priority::Immediate < Priority::UserBlocking);
        assert!(Priority::UserBlocking < Priority::Normal);
        assert!(Priority::Normal < Priority::Idle);
    }

    #[test]
    fn try_from_rejects_out_of_range() {
        assert!(Priority::try_from(0).is_err());
        assert!(Priority::try_from(5).is_err());
        assert_eq!(Priority::try_from(1).unwrap(), Priority::Immediate);
    }
}
