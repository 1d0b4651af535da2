use std::hash::{DefaultHasher, Hash, Hasher};

use crate::reminder::ReminderId;

pub type DispatchToken = i32;

/// Suffix for the one-off token a snoozed firing is rescheduled under.
pub const SNOOZE_SUFFIX: &str = "snooze";

const TOKEN_MASK: u64 = 0x7fff_ffff;

/// Token for the occurrence at `index` of the current horizon.
///
/// Pure function of its inputs, so cancellation can recompute tokens instead
/// of keeping a side table. Collisions between different reminders are
/// tolerated: cancel is best-effort and may tear down an unrelated token.
pub fn for_occurrence(reminder_id: ReminderId, index: usize) -> DispatchToken {
    derive(&format!("{reminder_id}:{index}"))
}

/// Token for a derived one-off schedule, e.g. `SNOOZE_SUFFIX`.
pub fn for_variant(reminder_id: ReminderId, suffix: &str) -> DispatchToken {
    derive(&format!("{reminder_id}:{suffix}"))
}

fn derive(key: &str) -> DispatchToken {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() & TOKEN_MASK) as DispatchToken
}
