//! Whole-day arithmetic between timestamps
//!
//! Fees charge in whole elapsed days (floor of seconds / 86 400). Two
//! operations inside the same day observe zero elapsed days, which is a
//! zero accrual, not an error.

use chrono::{DateTime, Utc};

/// Seconds in a fee-accounting day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days from `earlier` to `later`, saturating at zero when `later`
/// is not after `earlier`.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u64 {
    let secs = (later - earlier).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs / SECONDS_PER_DAY) as u64
    }
}
