//! Login-streak evaluation.

use chrono::{DateTime, Utc};

/// Computes the streak a user holds after logging in at `now`.
///
/// The day difference counts whole elapsed days between the previous login
/// and `now`, in either direction:
///
/// - no previous login: the streak starts at 1
/// - exactly one day: the streak grows by one
/// - same day: the streak is kept, but never below 1
/// - more than one day: the streak resets to 1
#[must_use]
pub fn evaluate(last_login: Option<DateTime<Utc>>, streak: u32, now: DateTime<Utc>) -> u32 {
    let Some(last_login) = last_login else {
        return 1;
    };

    match (now - last_login).num_days().unsigned_abs() {
        0 => streak.max(1),
        1 => streak.saturating_add(1),
        _ => 1,
    }
}
