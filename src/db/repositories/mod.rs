pub mod achievement;
pub mod user;

use chrono::{DateTime, Utc};

use super::StoreError;

/// Timestamps are stored as RFC 3339 text.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
