//! Timestamp conversions used by the program table
//!
//! Program start times are stored as epoch milliseconds so that range and
//! ordering queries behave identically on every backend.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

use crate::errors::RepositoryError;

/// Drop sub-second precision
pub fn truncate_to_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::seconds(1))
        .unwrap_or(instant)
}

pub fn to_epoch_ms(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

pub fn from_epoch_ms(ms: i64) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| RepositoryError::invalid_value("programs", "start_time_ms", ms))
}

/// Convert a std duration to signed milliseconds, saturating on overflow
pub fn duration_ms(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
