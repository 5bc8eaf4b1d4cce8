//! Timestamp helpers shared by the scheduler and the queue builder.
//!
//! The core never reads the wall clock: every operation takes `now` (and, for
//! the queue, the start of the learner's day) as an explicit argument.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

use crate::error::{CadenceError, CadenceResult, ErrorCode};

/// Seconds in one scheduling day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Largest UTC offset accepted for a learner's local day, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Convert a unix timestamp in (possibly fractional) seconds into a UTC instant.
///
/// Rejects NaN, infinities, and instants chrono cannot represent.
pub fn timestamp_from_secs(secs: f64) -> CadenceResult<DateTime<Utc>> {
    if !secs.is_finite() {
        return Err(CadenceError::non_finite("now", secs));
    }
    let millis = (secs * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return Err(CadenceError::invalid_field(
            "now",
            ErrorCode::ValOutOfRange,
            format!("{} seconds is outside the representable range", secs),
        ));
    }
    DateTime::<Utc>::from_timestamp_millis(millis as i64).ok_or_else(|| {
        CadenceError::invalid_field(
            "now",
            ErrorCode::ValOutOfRange,
            format!("{} seconds is outside the representable range", secs),
        )
    })
}

/// Fractional days from `from` to `to`. Negative when `to` precedes `from`.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    to.signed_duration_since(from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// `at` shifted by a fractional number of days, at millisecond precision.
///
/// Saturates at the last (or first) representable instant instead of overflowing.
pub fn add_days(at: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    Duration::try_milliseconds((days * MILLIS_PER_DAY).round() as i64)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(if days < 0.0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Midnight (UTC) of the calendar day containing `now`.
pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Local midnight of the day containing `now`, for a learner at a fixed UTC offset.
pub fn day_start(now: DateTime<Utc>, utc_offset_minutes: i32) -> CadenceResult<DateTime<Utc>> {
    if utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(CadenceError::invalid_field(
            "utc_offset_minutes",
            ErrorCode::ValOutOfRange,
            format!("{} is beyond +/-{}", utc_offset_minutes, MAX_UTC_OFFSET_MINUTES),
        ));
    }
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
        CadenceError::invalid_field(
            "utc_offset_minutes",
            ErrorCode::ValOutOfRange,
            format!("{} is not a valid offset", utc_offset_minutes),
        )
    })?;

    let local_midnight = now
        .with_timezone(&offset)
        .date_naive()
        .and_time(NaiveTime::MIN);

    offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CadenceError::Internal("ambiguous local midnight".to_string()))
}
