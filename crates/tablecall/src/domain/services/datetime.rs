//! Local wall-clock normalization for extracted times
//!
//! The extraction service sometimes answers with an absolute instant
//! (`...Z` or `...+01:00`) and sometimes with a plain local time. Readers
//! only ever want the restaurant's local wall clock, without a zone marker.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;

use crate::domain::errors::DomainError;

/// Canonical output form: `YYYY-MM-DDTHH:mm:ss`
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Zoned shapes accepted besides RFC 3339 (`%z` takes `+HH:MM` and `+HHMM`)
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
];

/// Zone-less shapes; numeric fields may be unpadded
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Normalize an extracted date-time into a zone-less local wall-clock string.
///
/// Zoned inputs are converted through `timezone`; zone-less inputs are only
/// validated and padded. When `timezone` is missing or unknown, a zoned input
/// keeps the wall clock of its own offset.
pub fn normalize_local_datetime(value: &str, timezone: Option<&str>) -> Result<String, DomainError> {
    let trimmed = value.trim();

    let Some(instant) = parse_zoned(trimmed) else {
        let naive = parse_local(trimmed)
            .ok_or_else(|| DomainError::Validation(format!("Unrecognized date-time: {trimmed}")))?;
        return Ok(naive.format(LOCAL_DATETIME_FORMAT).to_string());
    };

    match timezone.and_then(|tz| tz.parse::<Tz>().ok()) {
        Some(tz) => Ok(instant
            .with_timezone(&tz)
            .format(LOCAL_DATETIME_FORMAT)
            .to_string()),
        None => {
            tracing::warn!(
                timezone = ?timezone,
                value = %trimmed,
                "No usable timezone; keeping the instant's own wall clock"
            );
            Ok(instant.naive_local().format(LOCAL_DATETIME_FORMAT).to_string())
        }
    }
}

fn parse_zoned(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok().or_else(|| {
        ZONED_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(value, format).ok())
    })
}

fn parse_local(value: &str) -> Option<NaiveDateTime> {
    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
