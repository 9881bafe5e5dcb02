//! ISO-8601 timestamps with millisecond precision.
//!
//! Manifest timestamps (`generatedAt`, `mtime`) are always written as UTC with
//! exactly three fractional digits and a `Z` suffix, e.g.
//! `2025-08-14T16:33:00.000Z`. Any RFC 3339 value is accepted on input.
//!
//! Use with `#[serde(with = "tdx_core::timestamp")]`.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Formats a timestamp the way manifests store it.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
/// assert_eq!(tdx_core::timestamp::format(&at), "2023-11-14T22:13:20.123Z");
/// ```
#[must_use]
pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Converts milliseconds since the Unix epoch into a UTC timestamp.
///
/// Out-of-range values fall back to the Unix epoch.
#[must_use]
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}

/// Serializes a timestamp in manifest format.
pub fn serialize<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(at))
}

/// Deserializes any RFC 3339 timestamp into UTC.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}
