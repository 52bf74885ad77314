//! Lenient timestamp parsing for reminder submissions.
//!
//! Browsers post `datetime-local` values without an offset
//! (`2024-05-01T09:30`), so naive values are read in the server's local
//! time zone. Anything carrying an offset is parsed as RFC 3339.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

/// Naive formats accepted after RFC 3339 fails, in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("unrecognized timestamp '{0}'")]
    Unrecognized(String),

    #[error("timestamp '{0}' does not exist in the local time zone")]
    NonexistentLocal(String),
}

pub fn parse(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .ok_or_else(|| TimestampError::Unrecognized(input.to_string()))?;

    // Ambiguous wall-clock times (DST fall-back) resolve to the earlier instant.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimestampError::NonexistentLocal(input.to_string()))
}

/// Serde adapter for `#[serde(deserialize_with = "...")]`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}
