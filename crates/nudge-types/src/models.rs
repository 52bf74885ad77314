use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned reminder identifier. Strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(pub u64);

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A pending reminder. Doubles as the submission body; the id lives
/// beside it in the store rather than inside it.
///
/// Field names on the wire keep the names existing pages already post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub title: String,
    pub description: String,

    /// Caller-supplied, never checked against the server clock.
    #[serde(rename = "creation_date", deserialize_with = "crate::timestamp::deserialize")]
    pub creation_time: DateTime<Utc>,

    #[serde(rename = "reminder_datetime", deserialize_with = "crate::timestamp::deserialize")]
    pub trigger_time: DateTime<Utc>,
}

impl Reminder {
    /// A reminder is due once its trigger time is at or before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.trigger_time <= now
    }
}
