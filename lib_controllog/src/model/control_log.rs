//! # Control Log Entries
//!
//! A control log is the ordered list of incidents a race series keeps for one
//! event. Rows carry no identity of their own, so the row position (`order_id`)
//! is used as the key when comparing one poll with the next.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a control log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlLogEntry {
    /// Position of the row within the feed. Stable across polls while rows are
    /// only ever appended.
    pub order_id: u32,
    /// When the incident was logged, in the event's local time.
    pub timestamp: NaiveDateTime,
    /// Corner or location on track.
    pub corner: String,
    /// First car involved.
    pub car1: String,
    /// Second car involved, empty for single-car incidents.
    pub car2: String,
    /// Free-text description of the incident.
    pub note: String,
    /// Review status, e.g. "Under Review" or "Penalty".
    pub status: String,
    /// Penalty or action taken.
    pub penalty_action: String,
    /// Anything else race control wrote down.
    pub other_notes: String,
}

impl ControlLogEntry {
    /// Creates an entry with only the required fields set.
    pub fn new(order_id: u32, timestamp: NaiveDateTime, note: impl Into<String>) -> Self {
        Self {
            order_id,
            timestamp,
            corner: String::new(),
            car1: String::new(),
            car2: String::new(),
            note: note.into(),
            status: String::new(),
            penalty_action: String::new(),
            other_notes: String::new(),
        }
    }

    /// Field-wise comparison of everything except `order_id`, which is the key
    /// the two entries were matched on.
    pub fn has_changed(&self, other: &ControlLogEntry) -> bool {
        self.timestamp != other.timestamp
            || self.corner != other.corner
            || self.car1 != other.car1
            || self.car2 != other.car2
            || self.note != other.note
            || self.status != other.status
            || self.penalty_action != other.penalty_action
            || self.other_notes != other.other_notes
    }

    /// The non-blank car numbers on this row, first car first.
    pub fn car_numbers(&self) -> impl Iterator<Item = &str> {
        [self.car1.as_str(), self.car2.as_str()]
            .into_iter()
            .map(str::trim)
            .filter(|number| !number.is_empty())
    }
}

/// Positional comparison of two polls of the same log.
///
/// A different length, or any position whose fields differ, counts as a change.
pub fn logs_differ(previous: &[ControlLogEntry], current: &[ControlLogEntry]) -> bool {
    previous.len() != current.len()
        || previous
            .iter()
            .zip(current)
            .any(|(before, after)| before.has_changed(after))
}

/// The envelope written to the cache for UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedControlLog {
    /// When this version of the log was captured.
    pub timestamp: DateTime<Utc>,
    /// The full log as last polled.
    pub log: Vec<ControlLogEntry>,
}

impl CachedControlLog {
    /// Wraps a log with the current UTC time.
    pub fn capture(log: Vec<ControlLogEntry>) -> Self {
        Self {
            timestamp: Utc::now(),
            log,
        }
    }
}
