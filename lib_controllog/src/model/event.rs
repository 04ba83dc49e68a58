//! # Event Settings
//!
//! Rows loaded from the configuration store and the derived subscription an
//! active event turns into.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// An event row as stored in the configuration database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSetting {
    /// Primary key.
    pub id: i64,
    /// Display name, used in logs.
    pub name: String,
    /// Disabled events are never polled.
    pub is_enabled: bool,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// First day of the event, local time.
    pub event_start: NaiveDateTime,
    /// Last day of the event, local time. The whole day is included.
    pub event_end: NaiveDateTime,
    /// IANA timezone id; UTC when absent.
    pub timezone: Option<String>,
    /// Dispatch tag of the control-log source, e.g. `google-sheets`.
    pub control_log_type: String,
    /// Source-specific parameter, e.g. the sheet name.
    pub control_log_parameter: String,
    /// Semicolon-delimited car ids.
    pub car_ids: String,
    /// Semicolon-delimited subscriber ids.
    pub subscriber_ids: String,
}

/// A car that can be subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    /// Primary key.
    pub id: i64,
    /// Car number as painted on the car, matched case-insensitively against the log.
    pub number: String,
}

/// A person who receives penalty texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// E.164 phone number.
    pub phone_number: String,
    /// Only confirmed numbers are texted.
    pub confirmed: bool,
}

impl Subscriber {
    /// Whether this subscriber may be sent an SMS.
    pub fn can_receive_sms(&self) -> bool {
        self.confirmed && !self.phone_number.trim().is_empty()
    }
}

/// One monitored event, derived from an active `EventSetting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscription {
    /// Event id.
    pub event_id: i64,
    /// Event name.
    pub name: String,
    /// Dispatch tag of the control-log source.
    pub source_type: String,
    /// Source-specific parameter.
    pub source_parameter: String,
    /// IANA timezone id of the event; UTC when absent.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Cars of interest.
    pub car_ids: BTreeSet<i64>,
    /// People to text about those cars.
    pub subscriber_ids: BTreeSet<i64>,
}

impl EventSubscription {
    /// Builds a subscription from a setting, parsing its id lists.
    pub fn from_setting(setting: &EventSetting) -> Self {
        Self {
            event_id: setting.id,
            name: setting.name.clone(),
            source_type: normalize_source_type(&setting.control_log_type),
            source_parameter: setting.control_log_parameter.trim().to_string(),
            timezone: setting.timezone.clone(),
            car_ids: parse_ids(&setting.car_ids).into_iter().collect(),
            subscriber_ids: parse_ids(&setting.subscriber_ids).into_iter().collect(),
        }
    }

    /// The key events are grouped by so a shared feed is fetched once per tick.
    pub fn source_key(&self) -> (String, String) {
        (self.source_type.clone(), self.source_parameter.clone())
    }

    /// The calendar day at the event's location.
    pub fn local_today(&self, now_utc: DateTime<Utc>) -> NaiveDate {
        local_time(self.event_id, self.timezone.as_deref(), now_utc).date()
    }
}

/// Canonical form of a source type tag: trimmed and lowercased.
///
/// Grouping and source lookup both go through this, so tags differing only in
/// case or padding name the same feed.
pub fn normalize_source_type(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Parses a semicolon-delimited id list.
///
/// Blank and unparseable items are skipped rather than read as zero.
pub fn parse_ids(ids: &str) -> Vec<i64> {
    ids.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| item.parse::<i64>().ok())
        .collect()
}

/// Whether an event should be polled at `now_utc`.
///
/// The event must be enabled and not deleted, and the event-local time must fall
/// between `event_start` and the end of the day of `event_end`, inclusive.
pub fn is_event_active(setting: &EventSetting, now_utc: DateTime<Utc>) -> bool {
    if setting.is_deleted || !setting.is_enabled {
        return false;
    }

    let local_now = local_time(setting.id, setting.timezone.as_deref(), now_utc);
    setting.event_start <= local_now && local_now.date() <= setting.event_end.date()
}

fn local_time(event_id: i64, timezone: Option<&str>, now_utc: DateTime<Utc>) -> NaiveDateTime {
    let tz_id = timezone.map(str::trim).filter(|id| !id.is_empty());

    match tz_id {
        Some(id) => match id.parse::<Tz>() {
            Ok(tz) => now_utc.with_timezone(&tz).naive_local(),
            Err(err) => {
                warn!(event_id, timezone = id, error = %err, "Unknown timezone, using UTC");
                now_utc.naive_utc()
            }
        },
        None => now_utc.naive_utc(),
    }
}
