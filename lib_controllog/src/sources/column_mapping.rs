//! # Column Mapping
//!
//! Turns a tabular feed (header row plus data rows of text cells) into control
//! log entries. The header row decides which column feeds which field; the
//! mapping is built once and reused until it is cleared by a failed build.
//!
//! Feeds list the two cars of an incident under the same header ("Car #"). The
//! first column with a car header is `Car1`; a later column with the same
//! header text is `Car2`.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, error, trace};

use crate::error::{ControlLogError, Result};
use crate::model::ControlLogEntry;

/// Order id given to the first data row.
pub const FIRST_ORDER_ID: u32 = 1;

const DATE_TIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%I:%M:%S %p", "%I:%M %p", "%H:%M:%S", "%H:%M"];

/// A control-log field a column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogField {
    /// Incident time. Required.
    Timestamp,
    /// Corner or location.
    Corner,
    /// First car.
    Car1,
    /// Second car.
    Car2,
    /// Incident description. Required.
    Note,
    /// Review status.
    Status,
    /// Penalty or action.
    PenaltyAction,
    /// Other notes.
    OtherNotes,
}

impl LogField {
    const REQUIRED: [LogField; 2] = [LogField::Timestamp, LogField::Note];

    fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "time" | "timestamp" => Some(Self::Timestamp),
            "corner" | "turn" | "location" => Some(Self::Corner),
            "car#" | "car" | "carnumber" | "car1" => Some(Self::Car1),
            "car2" => Some(Self::Car2),
            "note" | "notes" | "description" => Some(Self::Note),
            "status" => Some(Self::Status),
            "penalty/action" | "penalty" | "action" => Some(Self::PenaltyAction),
            "othernotes" | "other" => Some(Self::OtherNotes),
            _ => None,
        }
    }
}

/// Header-driven row parser with a persistent mapping.
#[derive(Debug, Default, Clone)]
pub struct ColumnMapper {
    columns: HashMap<usize, LogField>,
    reference_date: Option<NaiveDate>,
}

impl ColumnMapper {
    /// Creates a mapper with no mapping yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a usable mapping is held.
    pub fn has_mappings(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Column index feeding `field`, if mapped.
    pub fn column_of(&self, field: LogField) -> Option<usize> {
        self.columns
            .iter()
            .find(|(_, mapped)| **mapped == field)
            .map(|(index, _)| *index)
    }

    /// Number of mapped columns.
    pub fn mapped_columns(&self) -> usize {
        self.columns.len()
    }

    /// Forgets the current mapping; the next `parse` rebuilds it.
    pub fn clear(&mut self) {
        self.columns.clear();
        self.reference_date = None;
    }

    /// Builds the mapping from a header row.
    ///
    /// `reference_date` is the date given to time-only cells for as long as
    /// this mapping lives. If a required field has no column, the mapping is
    /// cleared and an error returned.
    pub fn build_mappings(&mut self, header: &[String], reference_date: NaiveDate) -> Result<()> {
        self.clear();

        let mut seen_headers: HashMap<String, LogField> = HashMap::new();
        for (index, cell) in header.iter().enumerate() {
            let text = cell.trim().to_lowercase();
            let Some(field) = LogField::from_header(&text) else {
                continue;
            };

            let field = match seen_headers.get(&text) {
                Some(LogField::Car1) => LogField::Car2,
                Some(_) => continue,
                None => field,
            };
            if self.column_of(field).is_some() {
                continue;
            }

            seen_headers.insert(text, field);
            self.columns.insert(index, field);
        }

        let missing: Vec<LogField> = LogField::REQUIRED
            .into_iter()
            .filter(|field| self.column_of(*field).is_none())
            .collect();
        if !missing.is_empty() {
            self.clear();
            return Err(ControlLogError::ColumnMapping(format!(
                "required columns missing: {missing:?}"
            )));
        }

        self.reference_date = Some(reference_date);
        Ok(())
    }

    /// Parses a full sheet: `rows[0]` is the header, the rest are data.
    ///
    /// Builds the mapping first if none is held; a failed build yields an empty
    /// log. Rows missing a required value are dropped without shifting the order
    /// ids of the rows after them.
    pub fn parse(&mut self, rows: &[Vec<String>], today: NaiveDate) -> Vec<ControlLogEntry> {
        let Some((header, data)) = rows.split_first() else {
            return Vec::new();
        };

        if !self.has_mappings() {
            if let Err(err) = self.build_mappings(header, today) {
                error!(error = %err, header = ?header, "Unable to map control log columns");
                return Vec::new();
            }
        }

        let mut entries = Vec::with_capacity(data.len());
        for (position, row) in data.iter().enumerate() {
            let order_id = FIRST_ORDER_ID + position as u32;
            match self.parse_row(order_id, row) {
                Some(entry) => entries.push(entry),
                None if row.iter().all(|cell| cell.trim().is_empty()) => {
                    trace!(order_id, "Skipping blank control log row");
                }
                None => {
                    debug!(order_id, row = ?row, "Dropping control log row with missing required fields");
                }
            }
        }
        entries
    }

    fn parse_row(&self, order_id: u32, row: &[String]) -> Option<ControlLogEntry> {
        let reference_date = self.reference_date?;

        let mut timestamp: Option<NaiveDateTime> = None;
        let mut entry = ControlLogEntry::new(order_id, reference_date.and_hms_opt(0, 0, 0)?, "");
        let mut note_set = false;

        for (index, field) in &self.columns {
            let value = row.get(*index).map(|cell| cell.trim()).unwrap_or_default();
            match field {
                LogField::Timestamp => timestamp = parse_timestamp(value, reference_date),
                LogField::Corner => entry.corner = value.to_string(),
                LogField::Car1 => entry.car1 = value.to_string(),
                LogField::Car2 => entry.car2 = value.to_string(),
                LogField::Note => {
                    note_set = !value.is_empty();
                    entry.note = value.to_string();
                }
                LogField::Status => entry.status = value.to_string(),
                LogField::PenaltyAction => entry.penalty_action = value.to_string(),
                LogField::OtherNotes => entry.other_notes = value.to_string(),
            }
        }

        if !note_set {
            return None;
        }
        entry.timestamp = timestamp?;
        Some(entry)
    }
}

/// Parses a timestamp cell. Time-only values are placed on `reference_date`.
pub fn parse_timestamp(value: &str, reference_date: NaiveDate) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            TIME_FORMATS
                .iter()
                .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
                .map(|time| reference_date.and_time(time))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    fn full_header() -> Vec<String> {
        row(&[
            "Time",
            "Corner",
            "Car #",
            "Car #",
            "Note",
            "Status",
            "Penalty / Action",
            "Other Notes",
        ])
    }

    #[test]
    fn duplicate_car_headers_map_to_both_cars() {
        let mut mapper = ColumnMapper::new();
        mapper.build_mappings(&full_header(), day()).unwrap();

        assert_eq!(mapper.column_of(LogField::Timestamp), Some(0));
        assert_eq!(mapper.column_of(LogField::Corner), Some(1));
        assert_eq!(mapper.column_of(LogField::Car1), Some(2));
        assert_eq!(mapper.column_of(LogField::Car2), Some(3));
        assert_eq!(mapper.column_of(LogField::Note), Some(4));
        assert_eq!(mapper.column_of(LogField::Status), Some(5));
        assert_eq!(mapper.column_of(LogField::PenaltyAction), Some(6));
        assert_eq!(mapper.column_of(LogField::OtherNotes), Some(7));
    }

    #[test]
    fn missing_required_header_clears_everything() {
        let mut mapper = ColumnMapper::new();
        mapper.build_mappings(&full_header(), day()).unwrap();

        let header = row(&["Time", "Corner", "Car #", "Car #", "Status"]);
        assert!(matches!(
            mapper.build_mappings(&header, day()),
            Err(ControlLogError::ColumnMapping(_))
        ));
        assert!(!mapper.has_mappings());
        assert_eq!(mapper.mapped_columns(), 0);

        let rows = vec![header, row(&["10:00 AM", "T1", "12", "", "Ok"])];
        assert!(mapper.parse(&rows, day()).is_empty());
        assert!(!mapper.has_mappings());
    }

    #[test]
    fn parses_rows_with_sequential_order_ids() {
        let rows = vec![
            full_header(),
            row(&["10:05 AM", "T3", "12", "34", "Contact", "Under Review", "", ""]),
            row(&["", "", "", "", "", "", "", ""]),
            row(&["10:20:30", "T7", "7", "", "Off track", "Penalty", "Drive through", "x"]),
        ];
        let mut mapper = ColumnMapper::new();
        let log = mapper.parse(&rows, day());

        assert_eq!(log.len(), 2);
        assert_eq!(log[0].order_id, 1);
        assert_eq!(log[0].car1, "12");
        assert_eq!(log[0].car2, "34");
        assert_eq!(log[0].timestamp, day().and_hms_opt(10, 5, 0).unwrap());
        assert_eq!(log[1].order_id, 3);
        assert_eq!(log[1].penalty_action, "Drive through");
        assert_eq!(log[1].other_notes, "x");
    }

    #[test]
    fn rows_missing_required_values_are_dropped() {
        let rows = vec![
            full_header(),
            row(&["not a time", "T1", "12", "", "Contact"]),
            row(&["10:00 AM", "T1", "12", "", ""]),
            row(&["10:01 AM", "T1", "12"]),
            row(&["10:02 AM", "T2", "9", "", "Spin"]),
        ];
        let log = ColumnMapper::new().parse(&rows, day());

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].order_id, 4);
        assert_eq!(log[0].note, "Spin");
        assert_eq!(log[0].status, "");
    }

    #[test]
    fn mapping_is_reused_and_reference_date_is_kept() {
        let rows = vec![full_header(), row(&["9:00 PM", "", "5", "", "Unsafe release"])];
        let mut mapper = ColumnMapper::new();
        let first = mapper.parse(&rows, day());
        let later_day = day().succ_opt().unwrap();
        let second = mapper.parse(&rows, later_day);

        assert_eq!(first, second);
        assert_eq!(second[0].timestamp, day().and_hms_opt(21, 0, 0).unwrap());
    }

    #[test]
    fn full_dates_are_parsed_as_given() {
        let parsed = parse_timestamp("07/02/2024 13:45:00", day()).unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2024, 7, 2).unwrap().and_hms_opt(13, 45, 0).unwrap());
        assert!(parse_timestamp("", day()).is_none());
    }

    #[test]
    fn empty_sheet_yields_empty_log() {
        assert!(ColumnMapper::new().parse(&[], day()).is_empty());
    }
}
