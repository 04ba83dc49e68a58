//! # Interval Settings
//!
//! The poll interval has no sensible default; a missing or zero value is a
//! startup error. The refresh interval falls back to one minute.

use std::time::Duration;

use crate::error::{ControlLogError, Result};

/// Refresh interval used when none is configured.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Validated loop intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSettings {
    /// Time between the starts of two poll ticks.
    pub poll_interval: Duration,
    /// Time between two configuration refreshes.
    pub refresh_interval: Duration,
}

impl IntervalSettings {
    /// Validates raw millisecond values.
    pub fn new(poll_interval_ms: Option<u64>, refresh_interval_ms: Option<u64>) -> Result<Self> {
        let poll_interval = match poll_interval_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            Some(_) => {
                return Err(ControlLogError::Config(
                    "poll interval must be greater than zero".to_string(),
                ))
            }
            None => {
                return Err(ControlLogError::Config(
                    "poll interval is not configured".to_string(),
                ))
            }
        };

        let refresh_interval = match refresh_interval_ms {
            Some(0) => {
                return Err(ControlLogError::Config(
                    "refresh interval must be greater than zero".to_string(),
                ))
            }
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_REFRESH_INTERVAL,
        };

        Ok(Self {
            poll_interval,
            refresh_interval,
        })
    }
}
