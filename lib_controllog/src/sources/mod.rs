//! # Control Log Sources
//!
//! A source fetches the current control log for a parameter (a sheet name, a
//! feed id). Sources are looked up at runtime by the type tag stored on each
//! event, so adding a provider means registering one more implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{ControlLogError, Result};
use crate::model::{normalize_source_type, ControlLogEntry};

/// Header-driven mapping of tabular rows onto control-log entries.
pub mod column_mapping;
/// Google Sheets backed source.
#[cfg(feature = "retrieve")]
pub mod google_sheets;

pub use column_mapping::{ColumnMapper, LogField};
#[cfg(feature = "retrieve")]
pub use google_sheets::GoogleSheetsSource;

/// A provider of control logs.
#[async_trait]
pub trait ControlLogSource: Send + Sync {
    /// Dispatch tag matched against `EventSubscription::source_type`.
    fn source_type(&self) -> &str;

    /// Fetches the full, ordered control log for `parameter`.
    async fn load_control_log(&self, parameter: &str) -> Result<Vec<ControlLogEntry>>;

    /// Like `load_control_log`, with the event-local calendar day for feeds that
    /// carry time-only cells. Sources without such cells can ignore it.
    async fn load_control_log_for_day(
        &self,
        parameter: &str,
        _local_day: NaiveDate,
    ) -> Result<Vec<ControlLogEntry>> {
        self.load_control_log(parameter).await
    }
}

/// Type tag to source lookup.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn ControlLogSource>>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source under its own type tag, replacing any previous one.
    pub fn register(&mut self, source: Arc<dyn ControlLogSource>) -> &mut Self {
        self.sources.insert(normalize_source_type(source.source_type()), source);
        self
    }

    /// Finds the source for a type tag. Tags are matched case-insensitively.
    pub fn resolve(&self, source_type: &str) -> Result<Arc<dyn ControlLogSource>> {
        self.sources
            .get(&normalize_source_type(source_type))
            .cloned()
            .ok_or_else(|| ControlLogError::UnsupportedSourceType(source_type.to_string()))
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
