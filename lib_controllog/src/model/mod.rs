//! # Data Model
//!
//! Plain data carried through the pipeline: control-log rows as parsed from a
//! feed, event settings as stored in the database, and the immutable
//! configuration snapshot the poll loop reads.

/// Control-log rows and the cached envelope.
pub mod control_log;
/// Event settings, cars, subscribers and the active-event filter.
pub mod event;
/// The atomically replaced configuration snapshot.
pub mod snapshot;

pub use control_log::{logs_differ, CachedControlLog, ControlLogEntry};
pub use event::{is_event_active, normalize_source_type, parse_ids, Car, EventSetting, EventSubscription, Subscriber};
pub use snapshot::ConfigurationSnapshot;
