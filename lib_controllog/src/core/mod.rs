//! # Core Engine Module
//!
//! The moving parts of the control-log pipeline.
//!
//! - **`configuration_context`**: holds the current `ConfigurationSnapshot` and
//!   swaps it atomically.
//! - **`config_refresher`**: periodically rebuilds the snapshot from the
//!   configuration store.
//! - **`processor`**: the `LogProcessor` seam every reaction to a poll plugs into.
//! - **`log_poller`**: the fixed-interval loop that groups events by source,
//!   fetches each source once and fans the result out to every processor.

/// Lock-guarded holder of the current configuration snapshot.
pub mod configuration_context;
/// Periodic configuration refresh from an `EventLoader`.
pub mod config_refresher;
/// The poll loop.
pub mod log_poller;
/// The processor trait.
pub mod processor;

pub use config_refresher::{ConfigurationRefresher, EventLoader};
pub use configuration_context::ConfigurationContext;
pub use log_poller::{group_by_source, LogPoller, TickSummary};
pub use processor::LogProcessor;
