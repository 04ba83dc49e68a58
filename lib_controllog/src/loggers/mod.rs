//! # Loggers
//!
//! Process-wide tracing setup for the binaries.

/// Console plus file subscriber with log pruning.
pub mod setup;

pub use setup::{cleanup_old_logs, setup_logging};
