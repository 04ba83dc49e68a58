//! # Configuration Modules
//!
//! Settings shared between the binary and the library loops.

/// Poll and refresh interval validation.
pub mod intervals;

pub use intervals::IntervalSettings;
