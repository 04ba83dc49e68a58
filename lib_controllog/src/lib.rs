//! # lib_controllog
//!
//! Polls race-control logs, detects real changes between polls, republishes the
//! latest log to the cache and texts subscribers about new or edited penalties.
//!
//! Modules behind a feature flag talk to the outside world (HTTP, Redis, Postgres,
//! log files). Everything else is pure logic and always compiled.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Validated interval settings shared by the poll and refresh loops.
pub mod configs;
/// Configuration context, refresh loop, poll loop and the processor seam.
pub mod core;
/// Library-wide error type.
pub mod error;
/// Control-log entries, event settings and the configuration snapshot.
pub mod model;
/// SMS gateway seam and the Twilio adapter.
pub mod notify;
/// Cache-publishing and SMS-notifying log processors.
pub mod processors;
/// Control-log sources and the header-driven column mapper.
pub mod sources;

/// Redis cache sink and Postgres event loader.
#[cfg(feature = "connections")]
pub mod connections;
/// Tracing subscriber setup with file output.
#[cfg(feature = "loggers")]
pub mod loggers;
/// HTTP client with retry middleware.
#[cfg(feature = "retrieve")]
pub mod retrieve;

pub use error::{ControlLogError, Result};
