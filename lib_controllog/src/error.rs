//! # Control Log Errors
//!
//! One error type for the whole pipeline. Driver errors (redis, postgres, http)
//! are flattened into a variant at the adapter boundary so the core never
//! depends on a driver crate.

use thiserror::Error;

/// Custom error types for control-log polling and notification.
#[derive(Debug, Error)]
pub enum ControlLogError {
    /// No `ControlLogSource` is registered for the event's source type.
    #[error("Unsupported control log source type: {0}")]
    UnsupportedSourceType(String),

    /// The external control-log feed could not be fetched.
    #[error("Failed to fetch control log: {0}")]
    Fetch(String),

    /// The header row did not contain every required column.
    #[error("Column mapping failed: {0}")]
    ColumnMapping(String),

    /// Writing or publishing to the cache failed.
    #[error("Cache write failed: {0}")]
    Cache(String),

    /// The SMS gateway rejected or failed a send.
    #[error("SMS send failed: {0}")]
    Sms(String),

    /// Loading event configuration from the database failed.
    #[error("Database error: {0}")]
    Database(String),

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ControlLogError>;
