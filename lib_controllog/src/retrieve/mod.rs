//! # Data Retrieval Module
//!
//! HTTP plumbing shared by every adapter that talks to a web API: the Google
//! Sheets control-log source and the Twilio SMS gateway. Request building,
//! authentication and transient-failure retries live here so the adapters only
//! deal with payloads.

/// Generic HTTP API client with retry middleware.
pub mod ky_http;

pub use ky_http::{ApiAuth, ApiClient, ApiResponse};
