//! # Log Processors
//!
//! A processor reacts to one poll result for one event. Processors run
//! concurrently with each other and across events, so each one owns its state
//! and must tolerate being called for several events at once.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ConfigurationSnapshot, ControlLogEntry, EventSubscription};

/// A reaction to a freshly polled control log.
#[async_trait]
pub trait LogProcessor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Handles the log polled for `event`.
    async fn process(
        &self,
        event: &EventSubscription,
        log: &[ControlLogEntry],
        snapshot: &ConfigurationSnapshot,
    ) -> Result<()>;
}
