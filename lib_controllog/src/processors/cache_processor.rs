//! # Cache Processor
//!
//! Writes an event's control log to the cache only when it differs from the
//! last log written for that event. Unchanged polls do no I/O at all.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{info, trace};

use crate::core::LogProcessor;
use crate::error::Result;
use crate::model::{logs_differ, CachedControlLog, ConfigurationSnapshot, ControlLogEntry, EventSubscription};

/// Destination for serialized control logs.
#[async_trait]
pub trait LogCache: Send + Sync {
    /// Stores and publishes `payload` (a serialized `CachedControlLog`) for `event_id`.
    async fn store_control_log(&self, event_id: i64, payload: &str) -> Result<()>;
}

/// Publishes changed control logs.
pub struct CacheProcessor {
    cache: Arc<dyn LogCache>,
    last_written: Mutex<HashMap<i64, Vec<ControlLogEntry>>>,
}

impl CacheProcessor {
    /// Creates a processor writing to `cache`.
    pub fn new(cache: Arc<dyn LogCache>) -> Self {
        Self {
            cache,
            last_written: Mutex::new(HashMap::new()),
        }
    }

    fn has_changed(&self, event_id: i64, log: &[ControlLogEntry]) -> bool {
        let last_written = self.last_written.lock().unwrap_or_else(PoisonError::into_inner);
        last_written
            .get(&event_id)
            .map_or(true, |previous| logs_differ(previous, log))
    }
}

#[async_trait]
impl LogProcessor for CacheProcessor {
    fn name(&self) -> &str {
        "cache"
    }

    async fn process(
        &self,
        event: &EventSubscription,
        log: &[ControlLogEntry],
        _snapshot: &ConfigurationSnapshot,
    ) -> Result<()> {
        if !self.has_changed(event.event_id, log) {
            trace!(event_id = event.event_id, "Control log unchanged");
            return Ok(());
        }

        let envelope = CachedControlLog::capture(log.to_vec());
        let payload = serde_json::to_string(&envelope)?;
        self.cache.store_control_log(event.event_id, &payload).await?;

        // Remember the log only once it is actually in the cache, so a failed
        // write is retried on the next poll.
        self.last_written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event.event_id, envelope.log);

        info!(event_id = event.event_id, entries = log.len(), "Control log published");
        Ok(())
    }
}
