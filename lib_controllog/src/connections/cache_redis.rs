//! # Redis Cache Implementation
//!
//! Stores the latest control log per event under `control-log:{event_id}` and
//! publishes the same payload on the channel of the same name, which the UI
//! relay is subscribed to.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::error::{ControlLogError, Result};
use crate::processors::LogCache;

/// Key and channel prefix for control logs.
pub const CONTROL_LOG_KEY_PREFIX: &str = "control-log";

/// Key (and channel) a control log is stored under.
pub fn control_log_key(event_id: i64) -> String {
    format!("{CONTROL_LOG_KEY_PREFIX}:{event_id}")
}

/// A Redis-backed `LogCache`.
#[derive(Clone)]
pub struct RedisLogCache {
    /// Multiplexed connection that reconnects on its own.
    manager: ConnectionManager,
}

impl RedisLogCache {
    /// Connects to the redis URL (e.g., "redis://127.0.0.1/").
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| ControlLogError::Cache(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| ControlLogError::Cache(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl LogCache for RedisLogCache {
    async fn store_control_log(&self, event_id: i64, payload: &str) -> Result<()> {
        let key = control_log_key(event_id);
        let mut conn = self.manager.clone();

        conn.set::<_, _, ()>(&key, payload)
            .await
            .map_err(|e| ControlLogError::Cache(format!("SET {key}: {e}")))?;
        conn.publish::<_, _, ()>(&key, payload)
            .await
            .map_err(|e| ControlLogError::Cache(format!("PUBLISH {key}: {e}")))?;
        Ok(())
    }
}
