//! # Configuration Refresher
//!
//! Rebuilds the `ConfigurationSnapshot` from the configuration store on its own
//! cadence. A failed refresh keeps the previous snapshot in place so polling
//! carries on with stale but consistent configuration.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::configuration_context::ConfigurationContext;
use crate::error::Result;
use crate::model::{parse_ids, Car, ConfigurationSnapshot, EventSetting, Subscriber};

/// Read-only access to event configuration.
#[async_trait]
pub trait EventLoader: Send + Sync {
    /// Events that are enabled, not deleted and running at `now_utc`
    /// (see `model::is_event_active`).
    async fn load_active_events(&self, now_utc: DateTime<Utc>) -> Result<Vec<EventSetting>>;

    /// Cars with the given ids. Unknown ids are simply absent from the result.
    async fn load_cars(&self, ids: &[i64]) -> Result<Vec<Car>>;

    /// Subscribers with the given ids. Unknown ids are simply absent from the result.
    async fn load_subscribers(&self, ids: &[i64]) -> Result<Vec<Subscriber>>;
}

/// Periodic snapshot rebuild.
pub struct ConfigurationRefresher {
    loader: Arc<dyn EventLoader>,
    context: Arc<ConfigurationContext>,
    refresh_interval: Duration,
}

impl ConfigurationRefresher {
    /// Creates a refresher writing into `context`.
    pub fn new(
        loader: Arc<dyn EventLoader>,
        context: Arc<ConfigurationContext>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            loader,
            context,
            refresh_interval,
        }
    }

    /// Loads events and everything they reference, then swaps the snapshot in.
    ///
    /// Returns the number of active events.
    pub async fn refresh_once(&self, now_utc: DateTime<Utc>) -> Result<usize> {
        let events = self.loader.load_active_events(now_utc).await?;

        let car_ids: BTreeSet<i64> = events
            .iter()
            .flat_map(|event| parse_ids(&event.car_ids))
            .collect();
        let subscriber_ids: BTreeSet<i64> = events
            .iter()
            .flat_map(|event| parse_ids(&event.subscriber_ids))
            .collect();

        let car_ids: Vec<i64> = car_ids.into_iter().collect();
        let subscriber_ids: Vec<i64> = subscriber_ids.into_iter().collect();

        let cars = self.loader.load_cars(&car_ids).await?;
        let subscribers = self.loader.load_subscribers(&subscriber_ids).await?;

        let snapshot = ConfigurationSnapshot::build(&events, cars, subscribers);
        let active = snapshot.events.len();
        self.context.update_configuration(snapshot);
        Ok(active)
    }

    /// Refreshes immediately, then every interval, until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            refresh_interval_ms = self.refresh_interval.as_millis() as u64,
            "Configuration refresher started"
        );

        while !cancel.is_cancelled() {
            match self.refresh_once(Utc::now()).await {
                Ok(active) => info!(active_events = active, "Configuration refreshed"),
                Err(err) => error!(error = %err, "Configuration refresh failed, keeping previous snapshot"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.refresh_interval) => {}
            }
        }

        info!("Configuration refresher stopped");
    }
}
