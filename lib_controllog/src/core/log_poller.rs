//! # Log Poller
//!
//! Drives the poll loop on a fixed interval.
//!
//! ## Workflow per tick:
//! 1.  Take the current `ConfigurationSnapshot`.
//! 2.  Group active events by `(source type, source parameter)` so a feed shared
//!     by several events is fetched once.
//! 3.  For each group, resolve the source and fetch the log. An unknown source
//!     type or a failed fetch skips that group only.
//! 4.  Hand the log to every processor for every event in the group. Each
//!     `(event, processor)` pair runs as its own task; a failure or panic in one
//!     is logged and does not touch its siblings.
//! 5.  Wait for all of it, then sleep out the rest of the interval, measured from
//!     the start of the tick.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::join_all;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::configuration_context::ConfigurationContext;
use crate::core::processor::LogProcessor;
use crate::error::{ControlLogError, Result};
use crate::model::{ConfigurationSnapshot, ControlLogEntry, EventSubscription};
use crate::sources::SourceRegistry;

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Distinct `(source type, parameter)` groups.
    pub groups: usize,
    /// Groups whose log was fetched.
    pub fetched: usize,
    /// Groups skipped for an unknown source type or a failed fetch.
    pub skipped: usize,
    /// `(event, processor)` tasks dispatched.
    pub dispatched: usize,
    /// Dispatched tasks that returned an error or panicked.
    pub failed: usize,
}

impl TickSummary {
    fn absorb(&mut self, group: GroupOutcome) {
        match group {
            GroupOutcome::Skipped => self.skipped += 1,
            GroupOutcome::Processed { dispatched, failed } => {
                self.fetched += 1;
                self.dispatched += dispatched;
                self.failed += failed;
            }
        }
    }
}

enum GroupOutcome {
    Skipped,
    Processed { dispatched: usize, failed: usize },
}

/// Groups events by the external target they read from.
pub fn group_by_source(
    events: &[EventSubscription],
) -> BTreeMap<(String, String), Vec<Arc<EventSubscription>>> {
    let mut groups: BTreeMap<(String, String), Vec<Arc<EventSubscription>>> = BTreeMap::new();
    for event in events {
        groups
            .entry(event.source_key())
            .or_default()
            .push(Arc::new(event.clone()));
    }
    groups
}

/// The poll loop.
pub struct LogPoller {
    context: Arc<ConfigurationContext>,
    sources: SourceRegistry,
    processors: Vec<Arc<dyn LogProcessor>>,
    poll_interval: Duration,
}

impl LogPoller {
    /// Creates a poller. The interval is expected to be validated already.
    pub fn new(
        context: Arc<ConfigurationContext>,
        sources: SourceRegistry,
        processors: Vec<Arc<dyn LogProcessor>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            context,
            sources,
            processors,
            poll_interval,
        }
    }

    /// Runs ticks until `cancel` fires. A tick in progress always finishes.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            sources = self.sources.len(),
            processors = self.processors.len(),
            "Log poller started"
        );

        while !cancel.is_cancelled() {
            let started = Instant::now();
            let summary = self.poll_once().await;
            debug!(
                groups = summary.groups,
                fetched = summary.fetched,
                skipped = summary.skipped,
                dispatched = summary.dispatched,
                failed = summary.failed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Poll tick complete"
            );

            let wait = self.poll_interval.saturating_sub(started.elapsed());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("Log poller stopped");
    }

    /// Runs a single tick.
    pub async fn poll_once(&self) -> TickSummary {
        self.poll_at(Utc::now()).await
    }

    /// Runs a single tick as of `now_utc`.
    pub async fn poll_at(&self, now_utc: DateTime<Utc>) -> TickSummary {
        let snapshot = self.context.get_configuration();
        let groups = group_by_source(&snapshot.events);

        let mut summary = TickSummary {
            groups: groups.len(),
            ..Default::default()
        };

        let outcomes = join_all(
            groups
                .into_iter()
                .map(|(key, events)| self.poll_group(key, events, Arc::clone(&snapshot), now_utc)),
        )
        .await;

        for outcome in outcomes {
            summary.absorb(outcome);
        }
        summary
    }

    async fn poll_group(
        &self,
        (source_type, parameter): (String, String),
        events: Vec<Arc<EventSubscription>>,
        snapshot: Arc<ConfigurationSnapshot>,
        now_utc: DateTime<Utc>,
    ) -> GroupOutcome {
        // Events sharing a feed share a venue; the first one dates time-only cells.
        let local_day = events
            .first()
            .map_or_else(|| now_utc.date_naive(), |event| event.local_today(now_utc));

        let log = match self.fetch(&source_type, &parameter, local_day).await {
            Ok(log) => Arc::new(log),
            Err(ControlLogError::UnsupportedSourceType(_)) => {
                warn!(
                    source_type = %source_type,
                    parameter = %parameter,
                    events = events.len(),
                    "No control log source registered for type, skipping"
                );
                return GroupOutcome::Skipped;
            }
            Err(err) => {
                error!(
                    source_type = %source_type,
                    parameter = %parameter,
                    error = %err,
                    "Control log fetch failed"
                );
                return GroupOutcome::Skipped;
            }
        };

        let (dispatched, failed) = self.dispatch(events, log, snapshot).await;
        GroupOutcome::Processed { dispatched, failed }
    }

    async fn fetch(
        &self,
        source_type: &str,
        parameter: &str,
        local_day: NaiveDate,
    ) -> Result<Vec<ControlLogEntry>> {
        let source = self.sources.resolve(source_type)?;
        source.load_control_log_for_day(parameter, local_day).await
    }

    async fn dispatch(
        &self,
        events: Vec<Arc<EventSubscription>>,
        log: Arc<Vec<ControlLogEntry>>,
        snapshot: Arc<ConfigurationSnapshot>,
    ) -> (usize, usize) {
        let mut tasks = JoinSet::new();

        for event in &events {
            for processor in &self.processors {
                let event = Arc::clone(event);
                let log = Arc::clone(&log);
                let snapshot = Arc::clone(&snapshot);
                let processor = Arc::clone(processor);

                tasks.spawn(async move {
                    let outcome = processor.process(&event, &log, &snapshot).await;
                    if let Err(err) = &outcome {
                        error!(
                            event_id = event.event_id,
                            processor = processor.name(),
                            error = %err,
                            "Log processor failed"
                        );
                    }
                    outcome.is_ok()
                });
            }
        }

        let mut dispatched = 0;
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            dispatched += 1;
            match joined {
                Ok(true) => {}
                Ok(false) => failed += 1,
                Err(join_err) => {
                    error!(error = %join_err, "Log processor task panicked");
                    failed += 1;
                }
            }
        }
        (dispatched, failed)
    }
}
