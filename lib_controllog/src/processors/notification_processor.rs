//! # Notification Processor
//!
//! Texts subscribers when a control-log entry about one of their cars appears
//! or is edited.
//!
//! Every `(event, car, order id)` seen on a subscribed car is tracked with the
//! field values it had when last seen:
//!
//! - unseen key: tracked, and announced as `NEW Penalty:`;
//! - seen key with different fields: re-tracked, announced as `Penalty Update:`;
//! - seen key with identical fields: nothing to send.
//!
//! The first processing cycle after start-up only records state: its log is
//! history that was already announced before a restart. The cycle is the set
//! of events in the snapshot handed to the very first `process` call; once each
//! of them has been processed once, suppression is over for good. An event that
//! becomes active later is announced normally from its first poll.
//!
//! An entry naming two subscribed cars is sent once per subscriber, not once per
//! car. Every subscriber of an event follows all of its cars, so a per-car send
//! would text the same incident twice.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::core::LogProcessor;
use crate::error::Result;
use crate::model::{ConfigurationSnapshot, ControlLogEntry, EventSubscription};
use crate::notify::SmsGateway;

/// Which template a message uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// First sighting of an entry.
    New,
    /// An already announced entry was edited.
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    event_id: i64,
    car: String,
    order_id: u32,
}

/// One message to send and who gets it.
#[derive(Debug)]
struct Notice {
    kind: NoticeKind,
    entry: ControlLogEntry,
    subscribers: BTreeSet<i64>,
}

/// Builds the SMS body for an entry.
pub fn format_message(kind: NoticeKind, entry: &ControlLogEntry) -> String {
    let heading = match kind {
        NoticeKind::New => "NEW Penalty:",
        NoticeKind::Update => "Penalty Update:",
    };
    let cars = entry.car_numbers().collect::<Vec<_>>().join("/");

    let mut lines = vec![
        format!("{heading} {}", entry.timestamp.format("%-I:%M %p")),
        format!("Car: {cars}"),
        format!("Note: {}", entry.note),
        format!("Status: {}", entry.status),
    ];
    if !entry.penalty_action.trim().is_empty() {
        lines.push(format!("Penalty: {}", entry.penalty_action));
    }
    if !entry.other_notes.trim().is_empty() {
        lines.push(format!("Other: {}", entry.other_notes));
    }
    lines.join("\n")
}

/// Sends penalty texts to subscribers.
pub struct NotificationProcessor {
    gateway: Arc<dyn SmsGateway>,
    from_number: String,
    tracked: Mutex<HashMap<EntryKey, ControlLogEntry>>,
    startup: Mutex<StartupCycle>,
}

/// Progress of the one-shot start-up suppression.
#[derive(Debug)]
enum StartupCycle {
    /// No `process` call yet.
    Pending,
    /// Events of the first cycle not processed yet.
    Priming(HashSet<i64>),
    /// Suppression is over.
    Done,
}

impl NotificationProcessor {
    /// Creates a processor sending from `from_number`.
    pub fn new(gateway: Arc<dyn SmsGateway>, from_number: impl Into<String>) -> Self {
        Self {
            gateway,
            from_number: from_number.into(),
            tracked: Mutex::new(HashMap::new()),
            startup: Mutex::new(StartupCycle::Pending),
        }
    }

    /// Whether the next `process` call for `event_id` will only record state.
    pub fn is_first_update(&self, event_id: i64) -> bool {
        match &*self.startup.lock().unwrap_or_else(PoisonError::into_inner) {
            StartupCycle::Pending => true,
            StartupCycle::Priming(pending) => pending.contains(&event_id),
            StartupCycle::Done => false,
        }
    }

    /// Advances the start-up cycle for one call; true if the call is suppressed.
    fn prime(&self, event_id: i64, snapshot: &ConfigurationSnapshot) -> bool {
        let mut startup = self.startup.lock().unwrap_or_else(PoisonError::into_inner);

        if let StartupCycle::Pending = *startup {
            let mut first_cycle: HashSet<i64> =
                snapshot.events.iter().map(|event| event.event_id).collect();
            first_cycle.insert(event_id);
            *startup = StartupCycle::Priming(first_cycle);
        }

        let (suppress, finished) = match &mut *startup {
            StartupCycle::Priming(pending) => {
                let suppress = pending.remove(&event_id);
                (suppress, pending.is_empty())
            }
            _ => (false, false),
        };
        if finished {
            *startup = StartupCycle::Done;
        }
        suppress
    }

    /// Compares the log against tracked state, updates it and returns what to send.
    fn evaluate(
        &self,
        event: &EventSubscription,
        log: &[ControlLogEntry],
        snapshot: &ConfigurationSnapshot,
        suppress: bool,
    ) -> Vec<Notice> {
        let subscriptions = snapshot.car_subscriptions(event.event_id);
        if subscriptions.is_empty() {
            return Vec::new();
        }

        let mut tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
        let mut notices = Vec::new();

        for entry in log {
            let mut kind: Option<NoticeKind> = None;
            let mut recipients = BTreeSet::new();

            for car in entry.car_numbers() {
                let car = car.to_uppercase();
                let Some(subscribers) = subscriptions.get(&car).filter(|s| !s.is_empty()) else {
                    continue;
                };

                let key = EntryKey {
                    event_id: event.event_id,
                    car,
                    order_id: entry.order_id,
                };
                let transition = match tracked.get(&key) {
                    None => Some(NoticeKind::New),
                    Some(previous) if previous.has_changed(entry) => Some(NoticeKind::Update),
                    Some(_) => None,
                };
                tracked.insert(key, entry.clone());

                if let Some(transition) = transition {
                    // An entry that is new for either car is announced as new.
                    kind = match (kind, transition) {
                        (Some(NoticeKind::New), _) | (_, NoticeKind::New) => Some(NoticeKind::New),
                        _ => Some(NoticeKind::Update),
                    };
                    recipients.extend(subscribers.iter().copied());
                }
            }

            if suppress {
                continue;
            }
            if let Some(kind) = kind {
                notices.push(Notice {
                    kind,
                    entry: entry.clone(),
                    subscribers: recipients,
                });
            }
        }

        notices
    }

    async fn send_notice(&self, event: &EventSubscription, notice: &Notice, snapshot: &ConfigurationSnapshot) -> usize {
        let body = format_message(notice.kind, &notice.entry);

        let sends = notice
            .subscribers
            .iter()
            .filter_map(|id| match snapshot.subscriber(*id) {
                Some(subscriber) if subscriber.can_receive_sms() => Some(subscriber),
                Some(_) => {
                    debug!(subscriber_id = id, "Subscriber not confirmed, skipping");
                    None
                }
                None => {
                    warn!(subscriber_id = id, "Subscriber missing from configuration");
                    None
                }
            })
            .map(|subscriber| {
                let body = body.as_str();
                async move {
                    match self.gateway.send(&self.from_number, &subscriber.phone_number, body).await {
                        Ok(receipt) if receipt.is_error() => {
                            warn!(
                                event_id = event.event_id,
                                subscriber_id = subscriber.id,
                                error = receipt.error_message.as_deref().unwrap_or_default(),
                                "SMS rejected by gateway"
                            );
                            false
                        }
                        Ok(_) => true,
                        Err(err) => {
                            error!(
                                event_id = event.event_id,
                                subscriber_id = subscriber.id,
                                error = %err,
                                "SMS send failed"
                            );
                            false
                        }
                    }
                }
            });

        join_all(sends).await.into_iter().filter(|sent| *sent).count()
    }
}

#[async_trait]
impl LogProcessor for NotificationProcessor {
    fn name(&self) -> &str {
        "notification"
    }

    async fn process(
        &self,
        event: &EventSubscription,
        log: &[ControlLogEntry],
        snapshot: &ConfigurationSnapshot,
    ) -> Result<()> {
        let suppress = self.prime(event.event_id, snapshot);
        let notices = self.evaluate(event, log, snapshot, suppress);

        for notice in &notices {
            let sent = self.send_notice(event, notice, snapshot).await;
            info!(
                event_id = event.event_id,
                order_id = notice.entry.order_id,
                kind = ?notice.kind,
                recipients = notice.subscribers.len(),
                sent,
                "Penalty notification sent"
            );
        }

        if suppress {
            debug!(event_id = event.event_id, "Initial control log recorded without notifications");
        }
        Ok(())
    }
}
