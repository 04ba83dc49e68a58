//! # Configuration Snapshot
//!
//! Everything the poll loop needs to know about events, cars and subscribers,
//! built in one go by the refresh loop and swapped in whole.

use std::collections::{BTreeSet, HashMap};

use super::event::{Car, EventSetting, EventSubscription, Subscriber};

/// Immutable view of the active configuration.
///
/// Every car and subscriber id referenced by an event resolves to a record in
/// the lookup tables; `build` drops ids that do not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigurationSnapshot {
    /// Active events.
    pub events: Vec<EventSubscription>,
    /// Car id to car.
    pub cars: HashMap<i64, Car>,
    /// Subscriber id to subscriber.
    pub subscribers: HashMap<i64, Subscriber>,
}

impl ConfigurationSnapshot {
    /// Builds a snapshot from already-filtered active settings and the records
    /// they reference.
    pub fn build(active: &[EventSetting], cars: Vec<Car>, subscribers: Vec<Subscriber>) -> Self {
        let cars: HashMap<i64, Car> = cars.into_iter().map(|car| (car.id, car)).collect();
        let subscribers: HashMap<i64, Subscriber> =
            subscribers.into_iter().map(|sub| (sub.id, sub)).collect();

        let events = active
            .iter()
            .map(|setting| {
                let mut event = EventSubscription::from_setting(setting);
                event.car_ids.retain(|id| cars.contains_key(id));
                event.subscriber_ids.retain(|id| subscribers.contains_key(id));
                event
            })
            .collect();

        Self {
            events,
            cars,
            subscribers,
        }
    }

    /// Car number (trimmed, uppercased) to subscriber ids for one event.
    ///
    /// Every subscriber of the event follows every car of the event.
    pub fn car_subscriptions(&self, event_id: i64) -> HashMap<String, BTreeSet<i64>> {
        let Some(event) = self.events.iter().find(|e| e.event_id == event_id) else {
            return HashMap::new();
        };
        if event.subscriber_ids.is_empty() {
            return HashMap::new();
        }

        event
            .car_ids
            .iter()
            .filter_map(|id| self.cars.get(id))
            .map(|car| car.number.trim().to_uppercase())
            .filter(|number| !number.is_empty())
            .map(|number| (number, event.subscriber_ids.clone()))
            .collect()
    }

    /// Looks up a subscriber.
    pub fn subscriber(&self, id: i64) -> Option<&Subscriber> {
        self.subscribers.get(&id)
    }
}
