#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use lib_controllog::core::LogProcessor;
use lib_controllog::model::{
    Car, ConfigurationSnapshot, ControlLogEntry, EventSetting, EventSubscription, Subscriber,
};
use lib_controllog::notify::{SmsGateway, SmsReceipt};
use lib_controllog::sources::ControlLogSource;
use lib_controllog::{ControlLogError, Result};

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
}

pub fn entry(order_id: u32, car1: &str, note: &str) -> ControlLogEntry {
    let mut entry = ControlLogEntry::new(order_id, at(10, order_id), note);
    entry.car1 = car1.to_string();
    entry.status = "Under Review".to_string();
    entry
}

pub fn setting(id: i64, source_type: &str, parameter: &str, cars: &str, subs: &str) -> EventSetting {
    EventSetting {
        id,
        name: format!("Event {id}"),
        is_enabled: true,
        is_deleted: false,
        event_start: at(0, 0),
        event_end: at(0, 0),
        timezone: None,
        control_log_type: source_type.to_string(),
        control_log_parameter: parameter.to_string(),
        car_ids: cars.to_string(),
        subscriber_ids: subs.to_string(),
    }
}

pub fn car(id: i64, number: &str) -> Car {
    Car {
        id,
        number: number.to_string(),
    }
}

pub fn subscriber(id: i64, phone: &str, confirmed: bool) -> Subscriber {
    Subscriber {
        id,
        name: format!("Subscriber {id}"),
        phone_number: phone.to_string(),
        confirmed,
    }
}

pub fn snapshot(settings: &[EventSetting], cars: Vec<Car>, subs: Vec<Subscriber>) -> ConfigurationSnapshot {
    ConfigurationSnapshot::build(settings, cars, subs)
}

/// A source serving a fixed log and counting fetches per parameter.
pub struct CountingSource {
    pub tag: String,
    pub log: Mutex<Vec<ControlLogEntry>>,
    pub fetches: Mutex<Vec<String>>,
    pub days: Mutex<Vec<NaiveDate>>,
    pub fail: bool,
}

impl CountingSource {
    pub fn new(tag: &str, log: Vec<ControlLogEntry>) -> Self {
        Self {
            tag: tag.to_string(),
            log: Mutex::new(log),
            fetches: Mutex::new(Vec::new()),
            days: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing(tag: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(tag, Vec::new())
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl ControlLogSource for CountingSource {
    fn source_type(&self) -> &str {
        &self.tag
    }

    async fn load_control_log(&self, parameter: &str) -> Result<Vec<ControlLogEntry>> {
        self.fetches.lock().unwrap().push(parameter.to_string());
        if self.fail {
            return Err(ControlLogError::Fetch(format!("{parameter} unreachable")));
        }
        Ok(self.log.lock().unwrap().clone())
    }

    async fn load_control_log_for_day(
        &self,
        parameter: &str,
        local_day: NaiveDate,
    ) -> Result<Vec<ControlLogEntry>> {
        self.days.lock().unwrap().push(local_day);
        self.load_control_log(parameter).await
    }
}

/// Records every `(event id, log length)` it sees.
#[derive(Default)]
pub struct RecordingProcessor {
    pub seen: Mutex<Vec<(i64, usize)>>,
}

#[async_trait]
impl LogProcessor for RecordingProcessor {
    fn name(&self) -> &str {
        "recording"
    }

    async fn process(
        &self,
        event: &EventSubscription,
        log: &[ControlLogEntry],
        _snapshot: &ConfigurationSnapshot,
    ) -> Result<()> {
        self.seen.lock().unwrap().push((event.event_id, log.len()));
        Ok(())
    }
}

/// Fails or panics on every call.
pub struct BrokenProcessor {
    pub panic: bool,
}

#[async_trait]
impl LogProcessor for BrokenProcessor {
    fn name(&self) -> &str {
        "broken"
    }

    async fn process(
        &self,
        _event: &EventSubscription,
        _log: &[ControlLogEntry],
        _snapshot: &ConfigurationSnapshot,
    ) -> Result<()> {
        if self.panic {
            panic!("processor blew up");
        }
        Err(ControlLogError::Cache("sink offline".to_string()))
    }
}

/// Captures sent messages instead of texting anyone.
#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<(String, String)>>,
    pub calls: AtomicUsize,
}

impl RecordingGateway {
    pub fn messages(&self) -> Vec<(String, String)> {
        let mut sent = self.sent.lock().unwrap().clone();
        sent.sort();
        sent
    }
}

#[async_trait]
impl SmsGateway for RecordingGateway {
    async fn send(&self, _from: &str, to: &str, body: &str) -> Result<SmsReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(SmsReceipt {
            sid: Some("SM1".to_string()),
            status: Some("queued".to_string()),
            error_message: None,
        })
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}

/// Fails every send to `broken_number`, records the rest.
pub struct FlakyGateway {
    pub broken_number: String,
    pub delivered: RecordingGateway,
}

impl FlakyGateway {
    pub fn new(broken_number: &str) -> Self {
        Self {
            broken_number: broken_number.to_string(),
            delivered: RecordingGateway::default(),
        }
    }
}

#[async_trait]
impl SmsGateway for FlakyGateway {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<SmsReceipt> {
        if to == self.broken_number {
            return Err(ControlLogError::Sms(format!("{to} is not reachable")));
        }
        self.delivered.send(from, to, body).await
    }
}
