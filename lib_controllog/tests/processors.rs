mod support;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lib_controllog::core::LogProcessor;
use lib_controllog::model::{CachedControlLog, ConfigurationSnapshot};
use lib_controllog::processors::{CacheProcessor, LogCache, NotificationProcessor};
use lib_controllog::Result;

use support::*;

const FROM: &str = "+15550000000";
const ALICE: &str = "+15550000010";
const BOB: &str = "+15550000011";

fn race_snapshot() -> ConfigurationSnapshot {
    snapshot(
        &[setting(1, "google-sheets", "Race 1", "1;2", "10;11;12;99")],
        vec![car(1, "12"), car(2, "7a")],
        vec![
            subscriber(10, ALICE, true),
            subscriber(11, BOB, true),
            subscriber(12, "+15550000012", false),
        ],
    )
}

#[tokio::test]
async fn first_update_is_recorded_silently_then_changes_are_texted() {
    let gateway = shared(RecordingGateway::default());
    let processor = NotificationProcessor::new(gateway.clone(), FROM);
    let snapshot = race_snapshot();
    let event = &snapshot.events[0];

    // Startup: the existing log is only recorded.
    let mut log = vec![entry(1, "12", "Contact in T3")];
    assert!(processor.is_first_update(1));
    processor.process(event, &log, &snapshot).await.unwrap();
    assert!(!processor.is_first_update(1));
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

    // Same log again: still nothing.
    processor.process(event, &log, &snapshot).await.unwrap();
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

    // A new entry for a followed car reaches each confirmed subscriber once.
    log.push(entry(2, "7A", "Track limits"));
    processor.process(event, &log, &snapshot).await.unwrap();
    let sent = gateway.messages();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, ALICE);
    assert_eq!(sent[1].0, BOB);
    assert!(sent[0].1.starts_with("NEW Penalty:"));
    assert!(sent[0].1.contains("Note: Track limits"));

    // Editing that entry's note produces an update for the same subscribers.
    gateway.sent.lock().unwrap().clear();
    log[1].note = "Track limits, lap 4".to_string();
    processor.process(event, &log, &snapshot).await.unwrap();
    let sent = gateway.messages();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, ALICE);
    assert_eq!(sent[1].0, BOB);
    assert!(sent.iter().all(|(_, body)| body.starts_with("Penalty Update:")));
    assert!(sent[0].1.contains("Note: Track limits, lap 4"));

    // A status change on the older entry is an update too.
    gateway.sent.lock().unwrap().clear();
    log[0].status = "Drive Through".to_string();
    processor.process(event, &log, &snapshot).await.unwrap();
    let sent = gateway.messages();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].1.contains("Car: 12"));
    assert!(sent[0].1.contains("Status: Drive Through"));
}

#[tokio::test]
async fn entries_for_unfollowed_cars_are_ignored() {
    let gateway = shared(RecordingGateway::default());
    let processor = NotificationProcessor::new(gateway.clone(), FROM);
    let snapshot = race_snapshot();
    let event = &snapshot.events[0];

    processor.process(event, &[], &snapshot).await.unwrap();
    processor
        .process(event, &[entry(1, "99", "Unsafe release")], &snapshot)
        .await
        .unwrap();

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn an_entry_naming_two_followed_cars_is_sent_once_per_subscriber() {
    let gateway = shared(RecordingGateway::default());
    let processor = NotificationProcessor::new(gateway.clone(), FROM);
    let snapshot = race_snapshot();
    let event = &snapshot.events[0];

    processor.process(event, &[], &snapshot).await.unwrap();

    let mut incident = entry(1, "12", "Avoidable contact");
    incident.car2 = "7a".to_string();
    processor.process(event, &[incident], &snapshot).await.unwrap();

    let sent = gateway.messages();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].1.contains("Car: 12/7a"));
}

#[tokio::test]
async fn every_event_starts_silently_on_a_shared_tick() {
    let gateway = shared(RecordingGateway::default());
    let processor = NotificationProcessor::new(gateway.clone(), FROM);
    let snapshot = snapshot(
        &[
            setting(1, "google-sheets", "Race 1", "1", "10"),
            setting(2, "google-sheets", "Race 1", "1", "11"),
        ],
        vec![car(1, "12")],
        vec![subscriber(10, ALICE, true), subscriber(11, BOB, true)],
    );
    let log = vec![entry(1, "12", "Contact in T3")];

    for event in &snapshot.events {
        processor.process(event, &log, &snapshot).await.unwrap();
    }
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

    let mut next = log.clone();
    next.push(entry(2, "12", "Pit lane speeding"));
    for event in &snapshot.events {
        processor.process(event, &next, &snapshot).await.unwrap();
    }
    let sent = gateway.messages();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, ALICE);
    assert_eq!(sent[1].0, BOB);
}

#[tokio::test]
async fn an_event_activated_after_startup_announces_its_first_entries() {
    let gateway = shared(RecordingGateway::default());
    let processor = NotificationProcessor::new(gateway.clone(), FROM);
    let log = vec![entry(1, "12", "Contact in T3")];

    let startup = snapshot(
        &[setting(1, "google-sheets", "Race 1", "1", "10")],
        vec![car(1, "12")],
        vec![subscriber(10, ALICE, true), subscriber(11, BOB, true)],
    );
    processor.process(&startup.events[0], &log, &startup).await.unwrap();
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    assert!(!processor.is_first_update(2));

    let later = snapshot(
        &[
            setting(1, "google-sheets", "Race 1", "1", "10"),
            setting(2, "google-sheets", "Race 2", "1", "11"),
        ],
        vec![car(1, "12")],
        vec![subscriber(10, ALICE, true), subscriber(11, BOB, true)],
    );
    processor.process(&later.events[1], &log, &later).await.unwrap();

    let sent = gateway.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, BOB);
    assert!(sent[0].1.starts_with("NEW Penalty:"));
}

#[tokio::test]
async fn a_failed_send_does_not_block_other_subscribers() {
    let gateway = shared(FlakyGateway::new(ALICE));
    let processor = NotificationProcessor::new(gateway.clone(), FROM);
    let snapshot = race_snapshot();
    let event = &snapshot.events[0];

    processor.process(event, &[], &snapshot).await.unwrap();
    processor
        .process(event, &[entry(1, "12", "Unsafe release")], &snapshot)
        .await
        .unwrap();

    let delivered = gateway.delivered.messages();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, BOB);
}

#[derive(Default)]
struct RecordingCache {
    writes: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl LogCache for RecordingCache {
    async fn store_control_log(&self, event_id: i64, payload: &str) -> Result<()> {
        self.writes.lock().unwrap().push((event_id, payload.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn cache_is_written_per_event_only_when_the_log_changes() {
    let cache = Arc::new(RecordingCache::default());
    let processor = CacheProcessor::new(cache.clone());
    let snapshot = snapshot(
        &[
            setting(1, "google-sheets", "Race 1", "", ""),
            setting(2, "google-sheets", "Race 1", "", ""),
        ],
        vec![],
        vec![],
    );

    let mut log = vec![entry(1, "12", "Contact")];
    for event in &snapshot.events {
        processor.process(event, &log, &snapshot).await.unwrap();
        processor.process(event, &log, &snapshot).await.unwrap();
    }
    assert_eq!(cache.writes.lock().unwrap().len(), 2);

    log[0].penalty_action = "5 second penalty".to_string();
    processor.process(&snapshot.events[0], &log, &snapshot).await.unwrap();

    let writes = cache.writes.lock().unwrap();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[2].0, 1);
    let cached: CachedControlLog = serde_json::from_str(&writes[2].1).unwrap();
    assert_eq!(cached.log, log);
}
