//! Integration tests for Agentwatch
//!
//! These tests verify the integration between the crates:
//! - agentwatch-store: event log persistence
//! - agentwatch-core: push hub, pub/sub bridge and unified aggregator

use std::sync::Arc;
use std::time::Duration;

use agentwatch_core::{
    BridgeFrame, Broker, BrokerMessage, BrokerSubscription, ConnectionManager, LogType,
    MemoryKeySpace, PubSubBridge, UnifiedAggregator,
};
use agentwatch_store::{EventStore, EventStoreTrait, NewEvent};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_test::assert_ok;

fn event(session: &str, kind: &str) -> NewEvent {
    NewEvent::new("agent", session, kind, json!({}))
}

// ============================================================================
// Store + Hub
// ============================================================================

#[tokio::test]
async fn test_catch_up_is_bounded_and_precedes_live_events() {
    let store = EventStore::in_memory().await.unwrap();
    for i in 0..60 {
        store.append(event(&format!("s{i}"), "PreToolUse")).await.unwrap();
    }
    let hub = ConnectionManager::new(64);

    let catch_up = store.recent(50).await.unwrap();
    let mut viewer = hub.add(&catch_up).unwrap();

    let live = store.append(event("live", "Stop")).await.unwrap();
    assert_eq!(hub.broadcast_event(&live), 1);

    let initial: Value = serde_json::from_str(&viewer.receiver.recv().await.unwrap()).unwrap();
    assert_eq!(initial["type"], "initial");
    let data = initial["data"].as_array().unwrap();
    assert_eq!(data.len(), 50);
    assert_eq!(data[0]["session_id"], "s10");
    assert_eq!(data[49]["session_id"], "s59");

    let next: Value = serde_json::from_str(&viewer.receiver.recv().await.unwrap()).unwrap();
    assert_eq!(next["type"], "event");
    assert_eq!(next["data"]["session_id"], "live");
}

#[tokio::test]
async fn test_small_log_is_sent_whole() {
    let store = EventStore::in_memory().await.unwrap();
    for _ in 0..3 {
        store.append(event("s1", "Notification")).await.unwrap();
    }
    let hub = ConnectionManager::default();
    let mut viewer = hub.add(&store.recent(50).await.unwrap()).unwrap();

    let initial: Value = serde_json::from_str(&viewer.receiver.recv().await.unwrap()).unwrap();
    assert_eq!(initial["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_store_persists_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.db");

    let store = assert_ok!(EventStore::from_path(&path).await);
    store.append(event("s1", "SessionStart")).await.unwrap();
    store.close().await;

    let reopened = assert_ok!(EventStore::from_path(&path).await);
    assert_eq!(reopened.count().await.unwrap(), 1);
}

// ============================================================================
// Bridge
// ============================================================================

struct RefusingBroker;

#[async_trait]
impl Broker for RefusingBroker {
    async fn subscribe(
        &self,
        _channels: &[String],
    ) -> agentwatch_core::Result<Box<dyn BrokerSubscription>> {
        Err(agentwatch_core::Error::Broker("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "refusing"
    }
}

/// Broker that reports when its subscription is released
struct TrackingBroker {
    released: Mutex<Option<oneshot::Sender<()>>>,
}

struct TrackingSubscription {
    feed: mpsc::Receiver<agentwatch_core::Result<BrokerMessage>>,
    _feed_tx: mpsc::Sender<agentwatch_core::Result<BrokerMessage>>,
    released: Option<oneshot::Sender<()>>,
}

#[async_trait]
impl Broker for TrackingBroker {
    async fn subscribe(
        &self,
        _channels: &[String],
    ) -> agentwatch_core::Result<Box<dyn BrokerSubscription>> {
        let (tx, rx) = mpsc::channel(1);
        Ok(Box::new(TrackingSubscription {
            feed: rx,
            _feed_tx: tx,
            released: self.released.lock().await.take(),
        }))
    }

    fn name(&self) -> &str {
        "tracking"
    }
}

#[async_trait]
impl BrokerSubscription for TrackingSubscription {
    async fn next_message(&mut self) -> Option<agentwatch_core::Result<BrokerMessage>> {
        self.feed.recv().await
    }

    async fn unsubscribe(&mut self) -> agentwatch_core::Result<()> {
        if let Some(released) = self.released.take() {
            let _ = released.send(());
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_unreachable_broker_yields_one_error_then_closes() {
    let bridge = PubSubBridge::new(Arc::new(RefusingBroker), 8);
    let mut stream = bridge.open(vec!["orchestration.events".to_string()]);

    let frame = stream.next().await.unwrap();
    assert!(matches!(frame, BridgeFrame::Error { .. }));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_dropped_relay_releases_subscription() {
    let (tx, rx) = oneshot::channel();
    let bridge = PubSubBridge::new(
        Arc::new(TrackingBroker {
            released: Mutex::new(Some(tx)),
        }),
        8,
    );

    let stream = bridge.open(vec!["orchestration.events".to_string()]);
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(stream);

    assert_ok!(tokio::time::timeout(Duration::from_secs(1), rx).await);
}

// ============================================================================
// Aggregator
// ============================================================================

#[tokio::test]
async fn test_completed_task_has_one_spawn_and_one_complete() {
    let keys = MemoryKeySpace::new();
    keys.set_hash(
        "algomind.hybrid.task.h1",
        [
            ("status", "completed"),
            ("created_at", "2024-05-01T09:00:00"),
            ("updated_at", "2024-05-01T09:05:00"),
            ("task", "refactor parser"),
        ],
    );

    let report = UnifiedAggregator::new(Arc::new(keys))
        .aggregate(100)
        .await
        .unwrap();

    let spawns = report.logs.iter().filter(|e| e.log_type == LogType::Spawn).count();
    let completes = report
        .logs
        .iter()
        .filter(|e| e.log_type == LogType::Complete)
        .count();
    assert_eq!((spawns, completes), (1, 1));
}

#[tokio::test]
async fn test_invalid_log_line_is_skipped() {
    let keys = MemoryKeySpace::new();
    let mut lines: Vec<String> = (0..4)
        .map(|i| {
            json!({
                "timestamp": format!("2024-05-01T10:0{i}:00"),
                "type": "output",
                "message": format!("line {i}")
            })
            .to_string()
        })
        .collect();
    lines.insert(2, "not json".to_string());
    keys.set_list("algomind.agent.CLAUDE.logs", lines);

    let report = UnifiedAggregator::new(Arc::new(keys))
        .aggregate(100)
        .await
        .unwrap();
    assert_eq!(report.logs.len(), 4);
    assert_eq!(report.diagnostics.skipped_entries, 1);
}

#[tokio::test]
async fn test_feed_merges_events_and_task_records() {
    let store: Arc<dyn EventStoreTrait> = Arc::new(EventStore::in_memory().await.unwrap());
    store
        .append(event("s1", "SessionStart").with_timestamp(1_714_560_000_000))
        .await
        .unwrap();

    let keys = MemoryKeySpace::new();
    keys.set_hash(
        "algomind.direct.claude.d1",
        [("status", "running"), ("created_at", "2024-05-01T08:00:00")],
    );

    let report = UnifiedAggregator::new(Arc::new(keys))
        .with_events(store, 200)
        .aggregate(100)
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert!(report
        .logs
        .iter()
        .any(|e| e.session_id.as_deref() == Some("s1")));
    assert!(report.logs.iter().any(|e| e.log_type == LogType::Status));
}
