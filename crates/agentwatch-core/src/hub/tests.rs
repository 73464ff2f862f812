//! Tests for the broadcast hub

use super::*;
use serde_json::{json, Value};

fn stored(id: i64) -> StoredEvent {
    StoredEvent {
        id,
        source_app: "agent".to_string(),
        session_id: "s1".to_string(),
        hook_event_type: "PostToolUse".to_string(),
        payload: json!({}),
        chat: None,
        summary: None,
        timestamp: id * 1_000,
        model_name: None,
    }
}

fn parse(frame: &str) -> Value {
    serde_json::from_str(frame).unwrap()
}

#[tokio::test]
async fn test_initial_frame_precedes_live_events() {
    let hub = ConnectionManager::new(8);
    let backlog: Vec<_> = (1..=3).map(stored).collect();
    let mut conn = hub.add(&backlog).unwrap();

    assert_eq!(hub.broadcast_event(&stored(4)), 1);

    let first = parse(&conn.receiver.recv().await.unwrap());
    assert_eq!(first["type"], "initial");
    assert_eq!(first["data"].as_array().unwrap().len(), 3);

    let second = parse(&conn.receiver.recv().await.unwrap());
    assert_eq!(second["type"], "event");
    assert_eq!(second["data"]["id"], 4);
}

#[tokio::test]
async fn test_broadcast_reaches_every_connection() {
    let hub = ConnectionManager::new(8);
    let mut a = hub.add(&[]).unwrap();
    let mut b = hub.add(&[]).unwrap();
    assert_eq!(hub.connection_count(), 2);

    assert_eq!(hub.broadcast_clear(), 2);

    for conn in [&mut a, &mut b] {
        conn.receiver.recv().await.unwrap();
        let frame = parse(&conn.receiver.recv().await.unwrap());
        assert_eq!(frame["type"], "clear");
    }
}

#[tokio::test]
async fn test_full_buffer_evicts_connection() {
    let hub = ConnectionManager::new(2);
    let mut slow = hub.add(&[]).unwrap();
    let mut fast = hub.add(&[]).unwrap();

    // Drain the fast viewer's catch-up so it has room; the slow one never reads.
    fast.receiver.recv().await.unwrap();

    assert_eq!(hub.broadcast_event(&stored(1)), 2);
    fast.receiver.recv().await.unwrap();

    // slow: initial + event 1 fill its buffer of two
    assert_eq!(hub.broadcast_event(&stored(2)), 1);
    assert_eq!(hub.connection_count(), 1);

    // Evicted connection sees what was buffered, then the end of stream
    assert!(slow.receiver.recv().await.is_some());
    assert!(slow.receiver.recv().await.is_some());
    assert!(slow.receiver.recv().await.is_none());

    let live = parse(&fast.receiver.recv().await.unwrap());
    assert_eq!(live["data"]["id"], 2);
}

#[tokio::test]
async fn test_dropped_receiver_is_evicted() {
    let hub = ConnectionManager::new(4);
    let conn = hub.add(&[]).unwrap();
    drop(conn);

    assert_eq!(hub.broadcast_event(&stored(1)), 0);
    assert_eq!(hub.connection_count(), 0);
}

#[test]
fn test_remove() {
    let hub = ConnectionManager::default();
    let conn = hub.add(&[]).unwrap();
    assert!(hub.remove(conn.id));
    assert!(!hub.remove(conn.id));
    assert_eq!(hub.connection_count(), 0);
}

#[tokio::test]
async fn test_close_all_rejects_new_connections() {
    let hub = ConnectionManager::new(4);
    let mut conn = hub.add(&[]).unwrap();

    assert_eq!(hub.close_all(), 1);
    assert!(!hub.is_accepting());
    assert!(matches!(hub.add(&[]), Err(Error::ShuttingDown)));

    // catch-up frame still buffered, then closed
    assert!(conn.receiver.recv().await.is_some());
    assert!(conn.receiver.recv().await.is_none());
}

#[tokio::test]
async fn test_zero_buffer_still_delivers_catch_up() {
    let hub = ConnectionManager::new(0);
    let mut conn = hub.add(&[stored(1)]).unwrap();
    assert_eq!(hub.connection_count(), 1);

    let first = parse(&conn.receiver.recv().await.unwrap());
    assert_eq!(first["type"], "initial");
    assert_eq!(first["data"][0]["id"], 1);
}
