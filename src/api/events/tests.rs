//! Gateway tests against the real router

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::server::testing::test_app;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_event(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn event_body(session: &str, kind: &str) -> String {
    json!({
        "source_app": "agent",
        "session_id": session,
        "hook_event_type": kind,
        "payload": {}
    })
    .to_string()
}

#[tokio::test]
async fn test_post_then_recent() {
    let (app, _services) = test_app().await;

    let (status, stored) = send(&app, post_event(event_body("s1", "SessionStart"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["hook_event_type"], "SessionStart");
    assert!(stored["id"].as_i64().unwrap() > 0);
    assert!(stored["timestamp"].as_i64().unwrap() > 0);

    let (status, recent) = send(&app, get("/events/recent?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    let recent = recent.as_array().unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["hook_event_type"], "SessionStart");
}

#[tokio::test]
async fn test_recent_preserves_insertion_order() {
    let (app, _services) = test_app().await;
    send(&app, post_event(event_body("s1", "PreToolUse"))).await;
    send(&app, post_event(event_body("s2", "PreToolUse"))).await;

    let (_, recent) = send(&app, get("/events/recent?limit=10")).await;
    let sessions: Vec<&str> = recent
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["session_id"].as_str().unwrap())
        .collect();
    assert_eq!(sessions, vec!["s1", "s2"]);
}

#[tokio::test]
async fn test_missing_session_is_rejected_and_never_stored() {
    let (app, _services) = test_app().await;
    let body = json!({"source_app": "agent", "hook_event_type": "Stop", "payload": {}});

    let (status, response) = send(&app, post_event(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert!(response["error"].as_str().unwrap().contains("session_id"));

    let (_, recent) = send(&app, get("/events/recent?limit=10")).await;
    assert!(recent.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (app, _services) = test_app().await;
    let (status, response) = send(&app, post_event("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
}

#[tokio::test]
async fn test_ingest_pushes_to_live_viewers() {
    let (app, services) = test_app().await;
    let mut viewer = services.hub.add(&[]).unwrap();

    send(&app, post_event(event_body("s1", "Notification"))).await;

    let initial: Value = serde_json::from_str(&viewer.receiver.recv().await.unwrap()).unwrap();
    assert_eq!(initial["type"], "initial");
    let live: Value = serde_json::from_str(&viewer.receiver.recv().await.unwrap()).unwrap();
    assert_eq!(live["type"], "event");
    assert_eq!(live["data"]["hook_event_type"], "Notification");
}

#[tokio::test]
async fn test_clear_wipes_log_and_resets_viewers() {
    let (app, services) = test_app().await;
    for _ in 0..3 {
        send(&app, post_event(event_body("s1", "PreToolUse"))).await;
    }
    let mut viewer = services.hub.add(&[]).unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri("/events/clear")
        .body(Body::empty())
        .unwrap();
    let (status, response) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);
    assert_eq!(response["deleted"], 3);

    let (_, recent) = send(&app, get("/events/recent?limit=50")).await;
    assert!(recent.as_array().unwrap().is_empty());

    viewer.receiver.recv().await.unwrap();
    let frame: Value = serde_json::from_str(&viewer.receiver.recv().await.unwrap()).unwrap();
    assert_eq!(frame["type"], "clear");
}

#[tokio::test]
async fn test_filter_options_and_session_route() {
    let (app, _services) = test_app().await;
    send(&app, post_event(event_body("s1", "SessionStart"))).await;
    send(&app, post_event(event_body("s2", "Stop"))).await;
    send(&app, post_event(event_body("s1", "Stop"))).await;

    let (_, options) = send(&app, get("/events/filter-options")).await;
    assert_eq!(options["source_apps"], json!(["agent"]));
    assert_eq!(options["hook_event_types"], json!(["SessionStart", "Stop"]));
    assert_eq!(options["session_ids"].as_array().unwrap().len(), 2);

    let (_, session) = send(&app, get("/events/session/s1")).await;
    assert_eq!(session.as_array().unwrap().len(), 2);

    let (_, filtered) = send(&app, get("/events/recent?hook_event_type=Stop&session_id=s2")).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unified_logs_include_stored_events() {
    let (app, _services) = test_app().await;
    send(&app, post_event(event_body("s1", "SessionStart"))).await;

    let (status, feed) = send(&app, get("/logs/unified?limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["ok"], true);
    assert_eq!(feed["total"], 1);
    assert_eq!(feed["logs"][0]["type"], "spawn");
    assert_eq!(feed["diagnostics"]["skipped_records"], 0);
}

#[tokio::test]
async fn test_health_routes() {
    let (app, _services) = test_app().await;

    let (status, health) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (_, detailed) = send(&app, get("/health/detailed")).await;
    assert_eq!(detailed["status"], "healthy");
    assert_eq!(detailed["checks"]["hub"]["details"]["connections"], 0);
    assert_eq!(detailed["checks"]["redis"]["details"]["backend"], "memory");
}
