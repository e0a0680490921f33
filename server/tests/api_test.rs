//! HTTP API tests driving the router directly.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::{harness, Harness, FEED};
use markersync_server::build_app;
use markersync_server::handlers::process_message;
use markersync_server::sync::SyncTrigger;
use markersync_server::websocket::ServerMessage;
use serde_json::Value;
use tower::ServiceExt;

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

async fn synced() -> (Harness, Router) {
    let h = harness(FEED).await;
    h.state.sync.run(SyncTrigger::Startup).await.unwrap();
    let app = build_app(h.state.clone());
    (h, app)
}

#[tokio::test]
async fn health_reports_cache_size() {
    let (_h, app) = synced().await;

    let (status, body) = send(&app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["markers"], 3);
    assert_eq!(body["syncRunning"], false);
}

#[tokio::test]
async fn list_markers() {
    let (_h, app) = synced().await;

    let (status, body) = send(&app, Method::GET, "/markers").await;
    assert_eq!(status, StatusCode::OK);
    let markers = body.as_array().unwrap();
    assert_eq!(markers.len(), 3);
    assert_eq!(markers[0]["externalId"], "5540f2a1");
    assert_eq!(markers[0]["lat"], 53.5417);
    assert!(markers[2]["address"].is_null());
}

#[tokio::test]
async fn list_markers_with_selection() {
    let (_h, app) = synced().await;

    let (_, body) = send(&app, Method::GET, "/markers?name=Harbour").await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/markers?externalId=5540f2b7").await;
    assert_eq!(body[0]["name"], "Old Town");

    let (_, body) = send(&app, Method::GET, "/markers?name=Nowhere").await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn get_marker_by_row_id_and_selection() {
    let (_h, app) = synced().await;

    let (_, list) = send(&app, Method::GET, "/markers").await;
    let row_id = list[1]["rowId"].as_i64().unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/markers/{}", row_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["externalId"], "5540f2b7");

    // Row exists, but the extra selection rules it out.
    let (status, body) =
        send(&app, Method::GET, &format!("/markers/{}?name=Harbour", row_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("marker"));

    let (status, _) = send(&app, Method::GET, "/markers/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/markers/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_before_and_after_a_cycle() {
    let h = harness(FEED).await;
    let app = build_app(h.state.clone());

    let (status, _) = send(&app, Method::GET, "/sync/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, report) = send(&app, Method::POST, "/sync").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["trigger"], "manual");
    assert_eq!(report["outcome"], "succeeded");
    assert_eq!(report["stats"]["inserted"], 3);

    let (status, last) = send(&app, Method::GET, "/sync/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last, report);
}

#[tokio::test]
async fn manual_sync_reports_failures() {
    let (h, app) = synced().await;
    h.feed.set("<html>maintenance</html>");

    let (status, report) = send(&app, Method::POST, "/sync").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["outcome"], "failed");
    assert_eq!(report["stats"]["parseErrors"], 1);
    assert!(report["error"].as_str().unwrap().contains("malformed feed"));

    let (_, health) = send(&app, Method::GET, "/health").await;
    assert_eq!(health["markers"], 3);
}

#[tokio::test]
async fn unknown_route() {
    let (_h, app) = synced().await;
    let (status, _) = send(&app, Method::GET, "/records").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn root_banner() {
    let (_h, app) = synced().await;
    let (status, body) = send(&app, Method::GET, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Markersync Cache Server".to_string()));
}

#[tokio::test]
async fn websocket_ping_and_sync_messages() {
    let h = harness(FEED).await;

    let pong = process_message(r#"{"type": "ping"}"#, &h.state.sync).await;
    assert!(matches!(pong, ServerMessage::Pong));

    let reply = process_message(
        r#"{"type": "sync", "request_id": "r-1"}"#,
        &h.state.sync,
    )
    .await;
    match reply {
        ServerMessage::SyncResult { report, request_id } => {
            assert_eq!(request_id.as_deref(), Some("r-1"));
            assert_eq!(report.trigger, SyncTrigger::WebSocket);
            assert_eq!(report.stats.inserted, 3);
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    let garbage = process_message("hello", &h.state.sync).await;
    assert!(matches!(garbage, ServerMessage::Error { .. }));
}
