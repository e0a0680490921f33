//! Integration tests for sync cycles against an in-memory SQLite cache.

mod common;

use common::{harness, harness_with_policy, FEED};
use markersync_engine::{AbsentIdPolicy, MarkerFilter};
use markersync_server::db;
use markersync_server::sync::{CycleOutcome, SyncTrigger};
use markersync_server::websocket::ServerMessage;
use tokio::sync::mpsc;

#[tokio::test]
async fn first_cycle_fills_the_cache() {
    let h = harness(FEED).await;

    let report = h.state.sync.run(SyncTrigger::Startup).await.unwrap();

    assert_eq!(report.outcome, CycleOutcome::Succeeded);
    assert_eq!(report.trigger, SyncTrigger::Startup);
    assert_eq!(report.stats.inserted, 3);
    assert_eq!(report.stats.entries_seen, 0);
    assert!(report.finished_at >= report.started_at);

    let rows = db::query(&h.state.pool, &MarkerFilter::new()).await.unwrap();
    let ids: Vec<_> = rows
        .iter()
        .map(|r| r.external_id.as_deref().unwrap())
        .collect();
    assert_eq!(ids, vec!["5540f2a1", "5540f2b7", "5540f2c3"]);
}

#[tokio::test]
async fn unchanged_feed_is_idempotent() {
    let h = harness(FEED).await;
    h.state.sync.run(SyncTrigger::Startup).await.unwrap();
    let before = db::query(&h.state.pool, &MarkerFilter::new()).await.unwrap();

    let report = h.state.sync.run(SyncTrigger::Scheduled).await.unwrap();

    assert_eq!(report.stats.total_changes(), 0);
    assert_eq!(report.stats.entries_seen, 3);
    assert_eq!(report.applied, 0);
    let after = db::query(&h.state.pool, &MarkerFilter::new()).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn feed_edits_become_updates_deletes_and_inserts() {
    let h = harness(FEED).await;
    h.state.sync.run(SyncTrigger::Startup).await.unwrap();

    h.feed.set(
        r#"{"markers": [
            {"_id": "5540f2a1", "name": "Harbour Ferry", "lat": 53.5417, "lng": 9.9847},
            {"_id": "5540f2b7", "name": "Old Town", "address": "Market Sq", "lat": 53.5503, "lng": 9.9937},
            {"_id": "5540f2d9", "name": "Park", "lat": 53.56, "lng": 9.98}
        ]}"#,
    );
    let report = h.state.sync.run(SyncTrigger::Manual).await.unwrap();

    assert_eq!(report.stats.updated, 1);
    assert_eq!(report.stats.deleted, 1);
    assert_eq!(report.stats.inserted, 1);
    assert_eq!(report.applied, 3);

    let ferry = db::query(
        &h.state.pool,
        &MarkerFilter::new().with_external_id("5540f2a1"),
    )
    .await
    .unwrap();
    assert_eq!(ferry[0].name.as_deref(), Some("Harbour Ferry"));
    // Absent from the feed, so the stored address stays.
    assert_eq!(ferry[0].address.as_deref(), Some("Pier 1"));

    let gone = db::query(
        &h.state.pool,
        &MarkerFilter::new().with_external_id("5540f2c3"),
    )
    .await
    .unwrap();
    assert!(gone.is_empty());
}

#[tokio::test]
async fn malformed_feed_fails_without_touching_the_cache() {
    let h = harness(FEED).await;
    h.state.sync.run(SyncTrigger::Startup).await.unwrap();

    h.feed.set(r#"{"markers": [{"_id": "x", "lat": "north"}]}"#);
    let report = h.state.sync.run(SyncTrigger::Scheduled).await.unwrap();

    assert_eq!(report.outcome, CycleOutcome::Failed);
    assert_eq!(report.stats.parse_errors, 1);
    assert_eq!(report.applied, 0);
    assert!(report.error.is_some());
    assert_eq!(db::count(&h.state.pool).await.unwrap(), 3);
}

#[tokio::test]
async fn transport_failure_is_recorded() {
    let h = harness(FEED).await;
    h.feed.go_offline();

    let report = h.state.sync.run(SyncTrigger::Startup).await.unwrap();

    assert_eq!(report.outcome, CycleOutcome::Failed);
    assert_eq!(report.stats.parse_errors, 1);
    assert!(report
        .error
        .as_deref()
        .unwrap()
        .starts_with("Feed transport error"));
    assert_eq!(db::count(&h.state.pool).await.unwrap(), 0);
    assert_eq!(h.state.sync.last_report().await, Some(report));
}

#[tokio::test]
async fn empty_feed_clears_the_cache() {
    let h = harness(FEED).await;
    h.state.sync.run(SyncTrigger::Startup).await.unwrap();

    h.feed.set(r#"{"markers": []}"#);
    let report = h.state.sync.run(SyncTrigger::Manual).await.unwrap();

    assert_eq!(report.stats.deleted, 3);
    assert_eq!(db::count(&h.state.pool).await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_feed_ids_keep_the_last_entry() {
    let h = harness(
        r#"{"markers": [
            {"_id": "a", "name": "first"},
            {"_id": "a", "name": "second"}
        ]}"#,
    )
    .await;

    let report = h.state.sync.run(SyncTrigger::Startup).await.unwrap();
    assert!(report.succeeded());
    assert_eq!(report.stats.inserted, 1);

    let rows = db::query(&h.state.pool, &MarkerFilter::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name.as_deref(), Some("second"));
}

#[tokio::test]
async fn id_less_entries_follow_the_policy() {
    let body = r#"{"markers": [{"name": "pin", "lat": 1, "lng": 1}, {"_id": "a"}]}"#;

    let insert = harness(body).await;
    insert.state.sync.run(SyncTrigger::Startup).await.unwrap();
    let again = insert.state.sync.run(SyncTrigger::Scheduled).await.unwrap();
    assert_eq!((again.stats.inserted, again.stats.deleted), (1, 1));
    assert_eq!(db::count(&insert.state.pool).await.unwrap(), 2);

    let reject = harness_with_policy(body, AbsentIdPolicy::Reject).await;
    let report = reject.state.sync.run(SyncTrigger::Startup).await.unwrap();
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.stats.inserted, 1);
    assert_eq!(db::count(&reject.state.pool).await.unwrap(), 1);
}

#[tokio::test]
async fn connected_clients_hear_each_commit_once() {
    let h = harness(FEED).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    h.state.conn_manager.register("map".to_string(), tx);

    h.state.sync.run(SyncTrigger::Startup).await.unwrap();
    h.feed.go_offline();
    h.state.sync.run(SyncTrigger::Scheduled).await.unwrap();

    match rx.try_recv().unwrap() {
        ServerMessage::MarkersChanged {
            inserted,
            updated,
            deleted,
        } => assert_eq!((inserted, updated, deleted), (3, 0, 0)),
        other => panic!("unexpected message: {:?}", other),
    }
    // The failed cycle sent nothing.
    assert!(rx.try_recv().is_err());
}
