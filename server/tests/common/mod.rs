//! Shared fixtures: an in-memory cache and a feed the test controls.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use markersync_engine::{AbsentIdPolicy, Reconciler};
use markersync_server::config::Config;
use markersync_server::error::Result;
use markersync_server::feed::{FeedSource, HttpFeed};
use markersync_server::sync::SyncService;
use markersync_server::websocket::ConnectionManager;
use markersync_server::{db, AppState};

/// Serves whatever body was last set. Offline, it fetches from a closed
/// local port and fails with a real transport error.
pub struct StaticFeed {
    body: Mutex<Option<String>>,
    dead_upstream: HttpFeed,
}

impl StaticFeed {
    pub fn new(body: &str) -> Arc<Self> {
        let dead_upstream = HttpFeed::new(
            "http://127.0.0.1:9/markers",
            Duration::from_millis(200),
            Duration::from_millis(200),
        )
        .unwrap();

        Arc::new(Self {
            body: Mutex::new(Some(body.to_string())),
            dead_upstream,
        })
    }

    pub fn set(&self, body: &str) {
        *self.body.lock().unwrap() = Some(body.to_string());
    }

    pub fn go_offline(&self) {
        *self.body.lock().unwrap() = None;
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<Vec<u8>> {
        let body = self.body.lock().unwrap().clone();
        match body {
            Some(body) => Ok(body.into_bytes()),
            None => self.dead_upstream.fetch().await,
        }
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

pub struct Harness {
    pub state: AppState,
    pub feed: Arc<StaticFeed>,
}

pub async fn harness(body: &str) -> Harness {
    harness_with_policy(body, AbsentIdPolicy::Insert).await
}

pub async fn harness_with_policy(body: &str, policy: AbsentIdPolicy) -> Harness {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let feed = StaticFeed::new(body);
    let conn_manager = ConnectionManager::new_shared();
    let sync = SyncService::new_shared(
        pool.clone(),
        feed.clone(),
        Reconciler::new(policy),
        conn_manager.clone(),
    );

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        absent_id_policy: policy,
        ..Config::default()
    };

    Harness {
        state: AppState {
            pool,
            config: Arc::new(config),
            conn_manager,
            sync,
        },
        feed,
    }
}

pub const FEED: &str = r#"{"markers": [
    {"_id": "5540f2a1", "name": "Harbour", "address": "Pier 1", "lat": 53.5417, "lng": 9.9847},
    {"_id": "5540f2b7", "name": "Old Town", "address": "Market Sq", "lat": 53.5503, "lng": 9.9937},
    {"_id": "5540f2c3", "name": "Harbour", "lat": 53.5444, "lng": 9.9661}
]}"#;
