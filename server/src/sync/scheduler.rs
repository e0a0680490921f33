//! Periodic sync.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{SyncService, SyncTrigger};

/// Spawn the background sync loop.
///
/// The first cycle runs immediately (the cache may be empty on a fresh
/// install), then one every `period`. A tick that lands while another cycle
/// is running is skipped.
pub fn spawn_scheduler(service: Arc<SyncService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut trigger = SyncTrigger::Startup;
        loop {
            interval.tick().await;

            if let Err(e) = service.run(trigger).await {
                tracing::info!(%trigger, "Scheduled sync skipped: {}", e);
            }
            trigger = SyncTrigger::Scheduled;
        }
    })
}
