//! The sync cycle: fetch, decode, reconcile, apply, notify.

use std::sync::Arc;

use chrono::Utc;
use markersync_engine::{
    decode_feed_slice, ChangeNotification, Reconciler, SyncOutcome, SyncStats,
};
use tokio::sync::{RwLock, Semaphore};

use super::{CycleOutcome, SyncReport, SyncTrigger};
use crate::db::{self, Pool};
use crate::error::{AppError, Result};
use crate::feed::FeedSource;
use crate::websocket::{ConnectionManager, ServerMessage};

/// Runs sync cycles, one at a time.
///
/// The single-permit semaphore is the only thing standing between two
/// triggers; a second trigger while a cycle runs gets
/// [`AppError::SyncInProgress`] instead of queueing.
pub struct SyncService {
    pool: Pool,
    feed: Arc<dyn FeedSource>,
    reconciler: Reconciler,
    conn_manager: Arc<ConnectionManager>,
    guard: Semaphore,
    last_report: RwLock<Option<SyncReport>>,
}

/// A cycle that stopped early, with whatever counters it had reached.
struct CycleFailure {
    stats: SyncStats,
    error: AppError,
}

impl CycleFailure {
    fn before_plan(error: impl Into<AppError>) -> Self {
        Self {
            stats: SyncStats::default(),
            error: error.into(),
        }
    }

    fn unreadable_feed(error: impl Into<AppError>) -> Self {
        Self {
            stats: SyncStats {
                parse_errors: 1,
                ..Default::default()
            },
            error: error.into(),
        }
    }
}

impl SyncService {
    pub fn new(
        pool: Pool,
        feed: Arc<dyn FeedSource>,
        reconciler: Reconciler,
        conn_manager: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            pool,
            feed,
            reconciler,
            conn_manager,
            guard: Semaphore::new(1),
            last_report: RwLock::new(None),
        }
    }

    /// Create a new service wrapped in Arc for sharing.
    pub fn new_shared(
        pool: Pool,
        feed: Arc<dyn FeedSource>,
        reconciler: Reconciler,
        conn_manager: Arc<ConnectionManager>,
    ) -> Arc<Self> {
        Arc::new(Self::new(pool, feed, reconciler, conn_manager))
    }

    /// Check if a cycle is running right now.
    pub fn is_running(&self) -> bool {
        self.guard.available_permits() == 0
    }

    /// The report of the most recent finished cycle.
    pub async fn last_report(&self) -> Option<SyncReport> {
        self.last_report.read().await.clone()
    }

    /// Run one cycle.
    ///
    /// A failed cycle is still `Ok`: the failure is described by the
    /// returned report. The only error is [`AppError::SyncInProgress`].
    pub async fn run(&self, trigger: SyncTrigger) -> Result<SyncReport> {
        let _permit = self
            .guard
            .try_acquire()
            .map_err(|_| AppError::SyncInProgress)?;

        let started_at = Utc::now();
        tracing::info!(%trigger, feed = %self.feed.describe(), "Sync cycle started");

        let result = self.cycle().await;
        let finished_at = Utc::now();

        let report = match result {
            Ok(outcome) => SyncReport {
                trigger,
                started_at,
                finished_at,
                outcome: CycleOutcome::Succeeded,
                stats: outcome.stats,
                applied: outcome.applied,
                error: None,
            },
            Err(failure) => SyncReport {
                trigger,
                started_at,
                finished_at,
                outcome: CycleOutcome::Failed,
                stats: failure.stats,
                applied: 0,
                error: Some(failure.error.to_string()),
            },
        };

        if report.succeeded() {
            tracing::info!(
                %trigger,
                inserted = report.stats.inserted,
                updated = report.stats.updated,
                deleted = report.stats.deleted,
                skipped = report.stats.skipped,
                elapsed_ms = report.duration().num_milliseconds(),
                "Sync cycle committed"
            );
        } else {
            tracing::warn!(
                %trigger,
                parse_errors = report.stats.parse_errors,
                error = report.error.as_deref().unwrap_or_default(),
                "Sync cycle failed, cache left unchanged"
            );
        }

        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    async fn cycle(&self) -> std::result::Result<SyncOutcome, CycleFailure> {
        // Transport failures count as parse errors, like an unreadable body.
        let body = self
            .feed
            .fetch()
            .await
            .map_err(CycleFailure::unreadable_feed)?;

        let remote = decode_feed_slice(&body).map_err(CycleFailure::unreadable_feed)?;
        tracing::debug!(entries = remote.len(), "Feed decoded");

        let mut tx = self.pool.begin().await.map_err(CycleFailure::before_plan)?;

        let local = db::snapshot(&mut tx)
            .await
            .map_err(CycleFailure::before_plan)?;
        tracing::debug!(rows = local.len(), "Local snapshot read");

        let plan = self.reconciler.reconcile(remote, &local);
        let stats = plan.stats();
        tracing::debug!(
            inserts = plan.inserts.len(),
            updates = plan.updates.len(),
            deletes = plan.deletes.len(),
            skipped = plan.skipped,
            "Reconciliation plan computed"
        );

        // Dropping `tx` on any error below rolls the batch back.
        let applied = db::apply_plan(&mut tx, &plan)
            .await
            .map_err(|error| CycleFailure { stats, error })?;
        tx.commit().await.map_err(|error| CycleFailure {
            stats,
            error: error.into(),
        })?;

        let sent = self
            .conn_manager
            .broadcast_all(ServerMessage::from(ChangeNotification::for_plan(&plan)));
        tracing::debug!(recipients = sent, "Change notification sent");

        Ok(SyncOutcome { stats, applied })
    }
}
