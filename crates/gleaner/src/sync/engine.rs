//! Idempotent synchronization of one target against its checkpoint.
//!
//! A pass loads the target, asks the [`ProviderAggregator`] for everything
//! since the checkpoint, drops records already stored, bulk-inserts the rest
//! and only then advances the checkpoint. Any failure leaves the checkpoint
//! where it was, so the next staleness scan retries the whole pass.
//!
//! Events are delivered at least once and detectors republish targets that
//! are still queued, so [`SyncEngine::handle`] re-checks staleness under the
//! target lock and skips targets another pass has already refreshed.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gleaner::sync::{SyncEngine, TargetKind};
//!
//! let engine = SyncEngine::new(store, aggregator);
//! let outcome = engine.handle(TargetKind::Subscription, id).await;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::{content_item, subscription};
use crate::provider::{ProviderAggregator, ProviderError};
use crate::repository::StoreError;

use super::locks::TargetLocks;
use super::store::SyncStore;
use super::types::{
    SyncOutcome, SyncSummary, SyncTarget, TargetKind, default_staleness_window, epoch,
};

/// Failure inside a single pass. Never escapes [`SyncEngine::handle`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counts of one pass, before it is wrapped into a [`SyncOutcome`].
struct PassCounts {
    fetched: usize,
    inserted: u64,
    skipped: usize,
}

pub struct SyncEngine {
    store: Arc<dyn SyncStore>,
    aggregator: ProviderAggregator,
    locks: Arc<TargetLocks>,
    window: Duration,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn SyncStore>, aggregator: ProviderAggregator) -> Self {
        Self {
            store,
            aggregator,
            locks: Arc::new(TargetLocks::new()),
            window: default_staleness_window(),
        }
    }

    /// Targets synchronized more recently than `window` are skipped by [`handle`](Self::handle).
    ///
    /// Should match the window the detectors scan with.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Share per-target locks with another engine in the same process.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<TargetLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn store(&self) -> &Arc<dyn SyncStore> {
        &self.store
    }

    pub fn locks(&self) -> &Arc<TargetLocks> {
        &self.locks
    }

    /// Run one pass for a stale target. Never fails: errors become [`SyncOutcome::Failed`].
    ///
    /// A target whose checkpoint is inside the staleness window is reported
    /// as [`SyncOutcome::UpToDate`] without calling any provider.
    #[tracing::instrument(skip_all, fields(%kind, target_id = %id))]
    pub async fn handle(&self, kind: TargetKind, id: Uuid) -> SyncOutcome {
        self.guarded_pass(kind, id, false).await
    }

    /// Run one pass regardless of how fresh the checkpoint is.
    #[tracing::instrument(skip_all, fields(%kind, target_id = %id))]
    pub async fn sync_now(&self, kind: TargetKind, id: Uuid) -> SyncOutcome {
        self.guarded_pass(kind, id, true).await
    }

    async fn guarded_pass(&self, kind: TargetKind, id: Uuid, force: bool) -> SyncOutcome {
        let _guard = self.locks.acquire(kind, id).await;

        match self.run_pass(kind, id, force).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Sync failed, checkpoint left unchanged");
                SyncOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run passes for several targets one after another.
    ///
    /// A failing target never stops the batch.
    #[tracing::instrument(skip_all, fields(%kind, count = ids.len()))]
    pub async fn handle_batch(&self, kind: TargetKind, ids: &[Uuid]) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for &id in ids {
            let outcome = self.handle(kind, id).await;
            summary.record(id, &outcome);
        }
        tracing::info!(
            processed = summary.processed,
            synced = summary.synced,
            up_to_date = summary.up_to_date,
            failed = summary.failed,
            inserted = summary.inserted,
            "Batch sync finished"
        );
        summary
    }

    /// Force the next pass to fetch everything again.
    ///
    /// Returns whether the target exists.
    pub async fn reset_checkpoint(&self, kind: TargetKind, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.locks.acquire(kind, id).await;
        let found = self.store.reset_checkpoint(kind, id).await?;
        if found {
            tracing::info!(%kind, target_id = %id, "Checkpoint reset to epoch");
        }
        Ok(found)
    }

    async fn run_pass(
        &self,
        kind: TargetKind,
        id: Uuid,
        force: bool,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(target) = self.store.get_target(kind, id).await? else {
            tracing::info!("Target no longer exists, nothing to sync");
            return Ok(SyncOutcome::Missing);
        };

        if !force && target.checkpoint >= Utc::now() - self.window {
            tracing::debug!(checkpoint = %target.checkpoint, "Already synchronized, skipping");
            return Ok(SyncOutcome::UpToDate);
        }

        // Taken before fetching, so anything published mid-pass is still
        // newer than the checkpoint on the next run.
        let started = Utc::now();

        let counts = match kind {
            TargetKind::Subscription => self.sync_items(&target).await?,
            TargetKind::User => self.sync_subscriptions(&target).await?,
        };

        let advanced = self.store.update_checkpoint(kind, id, started).await?;
        if !advanced {
            tracing::debug!("Checkpoint already at or past this pass");
        }

        tracing::info!(
            provider = %target.provider,
            fetched = counts.fetched,
            inserted = counts.inserted,
            skipped = counts.skipped,
            "Synchronized {kind}"
        );

        Ok(SyncOutcome::Synced {
            fetched: counts.fetched,
            inserted: counts.inserted,
            skipped: counts.skipped,
        })
    }

    async fn sync_items(&self, target: &SyncTarget) -> Result<PassCounts, SyncError> {
        let fetched = self.aggregator.fetch_items(target, target.checkpoint).await?;
        let total = fetched.len();
        let now = Utc::now().fixed_offset();

        let mut seen = HashSet::new();
        let mut staged = Vec::new();
        for item in fetched {
            if item.url.is_empty() || !seen.insert(item.url.clone()) {
                continue;
            }
            if self.store.find_existing_item(target.id, &item.url).await? {
                continue;
            }
            staged.push(content_item::Model {
                id: Uuid::new_v4(),
                subscription_id: target.id,
                name: item.name,
                url: item.url,
                thumbnail: item.thumbnail,
                published_at: item.published_at.fixed_offset(),
                created_at: now,
            });
        }

        let skipped = total - staged.len();
        let inserted = self.store.bulk_add_items(staged).await?;
        Ok(PassCounts {
            fetched: total,
            inserted,
            skipped,
        })
    }

    async fn sync_subscriptions(&self, user: &SyncTarget) -> Result<PassCounts, SyncError> {
        let discovered = self
            .aggregator
            .fetch_subscriptions(user, user.checkpoint)
            .await?;
        let total = discovered.len();
        let now = Utc::now().fixed_offset();

        let mut seen = HashSet::new();
        let mut staged = Vec::new();
        for sub in discovered {
            if !seen.insert((sub.provider, sub.external_id.clone())) {
                continue;
            }
            if self
                .store
                .find_existing_subscription(user.id, sub.provider, &sub.external_id)
                .await?
            {
                continue;
            }
            staged.push(subscription::Model {
                id: Uuid::new_v4(),
                user_id: Some(user.id),
                provider: sub.provider,
                external_id: sub.external_id,
                name: sub.name,
                thumbnail: sub.thumbnail,
                // New subscriptions are picked up by the next staleness scan.
                checkpoint: epoch().fixed_offset(),
                created_at: now,
            });
        }

        let skipped = total - staged.len();
        let inserted = self.store.bulk_add_subscriptions(staged).await?;
        Ok(PassCounts {
            fetched: total,
            inserted,
            skipped,
        })
    }
}
