//! Core synchronization types shared by the detectors, the engine and the store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::provider_kind::ProviderKind;
use crate::entity::{subscription, user};

/// Default staleness window in hours.
pub const DEFAULT_STALENESS_HOURS: i64 = 24;

/// Default interval between subscription staleness scans, in seconds.
pub const DEFAULT_SUBSCRIPTION_INTERVAL_SECS: u64 = 5 * 60;

/// Default interval between user staleness scans, in seconds.
pub const DEFAULT_USER_INTERVAL_SECS: u64 = 60 * 60;

/// Default staleness window.
#[must_use]
pub fn default_staleness_window() -> Duration {
    Duration::hours(DEFAULT_STALENESS_HOURS)
}

/// The checkpoint value meaning "never synchronized".
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Which table a [`SyncTarget`] lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Subscription,
    User,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Subscription => write!(f, "subscription"),
            TargetKind::User => write!(f, "user"),
        }
    }
}

/// A subscription or user tracked for content freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub id: Uuid,
    pub kind: TargetKind,
    pub provider: ProviderKind,
    /// Opaque provider identity. For feed subscriptions this is the feed URL.
    pub external_id: String,
    /// Owning user of a subscription.
    pub owner_id: Option<Uuid>,
    /// Last successful synchronization; [`epoch`] when never synchronized.
    pub checkpoint: DateTime<Utc>,
}

impl SyncTarget {
    /// True when the target has never completed a sync pass.
    #[must_use]
    pub fn is_unsynced(&self) -> bool {
        self.checkpoint <= epoch()
    }
}

impl From<subscription::Model> for SyncTarget {
    fn from(model: subscription::Model) -> Self {
        Self {
            id: model.id,
            kind: TargetKind::Subscription,
            provider: model.provider,
            external_id: model.external_id,
            owner_id: model.user_id,
            checkpoint: model.checkpoint.with_timezone(&Utc),
        }
    }
}

impl From<user::Model> for SyncTarget {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            kind: TargetKind::User,
            provider: model.provider,
            external_id: model.external_id,
            owner_id: None,
            checkpoint: model.checkpoint.with_timezone(&Utc),
        }
    }
}

/// Result of a single [`SyncEngine::handle`](super::SyncEngine::handle) pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Fetch, dedup and persist all succeeded and the checkpoint was advanced.
    Synced {
        fetched: usize,
        inserted: u64,
        skipped: usize,
    },
    /// The target was synchronized within the staleness window; nothing fetched.
    UpToDate,
    /// The target no longer exists.
    Missing,
    /// Something failed; the checkpoint was left untouched.
    Failed { error: String },
}

impl SyncOutcome {
    #[must_use]
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

/// Aggregate counts over a batch of sync passes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    /// Number of targets processed.
    pub processed: usize,
    /// Targets whose pass succeeded.
    pub synced: usize,
    /// Targets already fresh when their turn came.
    pub up_to_date: usize,
    /// Targets that no longer existed.
    pub missing: usize,
    /// Targets whose pass failed.
    pub failed: usize,
    /// Records inserted across all targets.
    pub inserted: u64,
    /// Records skipped as already stored.
    pub skipped: usize,
    /// Error messages of failed passes, prefixed with the target id.
    pub errors: Vec<String>,
}

impl SyncSummary {
    /// Fold one pass into the summary.
    pub fn record(&mut self, target_id: Uuid, outcome: &SyncOutcome) {
        self.processed += 1;
        match outcome {
            SyncOutcome::Synced {
                inserted, skipped, ..
            } => {
                self.synced += 1;
                self.inserted += inserted;
                self.skipped += skipped;
            }
            SyncOutcome::UpToDate => self.up_to_date += 1,
            SyncOutcome::Missing => self.missing += 1,
            SyncOutcome::Failed { error } => {
                self.failed += 1;
                self.errors.push(format!("{target_id}: {error}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_kind_display_and_serde() {
        assert_eq!(TargetKind::Subscription.to_string(), "subscription");
        assert_eq!(TargetKind::User.to_string(), "user");
        assert_eq!(
            serde_json::to_string(&TargetKind::Subscription).unwrap(),
            "\"subscription\""
        );
    }

    #[test]
    fn test_sync_target_from_subscription_model() {
        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let model = subscription::Model {
            id,
            user_id: Some(owner),
            provider: ProviderKind::Feed,
            external_id: "https://example.com/feed.xml".to_string(),
            name: "Example".to_string(),
            thumbnail: None,
            checkpoint: epoch().fixed_offset(),
            created_at: Utc::now().fixed_offset(),
        };

        let target = SyncTarget::from(model);
        assert_eq!(target.id, id);
        assert_eq!(target.kind, TargetKind::Subscription);
        assert_eq!(target.owner_id, Some(owner));
        assert!(target.is_unsynced());
    }

    #[test]
    fn test_summary_records_each_outcome() {
        let mut summary = SyncSummary::default();
        let id = Uuid::new_v4();
        summary.record(
            id,
            &SyncOutcome::Synced {
                fetched: 5,
                inserted: 3,
                skipped: 2,
            },
        );
        summary.record(id, &SyncOutcome::Missing);
        summary.record(id, &SyncOutcome::UpToDate);
        summary.record(
            id,
            &SyncOutcome::Failed {
                error: "boom".to_string(),
            },
        );

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.synced, 1);
        assert_eq!(summary.up_to_date, 1);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.errors, vec![format!("{id}: boom")]);
    }
}
