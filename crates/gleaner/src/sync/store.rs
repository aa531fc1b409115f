//! Persistence seam consumed by the detectors and the engine.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entity::provider_kind::ProviderKind;
use crate::entity::{content_item, subscription, user};
use crate::repository::{Result, StoreError};

use super::types::{SyncTarget, TargetKind, epoch};

/// Storage operations the synchronization pipeline needs.
///
/// Implemented by [`DatabaseStore`](crate::repository::DatabaseStore) for
/// sea-orm connections and by [`MemoryStore`] for tests and dry runs.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Targets of `kind` whose checkpoint is strictly older than `before`.
    async fn get_stale_targets(
        &self,
        kind: TargetKind,
        before: DateTime<Utc>,
    ) -> Result<Vec<SyncTarget>>;

    /// Load a single target; `None` when it no longer exists.
    async fn get_target(&self, kind: TargetKind, id: Uuid) -> Result<Option<SyncTarget>>;

    /// Advance the checkpoint to `at` unless it is already at or past it.
    async fn update_checkpoint(&self, kind: TargetKind, id: Uuid, at: DateTime<Utc>)
    -> Result<bool>;

    /// Reset the checkpoint to epoch. Returns whether the target exists.
    async fn reset_checkpoint(&self, kind: TargetKind, id: Uuid) -> Result<bool>;

    /// Whether an item with this canonical URL is already stored for the subscription.
    async fn find_existing_item(&self, subscription_id: Uuid, url: &str) -> Result<bool>;

    /// Insert items, ignoring dedup-key conflicts. Returns rows inserted.
    async fn bulk_add_items(&self, items: Vec<content_item::Model>) -> Result<u64>;

    /// Whether the user already has a subscription to this provider identity.
    async fn find_existing_subscription(
        &self,
        user_id: Uuid,
        provider: ProviderKind,
        external_id: &str,
    ) -> Result<bool>;

    /// Insert subscriptions, ignoring dedup-key conflicts. Returns rows inserted.
    async fn bulk_add_subscriptions(&self, subscriptions: Vec<subscription::Model>) -> Result<u64>;
}

/// In-process [`SyncStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    subscriptions: HashMap<Uuid, subscription::Model>,
    users: HashMap<Uuid, user::Model>,
    items: Vec<content_item::Model>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a subscription.
    pub fn put_subscription(&self, model: subscription::Model) {
        self.state().subscriptions.insert(model.id, model);
    }

    /// Insert or replace a user.
    pub fn put_user(&self, model: user::Model) {
        self.state().users.insert(model.id, model);
    }

    /// Make every subsequent write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Stored items of a subscription in insertion order.
    pub fn items_for(&self, subscription_id: Uuid) -> Vec<content_item::Model> {
        self.state()
            .items
            .iter()
            .filter(|item| item.subscription_id == subscription_id)
            .cloned()
            .collect()
    }

    /// Subscriptions owned by a user.
    pub fn subscriptions_for(&self, user_id: Uuid) -> Vec<subscription::Model> {
        self.state()
            .subscriptions
            .values()
            .filter(|sub| sub.user_id == Some(user_id))
            .cloned()
            .collect()
    }

    /// Current checkpoint of a target.
    pub fn checkpoint(&self, kind: TargetKind, id: Uuid) -> Option<DateTime<Utc>> {
        let state = self.state();
        match kind {
            TargetKind::Subscription => state.subscriptions.get(&id).map(|s| s.checkpoint),
            TargetKind::User => state.users.get(&id).map(|u| u.checkpoint),
        }
        .map(|at| at.with_timezone(&Utc))
    }
}

fn write_outage() -> StoreError {
    StoreError::Database(sea_orm::DbErr::Custom("simulated write outage".to_string()))
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn get_stale_targets(
        &self,
        kind: TargetKind,
        before: DateTime<Utc>,
    ) -> Result<Vec<SyncTarget>> {
        let state = self.state();
        let mut targets: Vec<SyncTarget> = match kind {
            TargetKind::Subscription => state
                .subscriptions
                .values()
                .cloned()
                .map(SyncTarget::from)
                .collect(),
            TargetKind::User => state.users.values().cloned().map(SyncTarget::from).collect(),
        };
        targets.retain(|t| t.checkpoint < before);
        targets.sort_by_key(|t| t.checkpoint);
        Ok(targets)
    }

    async fn get_target(&self, kind: TargetKind, id: Uuid) -> Result<Option<SyncTarget>> {
        let state = self.state();
        Ok(match kind {
            TargetKind::Subscription => state.subscriptions.get(&id).cloned().map(Into::into),
            TargetKind::User => state.users.get(&id).cloned().map(Into::into),
        })
    }

    async fn update_checkpoint(
        &self,
        kind: TargetKind,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(write_outage());
        }
        let at = at.fixed_offset();
        let checkpoint = match kind {
            TargetKind::Subscription => state.subscriptions.get_mut(&id).map(|s| &mut s.checkpoint),
            TargetKind::User => state.users.get_mut(&id).map(|u| &mut u.checkpoint),
        };
        Ok(match checkpoint {
            Some(checkpoint) if *checkpoint < at => {
                *checkpoint = at;
                true
            }
            _ => false,
        })
    }

    async fn reset_checkpoint(&self, kind: TargetKind, id: Uuid) -> Result<bool> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(write_outage());
        }
        let epoch = epoch().fixed_offset();
        let checkpoint = match kind {
            TargetKind::Subscription => state.subscriptions.get_mut(&id).map(|s| &mut s.checkpoint),
            TargetKind::User => state.users.get_mut(&id).map(|u| &mut u.checkpoint),
        };
        Ok(checkpoint.map(|c| *c = epoch).is_some())
    }

    async fn find_existing_item(&self, subscription_id: Uuid, url: &str) -> Result<bool> {
        Ok(self
            .state()
            .items
            .iter()
            .any(|item| item.subscription_id == subscription_id && item.url == url))
    }

    async fn bulk_add_items(&self, items: Vec<content_item::Model>) -> Result<u64> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(write_outage());
        }
        let mut inserted = 0;
        for item in items {
            let exists = state
                .items
                .iter()
                .any(|i| i.subscription_id == item.subscription_id && i.url == item.url);
            if !exists {
                state.items.push(item);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn find_existing_subscription(
        &self,
        user_id: Uuid,
        provider: ProviderKind,
        external_id: &str,
    ) -> Result<bool> {
        Ok(self.state().subscriptions.values().any(|sub| {
            sub.user_id == Some(user_id) && sub.provider == provider && sub.external_id == external_id
        }))
    }

    async fn bulk_add_subscriptions(&self, subscriptions: Vec<subscription::Model>) -> Result<u64> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(write_outage());
        }
        let mut inserted = 0;
        for sub in subscriptions {
            let exists = state.subscriptions.values().any(|s| {
                s.user_id.is_some()
                    && s.user_id == sub.user_id
                    && s.provider == sub.provider
                    && s.external_id == sub.external_id
            });
            if !exists {
                state.subscriptions.insert(sub.id, sub);
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
