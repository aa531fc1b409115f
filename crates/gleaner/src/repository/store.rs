use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::entity::provider_kind::ProviderKind;
use crate::entity::{content_item, subscription};
use crate::sync::{SyncStore, SyncTarget, TargetKind};

use super::bulk::{
    DEFAULT_BULK_INSERT_BACKOFF_MS, DEFAULT_BULK_INSERT_RETRIES, insert_items_with_retry,
    insert_subscriptions_with_retry,
};
use super::checkpoint::{advance_checkpoint, reset_checkpoint};
use super::errors::Result;
use super::query;

/// [`SyncStore`] backed by a sea-orm connection.
///
/// The connection is held behind an [`Arc`] so callers can keep querying it
/// next to the store.
#[derive(Clone)]
pub struct DatabaseStore {
    db: Arc<DatabaseConnection>,
    max_retries: u32,
    initial_backoff_ms: u64,
}

impl DatabaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::from_shared(Arc::new(db))
    }

    pub fn from_shared(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            max_retries: DEFAULT_BULK_INSERT_RETRIES,
            initial_backoff_ms: DEFAULT_BULK_INSERT_BACKOFF_MS,
        }
    }

    /// Override retry behaviour for bulk inserts.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, initial_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff_ms = initial_backoff_ms;
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl SyncStore for DatabaseStore {
    async fn get_stale_targets(
        &self,
        kind: TargetKind,
        before: DateTime<Utc>,
    ) -> Result<Vec<SyncTarget>> {
        Ok(match kind {
            TargetKind::Subscription => query::find_stale_subscriptions(&self.db, before)
                .await?
                .into_iter()
                .map(SyncTarget::from)
                .collect(),
            TargetKind::User => query::find_stale_users(&self.db, before)
                .await?
                .into_iter()
                .map(SyncTarget::from)
                .collect(),
        })
    }

    async fn get_target(&self, kind: TargetKind, id: Uuid) -> Result<Option<SyncTarget>> {
        Ok(match kind {
            TargetKind::Subscription => query::find_subscription(&self.db, id)
                .await?
                .map(SyncTarget::from),
            TargetKind::User => query::find_user(&self.db, id).await?.map(SyncTarget::from),
        })
    }

    async fn update_checkpoint(
        &self,
        kind: TargetKind,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        advance_checkpoint(&self.db, kind, id, at).await
    }

    async fn reset_checkpoint(&self, kind: TargetKind, id: Uuid) -> Result<bool> {
        reset_checkpoint(&self.db, kind, id).await
    }

    async fn find_existing_item(&self, subscription_id: Uuid, url: &str) -> Result<bool> {
        query::content_item_exists(&self.db, subscription_id, url).await
    }

    async fn bulk_add_items(&self, items: Vec<content_item::Model>) -> Result<u64> {
        insert_items_with_retry(&self.db, items, self.max_retries, self.initial_backoff_ms).await
    }

    async fn find_existing_subscription(
        &self,
        user_id: Uuid,
        provider: ProviderKind,
        external_id: &str,
    ) -> Result<bool> {
        query::subscription_exists(&self.db, user_id, provider, external_id).await
    }

    async fn bulk_add_subscriptions(&self, subscriptions: Vec<subscription::Model>) -> Result<u64> {
        insert_subscriptions_with_retry(
            &self.db,
            subscriptions,
            self.max_retries,
            self.initial_backoff_ms,
        )
        .await
    }
}
