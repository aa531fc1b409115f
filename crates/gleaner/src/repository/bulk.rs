use std::future::Future;
use std::time::Duration;

use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

use crate::entity::content_item::{self, Entity as ContentItem};
use crate::entity::subscription::{self, Entity as Subscription};

use super::errors::{Result, StoreError};

// ─── Bulk Inserts ────────────────────────────────────────────────────────────

/// Default number of retry attempts for bulk inserts.
pub const DEFAULT_BULK_INSERT_RETRIES: u32 = 3;

/// Default initial backoff delay in milliseconds for bulk insert retries.
pub const DEFAULT_BULK_INSERT_BACKOFF_MS: u64 = 100;

/// Insert content items in one statement, ignoring `(subscription_id, url)` conflicts.
///
/// A conflicting row means another pass already stored that item, so it is
/// silently skipped. Returns the number of rows actually inserted.
pub async fn insert_items(db: &DatabaseConnection, items: Vec<content_item::Model>) -> Result<u64> {
    insert_items_with_retry(db, items, 0, 0).await
}

/// [`insert_items`] with retries on transient database errors.
pub async fn insert_items_with_retry(
    db: &DatabaseConnection,
    items: Vec<content_item::Model>,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<u64> {
    if items.is_empty() {
        return Ok(0);
    }

    let models: Vec<content_item::ActiveModel> = items.into_iter().map(item_active_model).collect();
    tracing::debug!(count = models.len(), "Inserting content items");

    retry_transient("content items", max_retries, initial_backoff_ms, || {
        let models = models.clone();
        async move {
            ContentItem::insert_many(models)
                .on_conflict(item_on_conflict())
                .exec_without_returning(db)
                .await
                .map_err(StoreError::from)
        }
    })
    .await
}

/// Insert subscriptions in one statement, ignoring `(user_id, provider, external_id)` conflicts.
pub async fn insert_subscriptions(
    db: &DatabaseConnection,
    subscriptions: Vec<subscription::Model>,
) -> Result<u64> {
    insert_subscriptions_with_retry(db, subscriptions, 0, 0).await
}

/// [`insert_subscriptions`] with retries on transient database errors.
pub async fn insert_subscriptions_with_retry(
    db: &DatabaseConnection,
    subscriptions: Vec<subscription::Model>,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<u64> {
    if subscriptions.is_empty() {
        return Ok(0);
    }

    let models: Vec<subscription::ActiveModel> = subscriptions
        .into_iter()
        .map(subscription_active_model)
        .collect();
    tracing::debug!(count = models.len(), "Inserting subscriptions");

    retry_transient("subscriptions", max_retries, initial_backoff_ms, || {
        let models = models.clone();
        async move {
            Subscription::insert_many(models)
                .on_conflict(subscription_on_conflict())
                .exec_without_returning(db)
                .await
                .map_err(StoreError::from)
        }
    })
    .await
}

pub(crate) fn item_on_conflict() -> OnConflict {
    OnConflict::columns([
        content_item::Column::SubscriptionId,
        content_item::Column::Url,
    ])
    .do_nothing()
    .to_owned()
}

pub(crate) fn subscription_on_conflict() -> OnConflict {
    OnConflict::columns([
        subscription::Column::UserId,
        subscription::Column::Provider,
        subscription::Column::ExternalId,
    ])
    .do_nothing()
    .to_owned()
}

fn item_active_model(item: content_item::Model) -> content_item::ActiveModel {
    content_item::ActiveModel {
        id: Set(item.id),
        subscription_id: Set(item.subscription_id),
        name: Set(item.name),
        url: Set(item.url),
        thumbnail: Set(item.thumbnail),
        published_at: Set(item.published_at),
        created_at: Set(item.created_at),
    }
}

fn subscription_active_model(sub: subscription::Model) -> subscription::ActiveModel {
    subscription::ActiveModel {
        id: Set(sub.id),
        user_id: Set(sub.user_id),
        provider: Set(sub.provider),
        external_id: Set(sub.external_id),
        name: Set(sub.name),
        thumbnail: Set(sub.thumbnail),
        checkpoint: Set(sub.checkpoint),
        created_at: Set(sub.created_at),
    }
}

/// Run `op`, retrying transient failures with doubling backoff.
async fn retry_transient<T, F, Fut>(
    what: &str,
    max_retries: u32,
    initial_backoff_ms: u64,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff_ms = initial_backoff_ms;
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    what,
                    attempt,
                    max_retries,
                    backoff_ms,
                    error = %e,
                    "Bulk insert failed, retrying..."
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = backoff_ms.saturating_mul(2);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, QueryTrait};
    use uuid::Uuid;

    use crate::entity::provider_kind::ProviderKind;

    use super::*;

    fn item(subscription_id: Uuid, url: &str) -> content_item::Model {
        let now = Utc::now().fixed_offset();
        content_item::Model {
            id: Uuid::new_v4(),
            subscription_id,
            name: format!("item {url}"),
            url: url.to_string(),
            thumbnail: "https://example.com/thumb.jpg".to_string(),
            published_at: now,
            created_at: now,
        }
    }

    #[test]
    fn test_item_insert_ignores_conflicts_on_dedup_key() {
        let query = ContentItem::insert_many(vec![item_active_model(item(
            Uuid::new_v4(),
            "https://example.com/1",
        ))])
        .on_conflict(item_on_conflict())
        .build(DatabaseBackend::Sqlite);

        let sql = query.to_string();
        assert!(sql.contains("ON CONFLICT"), "missing ON CONFLICT: {sql}");
        assert!(sql.contains("DO NOTHING"), "missing DO NOTHING: {sql}");
        assert!(
            sql.contains("\"subscription_id\", \"url\""),
            "conflict target should be the dedup key: {sql}"
        );
    }

    #[test]
    fn test_subscription_insert_ignores_conflicts_on_dedup_key() {
        let now = Utc::now().fixed_offset();
        let model = subscription::Model {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            provider: ProviderKind::YouTube,
            external_id: "UC123".to_string(),
            name: "Channel".to_string(),
            thumbnail: None,
            checkpoint: now,
            created_at: now,
        };
        let sql = Subscription::insert_many(vec![subscription_active_model(model)])
            .on_conflict(subscription_on_conflict())
            .build(DatabaseBackend::Sqlite)
            .to_string();

        assert!(
            sql.contains("\"user_id\", \"provider\", \"external_id\""),
            "conflict target should be the dedup key: {sql}"
        );
        assert!(sql.contains("DO NOTHING"));
    }

    #[tokio::test]
    async fn insert_items_returns_zero_for_empty_input() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let count = insert_items(&db, Vec::new()).await.expect("should succeed");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn insert_items_returns_rows_affected() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 0,
            }])
            .into_connection();

        let sub = Uuid::new_v4();
        let count = insert_items(
            &db,
            vec![
                item(sub, "https://example.com/1"),
                item(sub, "https://example.com/2"),
            ],
        )
        .await
        .expect("insert should succeed");
        // One of the two rows conflicted.
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn insert_items_with_retry_retries_transient_errors() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Conn(sea_orm::RuntimeErr::Internal(
                "temporarily unavailable".to_string(),
            ))])
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 0,
            }])
            .into_connection();

        let count = insert_items_with_retry(
            &db,
            vec![item(Uuid::new_v4(), "https://example.com/1")],
            1,
            0,
        )
        .await
        .expect("should succeed after retry");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn insert_items_does_not_retry_permanent_errors() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Custom("constraint failed".to_string())])
            .into_connection();

        let err = insert_items_with_retry(
            &db,
            vec![item(Uuid::new_v4(), "https://example.com/1")],
            3,
            0,
        )
        .await
        .expect_err("permanent error should surface");
        assert!(matches!(err, StoreError::Database(_)));
    }
}
