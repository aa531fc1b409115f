use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entity::content_item::{self, Entity as ContentItem};
use crate::entity::provider_kind::ProviderKind;
use crate::entity::subscription::{self, Entity as Subscription};
use crate::entity::user::{self, Entity as User};

use super::errors::{Result, StoreError};

// ─── Staleness ───────────────────────────────────────────────────────────────

/// Subscriptions whose checkpoint is strictly older than `before`, oldest first.
pub async fn find_stale_subscriptions(
    db: &DatabaseConnection,
    before: DateTime<Utc>,
) -> Result<Vec<subscription::Model>> {
    Subscription::find()
        .filter(subscription::Column::Checkpoint.lt(before.fixed_offset()))
        .order_by_asc(subscription::Column::Checkpoint)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Users whose checkpoint is strictly older than `before`, oldest first.
pub async fn find_stale_users(
    db: &DatabaseConnection,
    before: DateTime<Utc>,
) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::Checkpoint.lt(before.fixed_offset()))
        .order_by_asc(user::Column::Checkpoint)
        .all(db)
        .await
        .map_err(StoreError::from)
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

/// Find a subscription by id.
pub async fn find_subscription(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<subscription::Model>> {
    Subscription::find_by_id(id)
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Find a user by id.
pub async fn find_user(db: &DatabaseConnection, id: Uuid) -> Result<Option<user::Model>> {
    User::find_by_id(id).one(db).await.map_err(StoreError::from)
}

// ─── Dedup Checks ────────────────────────────────────────────────────────────

/// Whether a content item with this canonical URL is already stored for the subscription.
pub async fn content_item_exists(
    db: &DatabaseConnection,
    subscription_id: Uuid,
    url: &str,
) -> Result<bool> {
    let count = ContentItem::find()
        .filter(content_item::Column::SubscriptionId.eq(subscription_id))
        .filter(content_item::Column::Url.eq(url))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Whether the user already has a subscription to this provider identity.
pub async fn subscription_exists(
    db: &DatabaseConnection,
    user_id: Uuid,
    provider: ProviderKind,
    external_id: &str,
) -> Result<bool> {
    let count = Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::Provider.eq(provider))
        .filter(subscription::Column::ExternalId.eq(external_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

// ─── Listing ─────────────────────────────────────────────────────────────────

/// Count content items of a subscription.
pub async fn count_items_by_subscription(
    db: &DatabaseConnection,
    subscription_id: Uuid,
) -> Result<u64> {
    ContentItem::find()
        .filter(content_item::Column::SubscriptionId.eq(subscription_id))
        .count(db)
        .await
        .map_err(StoreError::from)
}

/// Subscriptions owned by a user.
pub async fn find_subscriptions_by_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<subscription::Model>> {
    Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .order_by_asc(subscription::Column::Name)
        .all(db)
        .await
        .map_err(StoreError::from)
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use chrono::Duration;
    use sea_orm::{EntityTrait, Set};

    use crate::connect_and_migrate;
    use crate::sync::epoch;

    use super::*;

    async fn setup_db() -> DatabaseConnection {
        connect_and_migrate("sqlite::memory:")
            .await
            .expect("test db should migrate")
    }

    async fn insert_subscription(
        db: &DatabaseConnection,
        name: &str,
        checkpoint: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        Subscription::insert(subscription::ActiveModel {
            id: Set(id),
            user_id: Set(None),
            provider: Set(ProviderKind::Feed),
            external_id: Set(format!("https://example.com/{name}.xml")),
            name: Set(name.to_string()),
            thumbnail: Set(None),
            checkpoint: Set(checkpoint.fixed_offset()),
            created_at: Set(Utc::now().fixed_offset()),
        })
        .exec(db)
        .await
        .expect("subscription should insert");
        id
    }

    #[tokio::test]
    async fn test_find_stale_subscriptions_orders_oldest_first() {
        let db = setup_db().await;
        let now = Utc::now();
        insert_subscription(&db, "fresh", now - Duration::hours(1)).await;
        insert_subscription(&db, "day-old", now - Duration::hours(30)).await;
        insert_subscription(&db, "never", epoch()).await;

        let stale = find_stale_subscriptions(&db, now - Duration::hours(24))
            .await
            .expect("query should succeed");

        let names: Vec<_> = stale.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["never", "day-old"]);
    }

    #[tokio::test]
    async fn test_content_item_exists_matches_subscription_and_url() {
        let db = setup_db().await;
        let sub_id = insert_subscription(&db, "a", epoch()).await;
        let other_id = insert_subscription(&db, "b", epoch()).await;

        ContentItem::insert(content_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            subscription_id: Set(sub_id),
            name: Set("Episode 1".to_string()),
            url: Set("https://example.com/1".to_string()),
            thumbnail: Set("https://example.com/1.jpg".to_string()),
            published_at: Set(Utc::now().fixed_offset()),
            created_at: Set(Utc::now().fixed_offset()),
        })
        .exec(&db)
        .await
        .expect("item should insert");

        assert!(
            content_item_exists(&db, sub_id, "https://example.com/1")
                .await
                .unwrap()
        );
        assert!(
            !content_item_exists(&db, other_id, "https://example.com/1")
                .await
                .unwrap()
        );
        assert!(
            !content_item_exists(&db, sub_id, "https://example.com/2")
                .await
                .unwrap()
        );
    }
}
