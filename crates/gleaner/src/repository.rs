//! Store operations for subscriptions, users and content items.
//!
//! This module provides the sea-orm queries behind [`DatabaseStore`], the
//! database implementation of [`SyncStore`](crate::sync::SyncStore):
//! staleness scans, dedup lookups, conflict-ignoring bulk inserts and
//! monotonic checkpoint updates.

mod bulk;
mod checkpoint;
mod errors;
mod query;
mod store;

pub use bulk::{
    DEFAULT_BULK_INSERT_BACKOFF_MS, DEFAULT_BULK_INSERT_RETRIES, insert_items,
    insert_items_with_retry, insert_subscriptions, insert_subscriptions_with_retry,
};
pub use checkpoint::{advance_checkpoint, reset_checkpoint};
pub use errors::{Result, StoreError};
pub use query::{
    content_item_exists, count_items_by_subscription,
    find_stale_subscriptions, find_stale_users, find_subscription, find_subscriptions_by_user,
    find_user, subscription_exists,
};
pub use store::DatabaseStore;

#[cfg(test)]
mod tests {
    use sea_orm::{DbErr, RuntimeErr};
    use uuid::Uuid;

    use super::*;
    use crate::sync::TargetKind;

    #[test]
    fn test_store_error_target_not_found() {
        let id = Uuid::new_v4();
        let err = StoreError::target_not_found(TargetKind::User, id);
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("user"));
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn test_store_error_invalid_input() {
        let err = StoreError::invalid_input("Missing required field");
        let msg = err.to_string();
        assert!(msg.contains("Invalid input"));
        assert!(msg.contains("Missing required field"));
    }

    #[test]
    fn test_store_error_database_from_db_err() {
        let err: StoreError = DbErr::RecordNotFound("test".to_string()).into();
        assert!(err.to_string().contains("Database error"));
    }

    #[test]
    fn test_store_error_is_transient() {
        let locked: StoreError =
            DbErr::Conn(RuntimeErr::Internal("database is locked".to_string())).into();
        assert!(locked.is_transient());

        let custom: StoreError = DbErr::Custom("bad data".to_string()).into();
        assert!(!custom.is_transient());

        assert!(!StoreError::invalid_input("x").is_transient());
    }
}
