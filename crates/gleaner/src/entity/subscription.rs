//! Subscription entity - a single provider channel/feed tracked for new content.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::provider_kind::ProviderKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Ownership ───────────────────────────────────────────────────────────
    /// User this subscription was discovered for, if any.
    pub user_id: Option<Uuid>,

    // ─── Provider Identity ───────────────────────────────────────────────────
    /// Provider the subscription lives on.
    pub provider: ProviderKind,
    /// Opaque provider id. For [`ProviderKind::Feed`] this is the feed URL.
    #[sea_orm(column_type = "Text")]
    pub external_id: String,

    // ─── Display ─────────────────────────────────────────────────────────────
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub thumbnail: Option<String>,

    // ─── Tracking ────────────────────────────────────────────────────────────
    /// Last successful synchronization. Epoch means "never", which forces a
    /// full scan on the next cycle.
    pub checkpoint: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::content_item::Entity")]
    ContentItem,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::content_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContentItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
