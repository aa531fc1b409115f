//! Common re-exports for convenient entity usage.

pub use super::content_item::{
    ActiveModel as ContentItemActiveModel, Column as ContentItemColumn, Entity as ContentItem,
    Model as ContentItemModel,
};
pub use super::provider_kind::ProviderKind;
pub use super::subscription::{
    ActiveModel as SubscriptionActiveModel, Column as SubscriptionColumn, Entity as Subscription,
    Model as SubscriptionModel,
};
pub use super::user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as User, Model as UserModel,
};
