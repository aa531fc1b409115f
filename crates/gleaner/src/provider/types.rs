use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::provider_kind::ProviderKind;
use crate::feed::FeedItem;
use crate::sync::SyncTarget;

use super::errors::Result;

/// A content record as fetched from a provider, before it is tied to a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedItem {
    pub name: String,
    /// Canonical URL; the dedup key within a subscription.
    pub url: String,
    pub thumbnail: String,
    pub published_at: DateTime<Utc>,
}

impl From<FeedItem> for FetchedItem {
    fn from(item: FeedItem) -> Self {
        Self {
            name: item.title,
            url: item.link,
            thumbnail: item.thumbnail,
            published_at: item.published,
        }
    }
}

/// A subscription found on a user's provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSubscription {
    pub provider: ProviderKind,
    pub external_id: String,
    pub name: String,
    pub thumbnail: Option<String>,
}

/// Fetch contract for one content provider.
///
/// Implementations are stateless with respect to sync: they never touch the
/// store and never decide what is new. They return what the provider reports
/// since `since`, and the engine deduplicates.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// The provider this gateway talks to.
    fn provider(&self) -> ProviderKind;

    /// Whether this gateway can serve `target`.
    fn supports(&self, target: &SyncTarget) -> bool {
        target.provider == self.provider()
    }

    /// Content items of a subscription published after `since`.
    ///
    /// `since` is an exclusive lower bound; epoch means "everything".
    async fn fetch_items(&self, target: &SyncTarget, since: DateTime<Utc>)
    -> Result<Vec<FetchedItem>>;

    /// Subscriptions on a user's account.
    ///
    /// Gateways without an account concept report none.
    async fn fetch_subscriptions(
        &self,
        user: &SyncTarget,
        since: DateTime<Utc>,
    ) -> Result<Vec<DiscoveredSubscription>> {
        let _ = (user, since);
        Ok(Vec::new())
    }
}
