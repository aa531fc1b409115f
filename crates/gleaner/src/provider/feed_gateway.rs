use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entity::provider_kind::ProviderKind;
use crate::feed::{get_feed_items_with_retry, get_opml_outlines};
use crate::http::HttpTransport;
use crate::retry::RetryConfig;
use crate::sync::{SyncTarget, epoch};

use super::errors::Result;
use super::types::{DiscoveredSubscription, FetchedItem, ProviderGateway};

/// Base URL of the public per-channel video feed.
pub const YOUTUBE_FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";

/// Gateway for providers that publish a syndication feed per subscription.
///
/// - `feeds`: the external id is the feed URL; a user's external id is the
///   URL of an OPML export listing their feeds.
/// - `youtube`: the external id is a channel id (or a full feed URL).
/// - `podcasts`: the external id is the show's RSS URL.
#[derive(Clone)]
pub struct FeedGateway {
    provider: ProviderKind,
    transport: Arc<dyn HttpTransport>,
    retry: RetryConfig,
}

impl FeedGateway {
    pub fn new(provider: ProviderKind, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            provider,
            transport,
            retry: RetryConfig::default(),
        }
    }

    pub fn feeds(transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(ProviderKind::Feed, transport)
    }

    pub fn youtube(transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(ProviderKind::YouTube, transport)
    }

    pub fn podcasts(transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(ProviderKind::Podcast, transport)
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The document URL for a subscription's external id.
    pub fn feed_url(&self, external_id: &str) -> String {
        match self.provider {
            ProviderKind::YouTube if !external_id.starts_with("http") => {
                format!("{YOUTUBE_FEED_URL}{external_id}")
            }
            _ => external_id.to_string(),
        }
    }
}

/// Undated items carry the epoch and can never be newer than a checkpoint,
/// so they are always passed on and left to the store's duplicate check.
fn is_new(item: &FetchedItem, since: DateTime<Utc>) -> bool {
    since <= epoch() || item.published_at <= epoch() || item.published_at > since
}

#[async_trait]
impl ProviderGateway for FeedGateway {
    fn provider(&self) -> ProviderKind {
        self.provider
    }

    async fn fetch_items(
        &self,
        target: &SyncTarget,
        since: DateTime<Utc>,
    ) -> Result<Vec<FetchedItem>> {
        let url = self.feed_url(&target.external_id);
        let items = get_feed_items_with_retry(self.transport.as_ref(), &url, &self.retry).await?;
        let total = items.len();

        let items: Vec<FetchedItem> = items
            .into_iter()
            .map(FetchedItem::from)
            .filter(|item| !item.url.is_empty())
            .filter(|item| is_new(item, since))
            .collect();

        tracing::debug!(
            provider = %self.provider,
            url,
            total,
            new = items.len(),
            "Fetched feed items"
        );
        Ok(items)
    }

    async fn fetch_subscriptions(
        &self,
        user: &SyncTarget,
        _since: DateTime<Utc>,
    ) -> Result<Vec<DiscoveredSubscription>> {
        if self.provider != ProviderKind::Feed {
            return Ok(Vec::new());
        }

        let outlines = get_opml_outlines(self.transport.as_ref(), &user.external_id, &self.retry)
            .await?;

        Ok(outlines
            .into_iter()
            .map(|outline| DiscoveredSubscription {
                provider: ProviderKind::Feed,
                external_id: outline.xml_url,
                name: outline.title,
                thumbnail: None,
            })
            .collect())
    }
}
