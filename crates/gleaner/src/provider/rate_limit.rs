use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::entity::provider_kind::ProviderKind;
use crate::sync::SyncTarget;

use super::errors::Result;
use super::types::{DiscoveredSubscription, FetchedItem, ProviderGateway};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default request rates per provider (requests per second).
pub mod rate_limits {
    /// Arbitrary feed hosts: many different servers, keep it polite.
    pub const FEED_DEFAULT_RPS: u32 = 5;
    /// Public channel feeds are served from one host.
    pub const YOUTUBE_DEFAULT_RPS: u32 = 2;
    /// Podcast hosting CDNs tolerate more.
    pub const PODCAST_DEFAULT_RPS: u32 = 5;
}

/// Get the default rate limit for a provider.
pub fn default_rps_for_provider(provider: ProviderKind) -> u32 {
    match provider {
        ProviderKind::Feed => rate_limits::FEED_DEFAULT_RPS,
        ProviderKind::YouTube => rate_limits::YOUTUBE_DEFAULT_RPS,
        ProviderKind::Podcast => rate_limits::PODCAST_DEFAULT_RPS,
    }
}

fn direct_limiter(requests_per_second: u32) -> GovernorRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    RateLimiter::direct(Quota::per_second(rps))
}

/// A standalone rate limiter for calls that don't go through a gateway.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            inner: Arc::new(direct_limiter(requests_per_second)),
        }
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// A rate-limited wrapper around any [`ProviderGateway`].
///
/// Every fetch waits for the limiter before delegating to the inner gateway.
pub struct RateLimitedGateway<G> {
    inner: G,
    limiter: ApiRateLimiter,
}

impl<G> RateLimitedGateway<G> {
    pub fn new(inner: G, requests_per_second: u32) -> Self {
        Self {
            inner,
            limiter: ApiRateLimiter::new(requests_per_second),
        }
    }

    /// Share an existing limiter, so several gateways draw from one budget.
    pub fn with_limiter(inner: G, limiter: ApiRateLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

impl<G: Clone> Clone for RateLimitedGateway<G> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<G: ProviderGateway> ProviderGateway for RateLimitedGateway<G> {
    fn provider(&self) -> ProviderKind {
        self.inner.provider()
    }

    fn supports(&self, target: &SyncTarget) -> bool {
        self.inner.supports(target)
    }

    async fn fetch_items(
        &self,
        target: &SyncTarget,
        since: DateTime<Utc>,
    ) -> Result<Vec<FetchedItem>> {
        self.limiter.wait().await;
        self.inner.fetch_items(target, since).await
    }

    async fn fetch_subscriptions(
        &self,
        user: &SyncTarget,
        since: DateTime<Utc>,
    ) -> Result<Vec<DiscoveredSubscription>> {
        self.limiter.wait().await;
        self.inner.fetch_subscriptions(user, since).await
    }
}
