//! Provider gateways and the aggregator that fans fetches out across them.
//!
//! A [`ProviderGateway`] knows how to list a subscription's content (and,
//! where the provider has accounts, a user's subscriptions). The
//! [`ProviderAggregator`] runs every gateway that serves a target
//! concurrently and merges what they return.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gleaner::http::ReqwestTransport;
//! use gleaner::provider::{FeedGateway, ProviderAggregator, RateLimitedGateway, rate_limits};
//!
//! let transport = Arc::new(ReqwestTransport::with_config(timeout, user_agent)?);
//! let feeds = RateLimitedGateway::new(FeedGateway::feeds(transport), rate_limits::FEED_DEFAULT_RPS);
//! let aggregator = ProviderAggregator::new(vec![Arc::new(feeds)]);
//! let items = aggregator.fetch_items(&target, target.checkpoint).await?;
//! ```

mod aggregator;
mod errors;
mod feed_gateway;
mod rate_limit;
mod types;

pub use aggregator::{AggregationMode, ProviderAggregator};
pub use errors::{ProviderError, Result, short_error_message};
pub use feed_gateway::{FeedGateway, YOUTUBE_FEED_URL};
pub use rate_limit::{
    ApiRateLimiter, RateLimitedGateway, default_rps_for_provider, rate_limits,
};
pub use types::{DiscoveredSubscription, FetchedItem, ProviderGateway};

#[cfg(test)]
mod tests {
    use std::time::{Duration as StdDuration, Instant};

    use chrono::Utc;

    use crate::entity::provider_kind::ProviderKind;
    use crate::feed::{FeedError, FeedItem};

    use super::*;

    #[test]
    fn test_provider_error_api() {
        let err = ProviderError::api("Something went wrong");
        assert!(err.to_string().contains("API error"));
        assert!(err.to_string().contains("Something went wrong"));
    }

    #[test]
    fn test_provider_error_not_found() {
        let err = ProviderError::not_found("channel UC123");
        assert!(err.to_string().contains("Not found"));
        assert!(err.to_string().contains("UC123"));
    }

    #[test]
    fn test_provider_error_is_transient() {
        assert!(ProviderError::network("connection refused").is_transient());
        assert!(
            ProviderError::RateLimited {
                reset_at: Utc::now()
            }
            .is_transient()
        );
        assert!(
            ProviderError::Feed(FeedError::Http {
                status: 503,
                url: "https://example.com".to_string()
            })
            .is_transient()
        );
        assert!(!ProviderError::Feed(FeedError::invalid("bad xml")).is_transient());
        assert!(!ProviderError::AuthRequired.is_transient());
        assert!(!ProviderError::internal("bug").is_transient());
    }

    #[test]
    fn test_provider_error_is_rate_limited() {
        let rate_limited = ProviderError::RateLimited {
            reset_at: Utc::now(),
        };
        assert!(rate_limited.is_rate_limited());
        assert!(!ProviderError::api("some error").is_rate_limited());
    }

    #[test]
    fn test_short_error_message_takes_first_line() {
        let err = ProviderError::api("upstream said no\n<html>...</html>");
        assert_eq!(short_error_message(&err), "API error: upstream said no");
    }

    #[test]
    fn test_fetched_item_from_feed_item() {
        let published = Utc::now();
        let item = FetchedItem::from(FeedItem {
            title: "Episode 1".to_string(),
            link: "https://example.com/1".to_string(),
            description: "desc".to_string(),
            published,
            thumbnail: "https://example.com/1.jpg".to_string(),
            raw_data: "<rss/>".to_string(),
        });

        assert_eq!(item.name, "Episode 1");
        assert_eq!(item.url, "https://example.com/1");
        assert_eq!(item.thumbnail, "https://example.com/1.jpg");
        assert_eq!(item.published_at, published);
    }

    #[test]
    fn test_default_rps_for_provider() {
        assert_eq!(
            default_rps_for_provider(ProviderKind::Feed),
            rate_limits::FEED_DEFAULT_RPS
        );
        assert_eq!(
            default_rps_for_provider(ProviderKind::YouTube),
            rate_limits::YOUTUBE_DEFAULT_RPS
        );
        assert_eq!(
            default_rps_for_provider(ProviderKind::Podcast),
            rate_limits::PODCAST_DEFAULT_RPS
        );
    }

    #[tokio::test]
    async fn test_api_rate_limiter_zero_rps_still_allows_requests() {
        let limiter = ApiRateLimiter::new(0);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < StdDuration::from_millis(50));
    }

    #[tokio::test]
    async fn test_api_rate_limiter_respects_rate() {
        // 2 RPS = one cell every 500ms
        let limiter = ApiRateLimiter::new(2);
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= StdDuration::from_millis(400));
    }

    #[test]
    fn test_rate_limited_gateway_is_clone_when_inner_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<RateLimitedGateway<FeedGateway>>();
    }
}
