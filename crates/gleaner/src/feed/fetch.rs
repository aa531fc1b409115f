use crate::http::{FEED_ACCEPT, HttpRequest, HttpTransport};
use crate::retry::{RetryConfig, with_retry};

use super::error::{FeedError, Result};
use super::model::{FeedInfo, FeedItem};
use super::parse::{parse_feed_info, parse_feed_items};

/// Download a document, retrying transient failures. `Ok(None)` means the URL answered 404.
pub(super) async fn fetch_document(
    transport: &dyn HttpTransport,
    url: &str,
    accept: &str,
    retry: &RetryConfig,
) -> Result<Option<String>> {
    let response = with_retry(
        || async {
            let request = HttpRequest::get(url).with_header("Accept", accept);
            let response = transport.send(request).await?;
            if response.status == 404 || response.is_success() {
                Ok(response)
            } else {
                Err(FeedError::Http {
                    status: response.status,
                    url: url.to_string(),
                })
            }
        },
        FeedError::is_transient,
        url,
        retry,
    )
    .await?;

    if response.status == 404 {
        tracing::info!(url, "Document no longer exists");
        return Ok(None);
    }

    Ok(Some(response.text()))
}

/// Fetch and parse the items of a feed.
///
/// A 404 yields an empty list: the feed is gone, which is not a failure.
pub async fn get_feed_items(transport: &dyn HttpTransport, url: &str) -> Result<Vec<FeedItem>> {
    get_feed_items_with_retry(transport, url, &RetryConfig::default()).await
}

/// [`get_feed_items`] with an explicit retry policy.
pub async fn get_feed_items_with_retry(
    transport: &dyn HttpTransport,
    url: &str,
    retry: &RetryConfig,
) -> Result<Vec<FeedItem>> {
    match fetch_document(transport, url, FEED_ACCEPT, retry).await? {
        Some(body) => parse_feed_items(&body),
        None => Ok(Vec::new()),
    }
}

/// Fetch and parse feed metadata.
///
/// # Errors
/// `FeedError::NotFound` on 404, since there is no metadata to return.
pub async fn get_feed_info(transport: &dyn HttpTransport, url: &str) -> Result<FeedInfo> {
    get_feed_info_with_retry(transport, url, &RetryConfig::default()).await
}

/// [`get_feed_info`] with an explicit retry policy.
pub async fn get_feed_info_with_retry(
    transport: &dyn HttpTransport,
    url: &str,
    retry: &RetryConfig,
) -> Result<FeedInfo> {
    match fetch_document(transport, url, FEED_ACCEPT, retry).await? {
        Some(body) => parse_feed_info(&body),
        None => Err(FeedError::NotFound {
            url: url.to_string(),
        }),
    }
}
