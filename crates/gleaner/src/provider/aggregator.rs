use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::sync::SyncTarget;

use super::errors::{ProviderError, Result, short_error_message};
use super::types::{DiscoveredSubscription, FetchedItem, ProviderGateway};

/// How a failing gateway affects the merged result.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Any gateway error fails the whole fetch.
    #[default]
    FailFast,
    /// Failing gateways are logged and their results dropped.
    Isolated,
}

/// Fans a fetch out to every gateway serving the target and merges the results.
///
/// Gateways run concurrently; results are concatenated in configuration order
/// regardless of completion order.
#[derive(Clone, Default)]
pub struct ProviderAggregator {
    gateways: Vec<Arc<dyn ProviderGateway>>,
    mode: AggregationMode,
}

impl ProviderAggregator {
    pub fn new(gateways: Vec<Arc<dyn ProviderGateway>>) -> Self {
        Self {
            gateways,
            mode: AggregationMode::default(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Append a gateway; it is merged after the ones already configured.
    pub fn push(&mut self, gateway: Arc<dyn ProviderGateway>) {
        self.gateways.push(gateway);
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    /// Content items of a subscription from every serving gateway.
    pub async fn fetch_items(
        &self,
        target: &SyncTarget,
        since: DateTime<Utc>,
    ) -> Result<Vec<FetchedItem>> {
        self.fan_out(target, move |gateway, target| async move {
            gateway.fetch_items(&target, since).await
        })
        .await
    }

    /// Subscriptions of a user from every serving gateway.
    pub async fn fetch_subscriptions(
        &self,
        user: &SyncTarget,
        since: DateTime<Utc>,
    ) -> Result<Vec<DiscoveredSubscription>> {
        self.fan_out(user, move |gateway, user| async move {
            gateway.fetch_subscriptions(&user, since).await
        })
        .await
    }

    async fn fan_out<T, F, Fut>(&self, target: &SyncTarget, call: F) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn ProviderGateway>, SyncTarget) -> Fut,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        let serving: Vec<_> = self
            .gateways
            .iter()
            .filter(|gateway| gateway.supports(target))
            .cloned()
            .collect();

        if serving.is_empty() {
            return Err(ProviderError::internal(format!(
                "no gateway configured for provider {}",
                target.provider
            )));
        }

        let mut set = JoinSet::new();
        for (index, gateway) in serving.iter().enumerate() {
            let fut = call(Arc::clone(gateway), target.clone());
            set.spawn(async move { (index, fut.await) });
        }

        let mut slots: Vec<Option<Vec<T>>> = serving.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            let (index, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    let err = ProviderError::internal(format!("gateway task failed: {e}"));
                    match self.mode {
                        AggregationMode::FailFast => return Err(err),
                        AggregationMode::Isolated => {
                            tracing::warn!(target_id = %target.id, error = %err, "Dropping gateway result");
                            continue;
                        }
                    }
                }
            };

            match result {
                Ok(records) => slots[index] = Some(records),
                Err(e) if self.mode == AggregationMode::Isolated => {
                    tracing::warn!(
                        target_id = %target.id,
                        provider = %serving[index].provider(),
                        error = %short_error_message(&e),
                        "Provider fetch failed, continuing without it"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(slots.into_iter().flatten().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::entity::provider_kind::ProviderKind;
    use crate::sync::{TargetKind, epoch};

    use super::*;

    struct StubGateway {
        provider: ProviderKind,
        delay_ms: u64,
        urls: Vec<&'static str>,
        fail: bool,
    }

    impl StubGateway {
        fn ok(delay_ms: u64, urls: Vec<&'static str>) -> Arc<dyn ProviderGateway> {
            Arc::new(Self {
                provider: ProviderKind::Feed,
                delay_ms,
                urls,
                fail: false,
            })
        }

        fn failing() -> Arc<dyn ProviderGateway> {
            Arc::new(Self {
                provider: ProviderKind::Feed,
                delay_ms: 0,
                urls: Vec::new(),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl ProviderGateway for StubGateway {
        fn provider(&self) -> ProviderKind {
            self.provider
        }

        async fn fetch_items(
            &self,
            _target: &SyncTarget,
            _since: DateTime<Utc>,
        ) -> Result<Vec<FetchedItem>> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            if self.fail {
                return Err(ProviderError::network("connection reset"));
            }
            Ok(self
                .urls
                .iter()
                .map(|url| FetchedItem {
                    name: url.to_string(),
                    url: url.to_string(),
                    thumbnail: String::new(),
                    published_at: epoch(),
                })
                .collect())
        }
    }

    fn target(provider: ProviderKind) -> SyncTarget {
        SyncTarget {
            id: Uuid::new_v4(),
            kind: TargetKind::Subscription,
            provider,
            external_id: "x".to_string(),
            owner_id: None,
            checkpoint: epoch(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_merge_in_configuration_order() {
        let aggregator = ProviderAggregator::new(vec![
            StubGateway::ok(50, vec!["a1", "a2"]),
            StubGateway::ok(0, vec!["b1"]),
        ]);

        let items = aggregator
            .fetch_items(&target(ProviderKind::Feed), epoch())
            .await
            .unwrap();
        let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["a1", "a2", "b1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_fails_the_whole_fetch() {
        let aggregator =
            ProviderAggregator::new(vec![StubGateway::ok(0, vec!["a1"]), StubGateway::failing()]);

        let err = aggregator
            .fetch_items(&target(ProviderKind::Feed), epoch())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_mode_drops_only_the_failing_gateway() {
        let aggregator =
            ProviderAggregator::new(vec![StubGateway::failing(), StubGateway::ok(0, vec!["b1"])])
                .with_mode(AggregationMode::Isolated);

        let items = aggregator
            .fetch_items(&target(ProviderKind::Feed), epoch())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "b1");
    }

    #[tokio::test]
    async fn test_unserved_provider_is_an_error() {
        let aggregator = ProviderAggregator::new(vec![StubGateway::ok(0, vec!["a1"])]);
        let err = aggregator
            .fetch_items(&target(ProviderKind::YouTube), epoch())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_default_subscription_fetch_is_empty() {
        let aggregator = ProviderAggregator::new(vec![StubGateway::ok(0, vec!["a1"])]);
        let mut user = target(ProviderKind::Feed);
        user.kind = TargetKind::User;

        let subs = aggregator.fetch_subscriptions(&user, epoch()).await.unwrap();
        assert!(subs.is_empty());
    }

    #[test]
    fn test_default_mode_is_fail_fast() {
        assert_eq!(ProviderAggregator::default().mode(), AggregationMode::FailFast);
        assert!(ProviderAggregator::default().is_empty());
    }
}
