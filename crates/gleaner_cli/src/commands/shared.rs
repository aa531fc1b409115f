//! Pipeline wiring shared by the commands that synchronize.

use std::sync::Arc;

use gleaner::entity::provider_kind::ProviderKind;
use gleaner::http::{HttpTransport, ReqwestTransport};
use gleaner::provider::{
    FeedGateway, ProviderAggregator, ProviderGateway, RateLimitedGateway, default_rps_for_provider,
};
use gleaner::sync::SyncEngine;
use gleaner::{DatabaseStore, TargetKind};
use sea_orm::Iterable;

use crate::config::Config;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Build the outbound HTTP transport from the `[http]` section.
pub(crate) fn build_transport(config: &Config) -> CliResult<Arc<dyn HttpTransport>> {
    let transport = ReqwestTransport::with_config(config.http.timeout(), &config.http.user_agent)?;
    Ok(Arc::new(transport))
}

/// Requests per second for a provider: the configured override, else its default.
pub(crate) fn provider_rps(config: &Config, provider: ProviderKind) -> u32 {
    match config.sync.provider_rps {
        0 => default_rps_for_provider(provider),
        rps => rps,
    }
}

/// One rate-limited feed gateway per provider, in declaration order.
pub(crate) fn build_aggregator(
    config: &Config,
    transport: Arc<dyn HttpTransport>,
) -> ProviderAggregator {
    let gateways = ProviderKind::iter()
        .map(|provider| {
            let gateway = FeedGateway::new(provider, Arc::clone(&transport));
            let limited = RateLimitedGateway::new(gateway, provider_rps(config, provider));
            Arc::new(limited) as Arc<dyn ProviderGateway>
        })
        .collect();

    ProviderAggregator::new(gateways).with_mode(config.sync.aggregation_mode())
}

/// Connect, build the store and the engine.
pub(crate) async fn build_engine(
    config: &Config,
    database_url: &str,
) -> CliResult<(Arc<DatabaseStore>, Arc<SyncEngine>)> {
    let db = gleaner::connect(database_url).await?;
    let store = Arc::new(DatabaseStore::new(db));
    let aggregator = build_aggregator(config, build_transport(config)?);
    let engine = Arc::new(
        SyncEngine::new(store.clone(), aggregator).with_window(config.sync.staleness_window()),
    );
    Ok((store, engine))
}

pub(crate) fn target_kind(user: bool) -> TargetKind {
    if user {
        TargetKind::User
    } else {
        TargetKind::Subscription
    }
}
