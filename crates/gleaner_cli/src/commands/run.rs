use std::sync::Arc;
use std::time::Duration;

use console::Term;
use gleaner::TargetKind;
use gleaner::events::{EventBus, EventKind, InMemoryEventBus};
use gleaner::scheduler::{Job, Scheduler};
use gleaner::sync::{StalenessDetector, SyncEventHandler, SyncStore};

use crate::commands::shared::{CliResult, build_engine};
use crate::config::Config;
use crate::shutdown::setup_shutdown_handler;

/// Run detectors on their intervals and synchronize stale targets until Ctrl+C.
pub(crate) async fn handle_run(
    config: &Config,
    database_url: &str,
    skip_first: bool,
) -> CliResult<()> {
    let (store, engine) = build_engine(config, database_url).await?;
    let store: Arc<dyn SyncStore> = store;

    let bus = Arc::new(InMemoryEventBus::new(config.events.bus_config()));
    bus.subscribe(
        EventKind::TargetStale,
        Arc::new(SyncEventHandler::new(engine)),
    )
    .await?;
    bus.start().await?;

    let window = config.sync.staleness_window();
    let skip_first = skip_first || config.sync.skip_first;
    let mut scheduler = Scheduler::new();
    for (kind, interval_secs) in [
        (
            TargetKind::Subscription,
            config.sync.subscription_interval_secs,
        ),
        (TargetKind::User, config.sync.user_interval_secs),
    ] {
        let detector = StalenessDetector::new(kind, Arc::clone(&store), bus.clone())
            .with_window(window);
        let job: Arc<dyn Job> = Arc::new(detector);
        scheduler.schedule(job, Duration::from_secs(interval_secs), skip_first)?;
    }

    setup_shutdown_handler(scheduler.handle());

    let is_tty = Term::stdout().is_term();
    if is_tty {
        println!(
            "Watching for stale content (subscriptions every {}s, users every {}s). Ctrl+C to stop.",
            config.sync.subscription_interval_secs, config.sync.user_interval_secs
        );
    }
    tracing::info!(
        staleness_hours = config.sync.staleness_hours,
        mode = ?config.sync.aggregation_mode(),
        "Pipeline started"
    );

    scheduler.start().await;

    // Drain events already queued so their passes complete.
    bus.stop().await?;
    tracing::info!("Pipeline stopped");
    if is_tty {
        println!("Stopped.");
    }

    Ok(())
}
