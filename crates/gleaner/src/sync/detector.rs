use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::events::{Event, EventBus, StalenessEvent};
use crate::provider::short_error_message;
use crate::scheduler::Job;

use super::store::SyncStore;
use super::types::{TargetKind, default_staleness_window};

/// Publishes a staleness event for every target of one kind whose checkpoint
/// is older than the window. Never touches checkpoints itself.
pub struct StalenessDetector {
    kind: TargetKind,
    name: String,
    store: Arc<dyn SyncStore>,
    bus: Arc<dyn EventBus>,
    window: Duration,
}

impl StalenessDetector {
    pub fn new(kind: TargetKind, store: Arc<dyn SyncStore>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            kind,
            name: format!("{kind}-staleness"),
            store,
            bus,
            window: default_staleness_window(),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Scan once and return how many events were published.
    #[tracing::instrument(skip_all, fields(kind = %self.kind))]
    pub async fn detect(&self) -> usize {
        let before = Utc::now() - self.window;
        let targets = match self.store.get_stale_targets(self.kind, before).await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(error = %short_error_message(&e), "Staleness scan failed");
                return 0;
            }
        };

        let mut published = 0;
        for target in &targets {
            let event = Event::from(StalenessEvent::new(self.kind, target.id));
            match self.bus.publish(event).await {
                Ok(()) => published += 1,
                Err(e) => {
                    tracing::warn!(target_id = %target.id, error = %e, "Failed to publish staleness event");
                }
            }
        }

        tracing::info!(stale = targets.len(), published, "Staleness scan finished");
        published
    }
}

#[async_trait]
impl Job for StalenessDetector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) {
        self.detect().await;
    }
}
