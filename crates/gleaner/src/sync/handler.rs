use std::sync::Arc;

use async_trait::async_trait;

use crate::events::{Event, EventHandler, Result};

use super::engine::SyncEngine;
use super::types::SyncOutcome;

/// Runs a sync pass for every staleness event.
///
/// A failed pass is not reported back to the bus: the checkpoint stays stale
/// and the next detector tick publishes a fresh event.
pub struct SyncEventHandler {
    engine: Arc<SyncEngine>,
}

impl SyncEventHandler {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EventHandler for SyncEventHandler {
    fn name(&self) -> &str {
        "sync"
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        let Event::TargetStale(stale) = event;

        let outcome = self.engine.handle(stale.target_kind, stale.target_id).await;
        if let SyncOutcome::Failed { error } = &outcome {
            tracing::debug!(event_id = %stale.id, error = %error, "Stale target will be retried on the next scan");
        }
        Ok(())
    }
}
