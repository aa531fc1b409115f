use std::sync::Arc;

use async_trait::async_trait;

use super::error::Result;
use super::model::{Event, EventKind};

/// A consumer of events of one or more kinds.
///
/// Delivery is at-least-once, so `handle` must tolerate seeing the same event
/// more than once.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn handle(&self, event: &Event) -> Result<()>;
}

/// Typed publish/subscribe.
///
/// No ordering guarantee between events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Enqueue an event for delivery.
    async fn publish(&self, event: Event) -> Result<()>;

    /// Register a handler for every event of `kind`.
    async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()>;

    /// Begin delivering events.
    async fn start(&self) -> Result<()>;

    /// Stop accepting events and wait for queued ones to be delivered.
    async fn stop(&self) -> Result<()>;
}
