use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

use super::error::{EventBusError, Result};
use super::model::{Event, EventKind};
use super::traits::{EventBus, EventHandler};

/// Default number of events buffered before `publish` waits.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default number of delivery attempts per handler.
pub const DEFAULT_MAX_DELIVERIES: u32 = 3;

/// Default pause before redelivering to a failed handler, in milliseconds.
pub const DEFAULT_REDELIVERY_DELAY_MS: u64 = 1_000;

/// Tuning for [`InMemoryEventBus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBusConfig {
    pub queue_capacity: usize,
    pub max_deliveries: u32,
    pub redeliver_on_failure: bool,
    pub redelivery_delay: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_deliveries: DEFAULT_MAX_DELIVERIES,
            redeliver_on_failure: true,
            redelivery_delay: Duration::from_millis(DEFAULT_REDELIVERY_DELAY_MS),
        }
    }
}

type HandlerTable = HashMap<EventKind, Vec<Arc<dyn EventHandler>>>;

struct Envelope {
    event: Event,
    attempt: u32,
    /// Handlers still owed this event; `None` means every subscriber.
    handlers: Option<Vec<Arc<dyn EventHandler>>>,
}

/// In-process [`EventBus`] backed by a bounded channel and one consumer task.
///
/// Events published before [`start`](EventBus::start) are buffered. A handler
/// that fails is retried up to `max_deliveries` times in total; the other
/// handlers of the same event are not called again.
pub struct InMemoryEventBus {
    config: EventBusConfig,
    handlers: Arc<RwLock<HandlerTable>>,
    sender: Mutex<Option<mpsc::Sender<Envelope>>>,
    receiver: Mutex<Option<mpsc::Receiver<Envelope>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl InMemoryEventBus {
    pub fn new(config: EventBusConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: Event) -> Result<()> {
        let sender = Self::lock(&self.sender)
            .clone()
            .ok_or(EventBusError::Closed)?;

        sender
            .send(Envelope {
                event,
                attempt: 1,
                handlers: None,
            })
            .await
            .map_err(|_| EventBusError::Closed)
    }

    async fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Result<()> {
        tracing::debug!(%kind, handler = handler.name(), "Subscribing event handler");
        self.handlers.write().await.entry(kind).or_default().push(handler);
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let receiver = Self::lock(&self.receiver)
            .take()
            .ok_or(EventBusError::AlreadyStarted)?;

        let worker = tokio::spawn(run_worker(
            receiver,
            Arc::clone(&self.handlers),
            self.config.clone(),
        ));
        *self.worker.lock().await = Some(worker);
        tracing::debug!("Event bus started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        // Dropping the last sender lets the worker drain and exit.
        let had_sender = Self::lock(&self.sender).take().is_some();

        if let Some(worker) = self.worker.lock().await.take()
            && let Err(e) = worker.await
        {
            tracing::error!(error = %e, "Event bus worker panicked");
        }

        if had_sender {
            tracing::debug!("Event bus stopped");
        }
        Ok(())
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Envelope>,
    handlers: Arc<RwLock<HandlerTable>>,
    config: EventBusConfig,
) {
    let mut redeliveries: VecDeque<Envelope> = VecDeque::new();

    loop {
        let envelope = match redeliveries.pop_front() {
            Some(envelope) => {
                tokio::time::sleep(config.redelivery_delay).await;
                envelope
            }
            None => match receiver.recv().await {
                Some(envelope) => envelope,
                None => break,
            },
        };

        if let Some(retry) = deliver(envelope, &handlers, &config).await {
            redeliveries.push_back(retry);
        }
    }

    tracing::debug!("Event bus worker drained");
}

/// Deliver one envelope; returns the envelope to retry, if any.
async fn deliver(
    envelope: Envelope,
    handlers: &RwLock<HandlerTable>,
    config: &EventBusConfig,
) -> Option<Envelope> {
    let Envelope {
        event,
        attempt,
        handlers: owed,
    } = envelope;
    let kind = event.kind();
    let event_id = event.id();

    let targets = match owed {
        Some(targets) => targets,
        None => handlers.read().await.get(&kind).cloned().unwrap_or_default(),
    };

    if targets.is_empty() {
        tracing::warn!(%event_id, %kind, "No handler subscribed, dropping event");
        return None;
    }

    let mut failed = Vec::new();
    for handler in targets {
        if let Err(e) = handler.handle(&event).await {
            tracing::warn!(
                %event_id,
                %kind,
                handler = handler.name(),
                attempt,
                error = %e,
                "Event handler failed"
            );
            failed.push(handler);
        }
    }

    if failed.is_empty() {
        return None;
    }

    if config.redeliver_on_failure && attempt < config.max_deliveries {
        Some(Envelope {
            event,
            attempt: attempt + 1,
            handlers: Some(failed),
        })
    } else {
        tracing::error!(
            %event_id,
            %kind,
            attempts = attempt,
            handlers = failed.len(),
            "Giving up on event"
        );
        None
    }
}
