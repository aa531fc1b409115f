//! The content synchronization pipeline.
//!
//! - [`types`]: targets, outcomes, defaults
//! - [`store`]: the [`SyncStore`] persistence seam and an in-memory store
//! - [`engine`]: one idempotent pass per target
//! - [`detector`]: scheduled scans that publish staleness events
//! - [`handler`]: the event handler that feeds events to the engine
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gleaner::events::{EventBus, EventKind, InMemoryEventBus};
//! use gleaner::sync::{StalenessDetector, SyncEngine, SyncEventHandler, TargetKind};
//!
//! let engine = Arc::new(SyncEngine::new(store.clone(), aggregator));
//! let bus = Arc::new(InMemoryEventBus::default());
//! bus.subscribe(EventKind::TargetStale, Arc::new(SyncEventHandler::new(engine))).await?;
//! bus.start().await?;
//!
//! let detector = StalenessDetector::new(TargetKind::Subscription, store, bus.clone());
//! scheduler.schedule(Arc::new(detector), interval, false)?;
//! ```

pub mod detector;
pub mod engine;
pub mod handler;
mod locks;
pub mod store;
pub mod types;

pub use detector::StalenessDetector;
pub use engine::{SyncEngine, SyncError};
pub use handler::SyncEventHandler;
pub use locks::TargetLocks;
pub use store::{MemoryStore, SyncStore};
pub use types::{
    DEFAULT_STALENESS_HOURS, DEFAULT_SUBSCRIPTION_INTERVAL_SECS, DEFAULT_USER_INTERVAL_SECS,
    SyncOutcome, SyncSummary, SyncTarget, TargetKind, default_staleness_window, epoch,
};
