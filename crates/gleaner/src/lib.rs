//! Gleaner - content synchronization for feeds, channels and podcasts.
//!
//! This library keeps a local store of content items current for many
//! subscriptions and users without fetching or storing anything twice:
//!
//! - [`scheduler`] runs recurring jobs at independent intervals
//! - [`sync::StalenessDetector`] jobs publish an event per stale target
//! - [`events`] delivers those events at-least-once
//! - [`sync::SyncEngine`] fetches through the [`provider`] aggregator,
//!   deduplicates, bulk persists and advances the checkpoint
//! - [`feed`] normalizes RSS and Atom documents into uniform items
//!
//! # Features
//!
//! - `sqlite` / `postgres` - sea-orm database drivers.
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to automatically run migrations on connection.
//! - `http` - The reqwest-backed [`http::ReqwestTransport`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gleaner::{connect_and_migrate, repository::DatabaseStore, sync::{SyncEngine, TargetKind}};
//!
//! let db = connect_and_migrate("sqlite://gleaner.db?mode=rwc").await?;
//! let engine = SyncEngine::new(Arc::new(DatabaseStore::new(db)), aggregator);
//! let outcome = engine.handle(TargetKind::Subscription, id).await;
//! ```

pub mod db;
pub mod entity;
pub mod events;
pub mod feed;
pub mod http;
pub mod provider;
pub mod repository;
pub mod retry;
pub mod scheduler;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use events::{Event, EventBus, EventBusError, EventHandler, InMemoryEventBus};
pub use feed::{FeedError, FeedInfo, FeedItem};
pub use provider::{ProviderAggregator, ProviderError, ProviderGateway};
pub use repository::{DatabaseStore, StoreError};
pub use scheduler::{Job, Scheduler, SchedulerHandle};
pub use sync::{SyncEngine, SyncOutcome, SyncStore, SyncTarget, TargetKind};
