use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sync::TargetKind;

use super::error::Result;

/// Dispatch key of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TargetStale,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::TargetStale => write!(f, "target_stale"),
        }
    }
}

/// A subscription or user whose checkpoint fell behind the staleness window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessEvent {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub target_id: Uuid,
    pub target_kind: TargetKind,
}

impl StalenessEvent {
    pub fn new(target_kind: TargetKind, target_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            target_id,
            target_kind,
        }
    }
}

/// Every event the bus can carry.
///
/// Serialized with an internal `kind` tag, e.g.
/// `{"kind":"target_stale","id":"…","created_at":"…","target_id":"…","target_kind":"user"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    TargetStale(StalenessEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TargetStale(_) => EventKind::TargetStale,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Event::TargetStale(e) => e.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Event::TargetStale(e) => e.created_at,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<StalenessEvent> for Event {
    fn from(event: StalenessEvent) -> Self {
        Event::TargetStale(event)
    }
}
