//! Typed publish/subscribe between staleness detection and synchronization.
//!
//! Events are a closed enum; handlers register per [`EventKind`]. Delivery is
//! at-least-once with no ordering guarantee, so handlers must be idempotent.

mod error;
mod memory;
mod model;
mod traits;

pub use error::{EventBusError, Result};
pub use memory::{
    DEFAULT_MAX_DELIVERIES, DEFAULT_QUEUE_CAPACITY, DEFAULT_REDELIVERY_DELAY_MS, EventBusConfig,
    InMemoryEventBus,
};
pub use model::{Event, EventKind, StalenessEvent};
pub use traits::{EventBus, EventHandler};

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::sync::TargetKind;

    use super::*;

    #[test]
    fn test_staleness_event_serializes_with_kind_tag() {
        let target_id = Uuid::new_v4();
        let event: Event = StalenessEvent::new(TargetKind::User, target_id).into();

        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "target_stale");
        assert_eq!(json["target_kind"], "user");
        assert_eq!(json["target_id"], target_id.to_string());
        assert_eq!(json["id"], event.id().to_string());
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn test_event_json_decodes_back() {
        let event: Event = StalenessEvent::new(TargetKind::Subscription, Uuid::new_v4()).into();
        let decoded = Event::from_json(&event.to_json().unwrap()).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.kind(), EventKind::TargetStale);
    }

    #[test]
    fn test_unknown_event_kind_is_a_serialization_error() {
        let err = Event::from_json(r#"{"kind":"nope"}"#).unwrap_err();
        assert!(matches!(err, EventBusError::Serialization(_)));
    }

    #[test]
    fn test_each_staleness_event_gets_a_fresh_id() {
        let target = Uuid::new_v4();
        let a = StalenessEvent::new(TargetKind::User, target);
        let b = StalenessEvent::new(TargetKind::User, target);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_handler_error_message() {
        let err = EventBusError::handler("sync", EventKind::TargetStale, "db down");
        assert_eq!(err.to_string(), "handler sync failed on target_stale: db down");
    }
}
