//! Default event-bus subscribers wired at startup.
//!
//! - **Audit**: structured log line for every event on every canonical
//!   topic.
//! - **Analytics**: a running counter of persisted world events, logged
//!   by the scheduler each pass.
//!
//! Handlers mutate nothing; anything needing to change world state goes
//! through the repositories.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use loreforge_events::{EventBus, topic};

/// Running counters maintained by the default subscribers.
#[derive(Debug, Default)]
pub struct Analytics {
    /// World events observed on the bus since startup.
    world_events: AtomicU64,
}

impl Analytics {
    /// World events observed so far.
    pub fn world_events(&self) -> u64 {
        self.world_events.load(Ordering::Relaxed)
    }
}

/// Attach the audit and analytics subscribers to the bus.
pub fn register_default_subscribers(bus: &EventBus) -> Arc<Analytics> {
    for tag in topic::ALL {
        bus.on(tag, move |event| async move {
            info!(
                event_type = event.event_type(),
                at = %event.timestamp(),
                data = %event.data(),
                "audit"
            );
            Ok(())
        });
    }

    let analytics = Arc::new(Analytics::default());
    let counting = Arc::clone(&analytics);
    bus.on(topic::WORLD_EVENT_RECORDED, move |_event| {
        let counting = Arc::clone(&counting);
        async move {
            counting.world_events.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    });
    analytics
}

#[cfg(test)]
mod tests {
    use loreforge_events::WorldEventRecorded;
    use loreforge_types::{SessionId, WorldEvent, WorldEventId};

    use super::*;

    fn sample_event() -> WorldEvent {
        WorldEvent {
            id: WorldEventId::new(),
            session: SessionId::new(),
            event_type: String::from("natural_storm"),
            title: String::from("A storm"),
            description: String::new(),
            impact: std::collections::BTreeMap::new(),
            affected_entities: Vec::new(),
            player_visible: true,
            occurred_at: chrono::DateTime::from_timestamp(1_750_000_000, 0).unwrap_or_default(),
            consequences: Vec::new(),
        }
    }

    #[tokio::test]
    async fn analytics_counts_world_events() {
        let bus = EventBus::new();
        let analytics = register_default_subscribers(&bus);

        bus.publish_and_wait(Arc::new(WorldEventRecorded {
            event: sample_event(),
        }))
        .await;
        bus.publish_and_wait(Arc::new(WorldEventRecorded {
            event: sample_event(),
        }))
        .await;

        assert_eq!(analytics.world_events(), 2);
    }
}
