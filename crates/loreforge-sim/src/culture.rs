//! Cultural evolution: slow drift in customs, art, and language.
//!
//! Cultures change on the scale of months, not hours; each culture
//! rolls once per step with a chance proportional to elapsed months.
//! The shift's subtype decides which aspects of life it touches.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::SmallRng;
use serde_json::json;

use loreforge_types::{Culture, WorldEvent, WorldEventId};

use crate::error::SimError;
use crate::progress::{StepWindow, WorldSimulator, chance};

/// Monthly chance of a cultural shift per culture.
const MONTHLY_SHIFT_CHANCE: f64 = 0.05;

/// Cultural shift subtypes, rolled uniformly.
const SHIFT_KINDS: [&str; 8] = [
    "new_tradition",
    "language_drift",
    "artistic_movement",
    "culinary_fusion",
    "fashion_shift",
    "religious_practice",
    "music_style",
    "storytelling_form",
];

/// Run the cultural-evolution sub-simulation.
pub(crate) async fn run(
    sim: &WorldSimulator,
    window: &StepWindow,
    rng: &mut SmallRng,
    events: &mut Vec<WorldEvent>,
) -> Result<serde_json::Value, SimError> {
    let cultures = sim.deps.cultures.list_by_session(window.session).await?;

    let mut shifts: u32 = 0;
    for culture in &cultures {
        if rng.random_bool(chance(MONTHLY_SHIFT_CHANCE * window.months())) {
            events.push(shift_event(window, culture, rng));
            shifts = shifts.saturating_add(1);
        }
    }

    Ok(json!({
        "cultures": cultures.len(),
        "cultural_shifts": shifts,
    }))
}

/// Roll one cultural shift for a culture.
fn shift_event(window: &StepWindow, culture: &Culture, rng: &mut SmallRng) -> WorldEvent {
    let kind = SHIFT_KINDS
        .get(rng.random_range(0..SHIFT_KINDS.len()))
        .copied()
        .unwrap_or("new_tradition");
    let aspects = affected_aspects(kind);

    WorldEvent {
        id: WorldEventId::new(),
        session: window.session,
        event_type: String::from("cultural_shift"),
        title: format!("{} among the {}", headline(kind), culture.name),
        description: format!(
            "A {} is taking hold among the {}, changing how they relate to {}.",
            kind.replace('_', " "),
            culture.name,
            aspects.join(" and ")
        ),
        impact: BTreeMap::from([(String::from("cultural"), 0.1)]),
        affected_entities: aspects
            .iter()
            .map(|aspect| (*aspect).to_owned())
            .chain(std::iter::once(culture.name.clone()))
            .collect(),
        player_visible: true,
        occurred_at: window.now,
        consequences: Vec::new(),
    }
}

/// Which aspects of life each shift subtype touches.
fn affected_aspects(kind: &str) -> &'static [&'static str] {
    match kind {
        "new_tradition" => &["customs", "festivals"],
        "language_drift" => &["language", "trade"],
        "artistic_movement" => &["art", "status"],
        "culinary_fusion" => &["food", "markets"],
        "fashion_shift" => &["dress", "status"],
        "religious_practice" => &["worship", "calendar"],
        "music_style" => &["music", "gatherings"],
        _ => &["stories", "memory"],
    }
}

/// Headline fragment per shift subtype.
fn headline(kind: &str) -> &'static str {
    match kind {
        "new_tradition" => "A new tradition",
        "language_drift" => "A turn of phrase",
        "artistic_movement" => "A new school of art",
        "culinary_fusion" => "A borrowed cuisine",
        "fashion_shift" => "A change of dress",
        "religious_practice" => "A new observance",
        "music_style" => "A new music",
        _ => "A new way of telling",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeDelta, Utc};
    use rand::SeedableRng;

    use loreforge_db::{CultureRepo, MemoryBackend};
    use loreforge_events::EventBus;
    use loreforge_llm::{LlmClient, MockClient};
    use loreforge_types::{Clock, CultureId, FixedClock, SessionId};

    use crate::progress::SimDeps;

    use super::*;

    fn instant() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap_or_default()
    }

    fn simulator(backend: &MemoryBackend, seed: u64) -> WorldSimulator {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(instant()));
        let deps = SimDeps::with_backend(
            backend,
            Arc::new(LlmClient::Mock(MockClient::returning("{}"))),
            Arc::new(EventBus::new()),
            clock,
        );
        WorldSimulator::with_seed(deps, seed)
    }

    fn culture(session: SessionId) -> Culture {
        Culture {
            id: CultureId::new(),
            session,
            name: String::from("River Folk"),
            description: String::from("Barge families of the lower delta."),
        }
    }

    #[test]
    fn aspect_map_covers_every_subtype() {
        for kind in SHIFT_KINDS {
            assert!(
                !affected_aspects(kind).is_empty(),
                "{kind} has no affected aspects"
            );
        }
    }

    #[tokio::test]
    async fn very_long_gaps_guarantee_a_shift() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        CultureRepo::create(&backend, &culture(session)).await.ok();

        let sim = simulator(&backend, 1);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        // Seven hundred days is over 23 months: 0.05 * 23.3 clamps to 1.
        let window = StepWindow {
            session,
            now: instant(),
            delta: TimeDelta::days(700),
        };
        run(&sim, &window, &mut rng, &mut events).await.ok();

        assert_eq!(events.len(), 1);
        let Some(event) = events.first() else { return };
        assert_eq!(event.event_type, "cultural_shift");
        assert!(event.affected_entities.contains(&String::from("River Folk")));
        // At least one mapped aspect rode along.
        assert!(event.affected_entities.len() >= 2);
    }

    #[tokio::test]
    async fn no_cultures_means_no_shifts() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let sim = simulator(&backend, 2);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(2);
        let window = StepWindow {
            session,
            now: instant(),
            delta: TimeDelta::days(700),
        };
        let detail = run(&sim, &window, &mut rng, &mut events).await.ok();

        assert!(events.is_empty());
        let count = detail
            .as_ref()
            .and_then(|d| d.get("cultures"))
            .and_then(serde_json::Value::as_u64);
        assert_eq!(count, Some(0));
    }
}
