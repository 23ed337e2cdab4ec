//! Natural events: weather, disasters, and stranger things.
//!
//! One roll per step, scaled by elapsed weeks. Narration is optional
//! here -- when the LLM is unavailable the event is still emitted with
//! stock prose, because a flood happens whether or not anyone writes it
//! up nicely.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::SmallRng;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use loreforge_types::{EventConsequence, WorldEvent, WorldEventId};

use crate::error::SimError;
use crate::progress::{StepWindow, WorldSimulator, chance};

/// Weekly chance of one natural event per session.
const WEEKLY_EVENT_CHANCE: f64 = 0.2;

/// Natural event types, rolled uniformly.
const EVENT_KINDS: [&str; 9] = [
    "storm",
    "earthquake",
    "flood",
    "drought",
    "wildfire",
    "celestial_event",
    "disease_outbreak",
    "natural_disaster",
    "bountiful_harvest",
];

/// Run the natural-events sub-simulation.
pub(crate) async fn run(
    sim: &WorldSimulator,
    ctx: &CancellationToken,
    window: &StepWindow,
    rng: &mut SmallRng,
    events: &mut Vec<WorldEvent>,
) -> Result<serde_json::Value, SimError> {
    let mut emitted: u32 = 0;

    if rng.random_bool(chance(WEEKLY_EVENT_CHANCE * window.weeks())) {
        let kind = EVENT_KINDS
            .get(rng.random_range(0..EVENT_KINDS.len()))
            .copied()
            .unwrap_or("storm");
        let severity: u32 = rng.random_range(1..=5);
        let duration_days = rng.random_range(1..=30);
        let area = affected_area(kind);

        let description = narrate(sim, ctx, kind, severity).await.unwrap_or_else(|| {
            format!(
                "A {} (severity {severity}) affects the {area} area.",
                kind.replace('_', " ")
            )
        });

        events.push(WorldEvent {
            id: WorldEventId::new(),
            session: window.session,
            event_type: format!("natural_{kind}"),
            title: format!("{} strikes", headline(kind)),
            description,
            impact: BTreeMap::from([(String::from("environmental"), f64::from(severity) / 5.0)]),
            affected_entities: vec![area.to_owned()],
            player_visible: true,
            occurred_at: window.now,
            consequences: vec![EventConsequence {
                kind: String::from("environmental"),
                target: area.to_owned(),
                effect: format!("{} conditions persist", kind.replace('_', " ")),
                magnitude: f64::from(severity),
                duration_days: Some(duration_days),
                params: BTreeMap::new(),
            }],
        });
        emitted = emitted.saturating_add(1);
    }

    Ok(json!({"natural_events": emitted}))
}

/// How far each event type reaches.
fn affected_area(kind: &str) -> &'static str {
    match kind {
        "celestial_event" => "global",
        "earthquake" | "wildfire" | "natural_disaster" => "local",
        _ => "regional",
    }
}

/// Headline fragment per event type.
fn headline(kind: &str) -> &'static str {
    match kind {
        "storm" => "A great storm",
        "earthquake" => "An earthquake",
        "flood" => "A flood",
        "drought" => "A drought",
        "wildfire" => "A wildfire",
        "celestial_event" => "A sign in the heavens",
        "disease_outbreak" => "A sickness",
        "natural_disaster" => "Calamity",
        _ => "An uncanny bounty",
    }
}

/// Optional narration; `None` falls back to stock prose.
async fn narrate(
    sim: &WorldSimulator,
    ctx: &CancellationToken,
    kind: &str,
    severity: u32,
) -> Option<String> {
    let system = "You describe natural events in a fantasy world in two \
                  sentences. Respond with the description text only, no JSON.";
    let user = format!(
        "Describe a {} of severity {severity} on a scale of 1 to 5.",
        kind.replace('_', " ")
    );
    match sim.deps.llm.generate_completion(ctx, &user, system).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeDelta, Utc};
    use rand::SeedableRng;

    use loreforge_db::MemoryBackend;
    use loreforge_events::EventBus;
    use loreforge_llm::{LlmClient, MockClient};
    use loreforge_types::{Clock, FixedClock, SessionId};

    use crate::progress::SimDeps;

    use super::*;

    fn instant() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap_or_default()
    }

    fn simulator(llm: LlmClient, seed: u64) -> WorldSimulator {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(instant()));
        let deps = SimDeps::with_backend(
            &MemoryBackend::new(),
            Arc::new(llm),
            Arc::new(EventBus::new()),
            clock,
        );
        WorldSimulator::with_seed(deps, seed)
    }

    fn window(session: SessionId, days: i64) -> StepWindow {
        StepWindow {
            session,
            now: instant(),
            delta: TimeDelta::days(days),
        }
    }

    #[test]
    fn area_map_is_fixed() {
        assert_eq!(affected_area("celestial_event"), "global");
        assert_eq!(affected_area("natural_disaster"), "local");
        assert_eq!(affected_area("earthquake"), "local");
        assert_eq!(affected_area("storm"), "regional");
        assert_eq!(affected_area("drought"), "regional");
    }

    #[tokio::test]
    async fn long_gaps_guarantee_an_event_with_bounds() {
        let session = SessionId::new();
        for seed in 0..30_u64 {
            let sim = simulator(
                LlmClient::Mock(MockClient::returning("The sky splits with green fire.")),
                seed,
            );
            let mut events = Vec::new();
            let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
            // Five weeks: 0.2 * 5 clamps to certainty.
            run(
                &sim,
                &CancellationToken::new(),
                &window(session, 35),
                &mut rng,
                &mut events,
            )
            .await
            .ok();

            assert_eq!(events.len(), 1);
            let Some(event) = events.first() else { return };
            assert!(event.event_type.starts_with("natural_"));
            assert!(event.description.contains("green fire"));
            let consequence = event.consequences.first();
            let severity = consequence.map(|c| c.magnitude).unwrap_or_default();
            assert!((1.0..=5.0).contains(&severity));
            let duration = consequence.and_then(|c| c.duration_days).unwrap_or_default();
            assert!((1..=30).contains(&duration));
        }
    }

    #[tokio::test]
    async fn event_is_emitted_without_narration() {
        let session = SessionId::new();
        let sim = simulator(LlmClient::Mock(MockClient::failing("offline")), 9);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(9);
        run(
            &sim,
            &CancellationToken::new(),
            &window(session, 35),
            &mut rng,
            &mut events,
        )
        .await
        .ok();

        assert_eq!(events.len(), 1);
        let description = events.first().map(|e| e.description.clone()).unwrap_or_default();
        assert!(description.contains("severity"));
    }

    #[tokio::test]
    async fn short_gaps_rarely_roll() {
        // With one hour elapsed the probability is ~0.001; across a few
        // seeds we expect silence.
        let session = SessionId::new();
        let mut total = 0_usize;
        for seed in 0..20_u64 {
            let sim = simulator(LlmClient::Mock(MockClient::returning("x")), seed);
            let mut events = Vec::new();
            let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
            run(
                &sim,
                &CancellationToken::new(),
                &StepWindow {
                    session,
                    now: instant(),
                    delta: TimeDelta::hours(1),
                },
                &mut rng,
                &mut events,
            )
            .await
            .ok();
            total += events.len();
        }
        assert!(total <= 2, "unexpectedly many events: {total}");
    }
}
