//! Economic changes: settlement events and prosperity drift.
//!
//! Each settlement rolls for one economic event per step, with a chance
//! proportional to the elapsed weeks; the event's sign follows its type
//! (booms lift, crashes sink, most things could go either way).
//! Prosperity itself drifts deterministically with trade connectivity
//! and population.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::SmallRng;
use serde_json::json;

use loreforge_types::{EventConsequence, Settlement, WorldEvent, WorldEventId};

use crate::error::SimError;
use crate::progress::{StepWindow, WorldSimulator, chance};

/// Weekly chance of one economic event per settlement.
const WEEKLY_EVENT_CHANCE: f64 = 0.2;

/// The economic event types, rolled uniformly.
const EVENT_KINDS: [&str; 8] = [
    "trade_boom",
    "market_crash",
    "new_resource",
    "resource_depletion",
    "merchant_arrival",
    "trade_dispute",
    "festival",
    "infrastructure",
];

/// Types whose impact is always positive.
const POSITIVE_KINDS: [&str; 2] = ["trade_boom", "new_resource"];

/// Types whose impact is always negative.
const NEGATIVE_KINDS: [&str; 2] = ["market_crash", "resource_depletion"];

/// Run the economic sub-simulation.
pub(crate) async fn run(
    sim: &WorldSimulator,
    window: &StepWindow,
    rng: &mut SmallRng,
    events: &mut Vec<WorldEvent>,
) -> Result<serde_json::Value, SimError> {
    let settlements = sim.deps.settlements.list_by_session(window.session).await?;

    let mut economic_events: u32 = 0;
    for mut settlement in settlements.clone() {
        if rng.random_bool(chance(WEEKLY_EVENT_CHANCE * window.weeks())) {
            events.push(economic_event(window, &settlement, rng));
            economic_events = economic_events.saturating_add(1);
        }

        let drift = prosperity_drift(&settlement) * window.weeks();
        settlement.prosperity = (settlement.prosperity + drift).clamp(0.0, 1.0);
        sim.deps.settlements.update(&settlement).await?;
    }

    Ok(json!({
        "settlements": settlements.len(),
        "economic_events": economic_events,
    }))
}

/// Roll one economic event for a settlement.
fn economic_event(
    window: &StepWindow,
    settlement: &Settlement,
    rng: &mut SmallRng,
) -> WorldEvent {
    let kind = EVENT_KINDS
        .get(rng.random_range(0..EVENT_KINDS.len()))
        .copied()
        .unwrap_or("trade_dispute");

    let magnitude = if POSITIVE_KINDS.contains(&kind) {
        rng.random_range(0.0..0.2)
    } else if NEGATIVE_KINDS.contains(&kind) {
        -rng.random_range(0.0..0.2)
    } else {
        rng.random_range(-0.2..0.2)
    };
    let duration_days = rng.random_range(10..=40);

    WorldEvent {
        id: WorldEventId::new(),
        session: window.session,
        event_type: format!("economic_{kind}"),
        title: format!("{} in {}", headline(kind), settlement.name),
        description: format!(
            "Word spreads of a {} affecting {} and its markets.",
            kind.replace('_', " "),
            settlement.name
        ),
        impact: BTreeMap::from([(String::from("economic"), magnitude)]),
        affected_entities: vec![settlement.name.clone()],
        player_visible: true,
        occurred_at: window.now,
        consequences: vec![EventConsequence {
            kind: String::from("economic"),
            target: settlement.name.clone(),
            effect: format!("{} shifts local prices", kind.replace('_', " ")),
            magnitude,
            duration_days: Some(duration_days),
            params: BTreeMap::new(),
        }],
    }
}

/// Headline fragment per event kind.
fn headline(kind: &str) -> &'static str {
    match kind {
        "trade_boom" => "Trade boom",
        "market_crash" => "Market crash",
        "new_resource" => "New resource found",
        "resource_depletion" => "Resource runs dry",
        "merchant_arrival" => "Notable merchant arrives",
        "trade_dispute" => "Trade dispute",
        "festival" => "Festival season",
        _ => "Public works",
    }
}

/// Weekly prosperity drift from trade connectivity and population.
fn prosperity_drift(settlement: &Settlement) -> f64 {
    let population_bonus = if settlement.population > 10_000 {
        0.01
    } else if settlement.population < 1_000 {
        -0.01
    } else {
        0.0
    };
    0.01 * settlement.trade_routes.len() as f64
        + 0.005 * settlement.primary_exports.len() as f64
        + population_bonus
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeDelta, Utc};
    use rand::SeedableRng;

    use loreforge_db::{MemoryBackend, SettlementRepo};
    use loreforge_events::EventBus;
    use loreforge_llm::{LlmClient, MockClient};
    use loreforge_types::{Clock, FixedClock, SessionId, SettlementId};

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

    fn settlement(session: SessionId, population: u64, routes: usize, exports: usize) -> Settlement {
        Settlement {
            id: SettlementId::new(),
            session,
            name: String::from("Ironford"),
            population,
            government: String::from("council"),
            prosperity: 0.5,
            trade_routes: (0..routes).map(|i| format!("route {i}")).collect(),
            primary_exports: (0..exports).map(|i| format!("export {i}")).collect(),
        }
    }

    fn window(session: SessionId, days: i64) -> StepWindow {
        StepWindow {
            session,
            now: instant(),
            delta: TimeDelta::days(days),
        }
    }

    #[test]
    fn drift_combines_routes_exports_and_population() {
        let s = settlement(SessionId::new(), 500, 2, 1);
        // 0.02 + 0.005 - 0.01
        assert!((prosperity_drift(&s) - 0.015).abs() < 1e-12);

        let big = settlement(SessionId::new(), 20_000, 0, 0);
        assert!((prosperity_drift(&big) - 0.01).abs() < 1e-12);

        let middling = settlement(SessionId::new(), 5_000, 0, 0);
        assert!((prosperity_drift(&middling) - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn prosperity_updates_deterministically() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let s = settlement(session, 500, 2, 1);
        SettlementRepo::create(&backend, &s).await.ok();

        let sim = simulator(&backend, 1);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        run(&sim, &window(session, 7), &mut rng, &mut events)
            .await
            .ok();

        let stored = SettlementRepo::get(&backend, s.id).await.ok();
        let prosperity = stored.map(|s| s.prosperity).unwrap_or_default();
        // One week at +0.015 per week.
        assert!((prosperity - 0.515).abs() < 1e-9);
    }

    #[tokio::test]
    async fn long_gaps_guarantee_an_event() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        SettlementRepo::create(&backend, &settlement(session, 5_000, 1, 1))
            .await
            .ok();

        let sim = simulator(&backend, 2);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(2);
        // Five weeks: 0.2 * 5 clamps to probability 1.
        run(&sim, &window(session, 35), &mut rng, &mut events)
            .await
            .ok();

        assert_eq!(events.len(), 1);
        let event = events.first();
        assert!(event.is_some_and(|e| e.event_type.starts_with("economic_")));
        let duration = event
            .and_then(|e| e.consequences.first())
            .and_then(|c| c.duration_days);
        assert!(duration.is_some_and(|d| (10..=40).contains(&d)));
    }

    #[tokio::test]
    async fn event_sign_follows_its_kind() {
        // Sweep seeds to cover all event kinds; signs must match.
        let session = SessionId::new();
        for seed in 0..60_u64 {
            let backend = MemoryBackend::new();
            SettlementRepo::create(&backend, &settlement(session, 5_000, 0, 0))
                .await
                .ok();
            let sim = simulator(&backend, seed);
            let mut events = Vec::new();
            let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
            run(&sim, &window(session, 35), &mut rng, &mut events)
                .await
                .ok();

            for event in events {
                let magnitude = event.impact.get("economic").copied().unwrap_or(0.0);
                assert!(magnitude.abs() <= 0.2);
                if event.event_type == "economic_trade_boom"
                    || event.event_type == "economic_new_resource"
                {
                    assert!(magnitude >= 0.0, "{} went negative", event.event_type);
                }
                if event.event_type == "economic_market_crash"
                    || event.event_type == "economic_resource_depletion"
                {
                    assert!(magnitude <= 0.0, "{} went positive", event.event_type);
                }
            }
        }
    }

    #[tokio::test]
    async fn prosperity_clamps_to_unit_interval() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let mut s = settlement(session, 20_000, 10, 10);
        s.prosperity = 0.99;
        SettlementRepo::create(&backend, &s).await.ok();

        let sim = simulator(&backend, 3);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(3);
        run(&sim, &window(session, 70), &mut rng, &mut events)
            .await
            .ok();

        let stored = SettlementRepo::get(&backend, s.id).await.ok();
        assert!(stored.is_some_and(|s| s.prosperity <= 1.0));
    }
}
