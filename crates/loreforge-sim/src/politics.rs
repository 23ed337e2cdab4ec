//! Political developments: agenda advancement, opportunities, and
//! faction-to-faction interactions.
//!
//! Agendas creep forward at a pace shaped by the faction's temperament
//! (aggression and diplomacy both help, differently). Each faction may
//! surface a time-limited political opportunity. Every unordered pair
//! of factions rolls for an interaction; hostile pairs clash more
//! often, and a consummated interaction permanently shifts the standing
//! on both sides. Interactions require narration -- when the LLM cannot
//! provide it, the moment passes unrecorded.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::SmallRng;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use loreforge_events::FactionRelationChanged;
use loreforge_types::{
    AgendaStatus, EventConsequence, Faction, FactionId, FactionRelation, WorldEvent,
    WorldEventId,
};

use crate::error::SimError;
use crate::progress::{StepWindow, WorldSimulator, chance};

/// Weekly base rate of agenda stage completion.
const WEEKLY_AGENDA_RATE: f64 = 0.05;

/// Weekly chance of a political opportunity per faction.
const WEEKLY_OPPORTUNITY_CHANCE: f64 = 0.15;

/// Weekly base chance of an interaction per faction pair.
const WEEKLY_INTERACTION_CHANCE: f64 = 0.1;

/// Political opportunity types, rolled uniformly.
const OPPORTUNITY_KINDS: [&str; 9] = [
    "alliance_proposal",
    "trade_agreement",
    "succession_crisis",
    "scandal",
    "assassination_plot",
    "popular_unrest",
    "foreign_envoy",
    "religious_schism",
    "border_dispute",
];

/// Interactions by relationship band.
const HOSTILE_INTERACTIONS: [&str; 3] =
    ["border skirmish", "act of sabotage", "public ultimatum"];
const FRIENDLY_INTERACTIONS: [&str; 3] =
    ["joint venture", "alliance overture", "exchange of gifts"];
const NEUTRAL_INTERACTIONS: [&str; 3] =
    ["cautious negotiation", "trade talks", "exchange of envoys"];

/// Run the political sub-simulation.
pub(crate) async fn run(
    sim: &WorldSimulator,
    ctx: &CancellationToken,
    window: &StepWindow,
    rng: &mut SmallRng,
    events: &mut Vec<WorldEvent>,
) -> Result<serde_json::Value, SimError> {
    let factions = sim.deps.factions.list_by_session(window.session).await?;

    let mut milestones: u32 = 0;
    let mut agendas_closed: u32 = 0;
    let mut opportunities: u32 = 0;
    let mut interactions: u32 = 0;

    for faction in &factions {
        let traits = match sim.deps.personalities.get(faction.id).await {
            Ok(personality) => personality.traits,
            Err(e) if e.is_not_found() => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        let aggressive = traits.get("aggressive").copied().unwrap_or(0.0);
        let diplomatic = traits.get("diplomatic").copied().unwrap_or(0.0);
        let rate = chance(
            WEEKLY_AGENDA_RATE
                * window.weeks()
                * (1.0 + 0.5 * aggressive)
                * (1.0 + 0.3 * diplomatic),
        );

        for mut agenda in sim.deps.agendas.list_by_faction(faction.id).await? {
            if agenda.status != AgendaStatus::Active {
                continue;
            }
            let Some(index) = agenda.next_stage() else {
                continue;
            };
            if !rng.random_bool(rate) {
                continue;
            }
            let stage_name = agenda
                .stages
                .get_mut(index)
                .map(|stage| {
                    stage.complete = true;
                    stage.completed_at = Some(window.now);
                    stage.name.clone()
                })
                .unwrap_or_default();
            agenda.recompute_progress();
            if agenda.progress >= 1.0 {
                agenda.status = AgendaStatus::Completed;
                agendas_closed = agendas_closed.saturating_add(1);
            }
            sim.deps.agendas.update(&agenda).await?;

            events.push(WorldEvent {
                id: WorldEventId::new(),
                session: window.session,
                event_type: String::from("political_milestone"),
                title: format!("{} advances its designs", faction.name),
                description: format!(
                    "{} completed \"{stage_name}\" in its plan to {}.",
                    faction.name,
                    agenda.title.to_lowercase()
                ),
                impact: BTreeMap::from([(String::from("political"), agenda.progress)]),
                affected_entities: vec![faction.name.clone()],
                player_visible: false,
                occurred_at: window.now,
                consequences: Vec::new(),
            });
            milestones = milestones.saturating_add(1);
        }

        if rng.random_bool(chance(WEEKLY_OPPORTUNITY_CHANCE * window.weeks())) {
            events.push(opportunity_event(window, faction, rng));
            opportunities = opportunities.saturating_add(1);
        }
    }

    // Pairwise interactions work on fresh reads so earlier shifts in the
    // same step are observed.
    let ids: Vec<FactionId> = factions.iter().map(|f| f.id).collect();
    for (position, &first) in ids.iter().enumerate() {
        for &second in ids.iter().skip(position.saturating_add(1)) {
            if interact_pair(sim, ctx, window, rng, events, first, second).await? {
                interactions = interactions.saturating_add(1);
            }
        }
    }

    Ok(json!({
        "factions": factions.len(),
        "milestones": milestones,
        "agendas_closed": agendas_closed,
        "opportunities": opportunities,
        "interactions": interactions,
    }))
}

/// Roll, narrate, and apply one faction-pair interaction.
///
/// Returns whether an interaction event was emitted.
async fn interact_pair(
    sim: &WorldSimulator,
    ctx: &CancellationToken,
    window: &StepWindow,
    rng: &mut SmallRng,
    events: &mut Vec<WorldEvent>,
    first: FactionId,
    second: FactionId,
) -> Result<bool, SimError> {
    let mut a = sim.deps.factions.get(first).await?;
    let mut b = sim.deps.factions.get(second).await?;
    let standing = a.relation_with(second).standing;

    let mut probability = WEEKLY_INTERACTION_CHANCE * window.weeks();
    if standing < -50 {
        probability *= 2.0;
    } else if standing > 50 {
        probability *= 1.5;
    }
    if !rng.random_bool(chance(probability)) {
        return Ok(false);
    }

    let (pool, delta) = if standing < -25 {
        (&HOSTILE_INTERACTIONS, rng.random_range(-15..=-5))
    } else if standing > 25 {
        (&FRIENDLY_INTERACTIONS, rng.random_range(5..=15))
    } else {
        (&NEUTRAL_INTERACTIONS, rng.random_range(-5..=5))
    };
    let interaction = pool
        .get(rng.random_range(0..pool.len()))
        .copied()
        .unwrap_or("cautious negotiation");

    // Narration is part of the event's meaning here; without it there is
    // nothing to record.
    let Some(narration) = narrate_interaction(sim, ctx, &a, &b, interaction).await else {
        return Ok(false);
    };

    shift_relation(&mut a, second, delta);
    shift_relation(&mut b, first, delta);
    sim.deps.factions.update(&a).await?;
    sim.deps.factions.update(&b).await?;

    let resulting = a.relation_with(second).standing;
    sim.deps.bus.publish(Arc::new(FactionRelationChanged {
        session: window.session,
        faction: first,
        other: second,
        delta,
        standing: resulting,
        at: window.now,
    }));

    events.push(WorldEvent {
        id: WorldEventId::new(),
        session: window.session,
        event_type: String::from("faction_interaction"),
        title: format!("{} between {} and {}", capitalize(interaction), a.name, b.name),
        description: narration,
        impact: BTreeMap::from([(String::from("political"), f64::from(delta) / 100.0)]),
        affected_entities: vec![a.name.clone(), b.name.clone()],
        player_visible: true,
        occurred_at: window.now,
        consequences: vec![EventConsequence {
            kind: String::from("relationship"),
            target: b.name.clone(),
            effect: format!("standing with {} shifts by {delta}", a.name),
            magnitude: f64::from(delta),
            duration_days: None,
            params: BTreeMap::new(),
        }],
    });
    Ok(true)
}

/// Apply a standing shift towards `other`, creating the relation if new.
fn shift_relation(faction: &mut Faction, other: FactionId, delta: i32) {
    faction
        .relationships
        .entry(other)
        .or_insert_with(FactionRelation::neutral)
        .shift(delta);
}

/// Roll one political opportunity for a faction.
fn opportunity_event(window: &StepWindow, faction: &Faction, rng: &mut SmallRng) -> WorldEvent {
    let kind = OPPORTUNITY_KINDS
        .get(rng.random_range(0..OPPORTUNITY_KINDS.len()))
        .copied()
        .unwrap_or("trade_agreement");
    let deadline_days = rng.random_range(7..=21);

    WorldEvent {
        id: WorldEventId::new(),
        session: window.session,
        event_type: String::from("political_opportunity"),
        title: format!("{} weighs a {}", faction.name, kind.replace('_', " ")),
        description: format!(
            "A {} has opened before {}; it will not stay open long.",
            kind.replace('_', " "),
            faction.name
        ),
        impact: BTreeMap::new(),
        affected_entities: vec![faction.name.clone()],
        player_visible: false,
        occurred_at: window.now,
        consequences: vec![EventConsequence {
            kind: String::from("deadline"),
            target: faction.name.clone(),
            effect: format!("respond to the {}", kind.replace('_', " ")),
            magnitude: 0.0,
            duration_days: Some(deadline_days),
            params: BTreeMap::new(),
        }],
    }
}

/// Ask the LLM to narrate an interaction; `None` when unavailable.
async fn narrate_interaction(
    sim: &WorldSimulator,
    ctx: &CancellationToken,
    a: &Faction,
    b: &Faction,
    interaction: &str,
) -> Option<String> {
    let system = "You chronicle the politics of a fantasy world in one short \
                  paragraph. Respond with the narration text only, no JSON.";
    let user = format!(
        "Narrate a {interaction} between {a_name} ({a_kind:?}) and {b_name} ({b_kind:?}).",
        a_name = a.name,
        a_kind = a.kind,
        b_name = b.name,
        b_kind = b.kind,
    );
    match sim.deps.llm.generate_completion(ctx, &user, system).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        _ => None,
    }
}

/// Uppercase the first letter of a phrase.
fn capitalize(phrase: &str) -> String {
    let mut chars = phrase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};
    use rand::SeedableRng;

    use loreforge_db::{AgendaRepo, FactionRepo, MemoryBackend, PersonalityRepo};
    use loreforge_events::EventBus;
    use loreforge_llm::{LlmClient, MockClient};
    use loreforge_types::{
        AgendaId, AgendaStage, Clock, FactionAgenda, FactionKind, FactionMood,
        FactionPersonality, FixedClock, LearningData, SessionId,
    };

    use crate::progress::SimDeps;

    use super::*;

    fn instant() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap_or_default()
    }

    fn simulator(backend: &MemoryBackend, llm: LlmClient, seed: u64) -> WorldSimulator {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(instant()));
        let deps = SimDeps::with_backend(
            backend,
            Arc::new(llm),
            Arc::new(EventBus::new()),
            clock,
        );
        WorldSimulator::with_seed(deps, seed)
    }

    fn faction(session: SessionId, name: &str) -> Faction {
        Faction {
            id: FactionId::new(),
            session,
            name: String::from(name),
            kind: FactionKind::Political,
            description: String::new(),
            public_goals: Vec::new(),
            secret_goals: Vec::new(),
            traits: BTreeMap::new(),
            values: BTreeMap::new(),
            influence: 5,
            military_strength: 5,
            economic_power: 5,
            magical_power: 2,
            member_count: 100,
            relationships: BTreeMap::new(),
        }
    }

    fn spirited_personality(faction: FactionId) -> FactionPersonality {
        FactionPersonality {
            faction,
            traits: BTreeMap::from([
                (String::from("aggressive"), 1.0),
                (String::from("diplomatic"), 1.0),
            ]),
            values: BTreeMap::new(),
            decision_weights: BTreeMap::new(),
            mood: FactionMood::Confident,
            decision_style: String::from("bold"),
            memories: Vec::new(),
            learning: LearningData::default(),
            last_learning: None,
        }
    }

    fn agenda_with_stages(faction: FactionId, stages: usize) -> FactionAgenda {
        FactionAgenda {
            id: AgendaId::new(),
            faction,
            title: String::from("Seize the harbor"),
            stages: (0..stages)
                .map(|i| AgendaStage {
                    name: format!("stage {i}"),
                    description: String::new(),
                    complete: false,
                    completed_at: None,
                })
                .collect(),
            progress: 0.0,
            status: AgendaStatus::Active,
        }
    }

    fn window(session: SessionId, days: i64) -> StepWindow {
        StepWindow {
            session,
            now: instant(),
            delta: TimeDelta::days(days),
        }
    }

    #[tokio::test]
    async fn spirited_factions_always_advance_over_long_gaps() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let f = faction(session, "The Harbor League");
        FactionRepo::create(&backend, &f).await.ok();
        PersonalityRepo::upsert(&backend, &spirited_personality(f.id))
            .await
            .ok();
        let agenda = agenda_with_stages(f.id, 1);
        AgendaRepo::create(&backend, &agenda).await.ok();

        let sim = simulator(&backend, LlmClient::Mock(MockClient::returning("{}")), 1);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
        // Eleven weeks: 0.05 * 11 * 1.5 * 1.3 > 1, so the roll is certain.
        run(
            &sim,
            &CancellationToken::new(),
            &window(session, 77),
            &mut rng,
            &mut events,
        )
        .await
        .ok();

        assert!(events.iter().any(|e| e.event_type == "political_milestone"));
        let stored = AgendaRepo::list_by_faction(&backend, f.id)
            .await
            .unwrap_or_default();
        let stored = stored.first().cloned();
        assert_eq!(stored.as_ref().map(|a| a.status), Some(AgendaStatus::Completed));
        assert!(stored.is_some_and(|a| (a.progress - 1.0).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn only_the_first_incomplete_stage_advances() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let f = faction(session, "The Quill Court");
        FactionRepo::create(&backend, &f).await.ok();
        PersonalityRepo::upsert(&backend, &spirited_personality(f.id))
            .await
            .ok();
        AgendaRepo::create(&backend, &agenda_with_stages(f.id, 3))
            .await
            .ok();

        let sim = simulator(&backend, LlmClient::Mock(MockClient::returning("{}")), 2);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(2);
        run(
            &sim,
            &CancellationToken::new(),
            &window(session, 77),
            &mut rng,
            &mut events,
        )
        .await
        .ok();

        let stored = AgendaRepo::list_by_faction(&backend, f.id)
            .await
            .unwrap_or_default();
        let Some(agenda) = stored.first() else { return };
        let completed: Vec<bool> = agenda.stages.iter().map(|s| s.complete).collect();
        assert_eq!(completed, vec![true, false, false]);
        assert!((agenda.progress - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(agenda.status, AgendaStatus::Active);
    }

    #[tokio::test]
    async fn opportunities_carry_a_deadline() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let f = faction(session, "The Salt Senate");
        FactionRepo::create(&backend, &f).await.ok();

        let sim = simulator(&backend, LlmClient::Mock(MockClient::returning("{}")), 3);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(3);
        // Seven weeks: 0.15 * 7 > 1.
        run(
            &sim,
            &CancellationToken::new(),
            &window(session, 49),
            &mut rng,
            &mut events,
        )
        .await
        .ok();

        let opportunity = events
            .iter()
            .find(|e| e.event_type == "political_opportunity");
        assert!(opportunity.is_some());
        let deadline = opportunity
            .and_then(|e| e.consequences.first())
            .and_then(|c| c.duration_days);
        assert!(deadline.is_some_and(|d| (7..=21).contains(&d)));
    }

    #[tokio::test]
    async fn interactions_shift_both_sides_permanently() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let a = faction(session, "The Harbor League");
        let b = faction(session, "The Quill Court");
        FactionRepo::create(&backend, &a).await.ok();
        FactionRepo::create(&backend, &b).await.ok();

        let sim = simulator(
            &backend,
            LlmClient::Mock(MockClient::returning("Envoys met beneath the old lighthouse.")),
            4,
        );
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(4);
        // Eleven weeks: 0.1 * 11 > 1, interaction certain.
        run(
            &sim,
            &CancellationToken::new(),
            &window(session, 77),
            &mut rng,
            &mut events,
        )
        .await
        .ok();

        let interaction = events.iter().find(|e| e.event_type == "faction_interaction");
        assert!(interaction.is_some());
        assert!(interaction.is_some_and(|e| e.description.contains("lighthouse")));
        // Permanent consequence: no duration.
        assert_eq!(
            interaction.and_then(|e| e.consequences.first()).and_then(|c| c.duration_days),
            None
        );

        let stored_a = FactionRepo::get(&backend, a.id).await.ok();
        let stored_b = FactionRepo::get(&backend, b.id).await.ok();
        let ab = stored_a.map(|f| f.relation_with(b.id).standing).unwrap_or(0);
        let ba = stored_b.map(|f| f.relation_with(a.id).standing).unwrap_or(0);
        // Neutral band shifts stay within [-5, 5] and mirror each other.
        assert_eq!(ab, ba);
        assert!((-5..=5).contains(&ab));
    }

    #[tokio::test]
    async fn no_narration_means_no_interaction_event() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let a = faction(session, "The Harbor League");
        let b = faction(session, "The Quill Court");
        FactionRepo::create(&backend, &a).await.ok();
        FactionRepo::create(&backend, &b).await.ok();

        let sim = simulator(&backend, LlmClient::Mock(MockClient::failing("offline")), 5);
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(5);
        run(
            &sim,
            &CancellationToken::new(),
            &window(session, 77),
            &mut rng,
            &mut events,
        )
        .await
        .ok();

        assert!(events.iter().all(|e| e.event_type != "faction_interaction"));
        // Standings were left untouched.
        let stored_a = FactionRepo::get(&backend, a.id).await.ok();
        assert_eq!(stored_a.map(|f| f.relation_with(b.id).standing), Some(0));
    }

    #[tokio::test]
    async fn hostile_pairs_trade_blows() {
        let backend = MemoryBackend::new();
        let session = SessionId::new();
        let mut a = faction(session, "The Ashen Pact");
        let b = faction(session, "The Quill Court");
        a.relationships.insert(
            b.id,
            FactionRelation {
                standing: -60,
                kind: loreforge_types::RelationKind::Enemy,
            },
        );
        FactionRepo::create(&backend, &a).await.ok();
        FactionRepo::create(&backend, &b).await.ok();

        let sim = simulator(
            &backend,
            LlmClient::Mock(MockClient::returning("Torches in the night; a granary burns.")),
            6,
        );
        let mut events = Vec::new();
        let mut rng = rand::rngs::SmallRng::seed_from_u64(6);
        run(
            &sim,
            &CancellationToken::new(),
            &window(session, 77),
            &mut rng,
            &mut events,
        )
        .await
        .ok();

        let stored_a = FactionRepo::get(&backend, a.id).await.ok();
        let standing = stored_a.map(|f| f.relation_with(b.id).standing).unwrap_or(0);
        // Hostile deltas are -15..=-5 off the starting -60.
        assert!((-75..=-65).contains(&standing));

        let interaction = events.iter().find(|e| e.event_type == "faction_interaction");
        let title = interaction.map(|e| e.title.clone()).unwrap_or_default();
        assert!(
            HOSTILE_INTERACTIONS
                .iter()
                .any(|kind| title.to_lowercase().contains(kind)),
            "title {title} not from the hostile pool"
        );
    }
}
