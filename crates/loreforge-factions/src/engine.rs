//! The personality engine: initialization, memory, decisions, mood,
//! and learning.
//!
//! Every LLM-assisted operation here degrades gracefully: mood and
//! decision style fall back to fixed defaults, and decisions fall back
//! to the deterministic top-scored option. Only repository failures and
//! caller cancellation surface as errors.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::TimeDelta;
use rand::Rng;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use loreforge_db::PersonalityRepo;
use loreforge_llm::{LlmClient, LlmError, decode_response};
use loreforge_types::{
    Clock, Faction, FactionId, FactionMemory, FactionMood, FactionPersonality,
    InteractionOutcome, LearningData, MEMORY_CAP, PlayerInteraction,
};

use crate::decision::{
    DecisionOutcome, FactionDecision, best_option, relevant_memories, score_options,
};
use crate::error::FactionError;
use crate::profile::{derive_weights, sample_traits, sample_values};

/// Decay applied to ordinary recorded memories.
const MEMORY_DECAY: f64 = 0.95;

/// Impact and decay of the memory appended after each decision.
const DECISION_MEMORY_IMPACT: f64 = 0.5;
const DECISION_MEMORY_DECAY: f64 = 0.9;

/// How far back memories count towards the current mood.
const MOOD_WINDOW_DAYS: i64 = 30;

/// Number of most-recent and highest-impact memories kept when pruning.
const PRUNE_KEEP_RECENT: usize = 50;
const PRUNE_KEEP_IMPACTFUL: usize = 50;

/// Cap on recorded player interactions.
const INTERACTION_CAP: usize = 50;

/// Trait adjustment applied when a positive interaction teaches the
/// faction that an approach works.
const LEARNING_STEP: f64 = 0.02;

/// Counter-adjustment applied to aggression by successful diplomacy.
const UNLEARNING_STEP: f64 = 0.01;

/// An event worth remembering, as seen by one faction.
#[derive(Debug, Clone)]
pub struct RememberedEvent {
    /// Event type tag (drives the base impact).
    pub event_type: String,
    /// Short account of what happened.
    pub description: String,
    /// Factions involved.
    pub participants: Vec<FactionId>,
}

/// Mood and decision style as the LLM describes them.
#[derive(Debug, Deserialize)]
struct TemperamentDto {
    #[serde(default)]
    mood: String,
    #[serde(default)]
    decision_style: String,
}

/// The LLM's pick for a decision.
#[derive(Debug, Deserialize)]
struct ChoiceDto {
    #[serde(default)]
    choice: String,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Faction personality engine.
///
/// Holds the LLM gateway for flavor judgments, the personality
/// repository for persistence, and the clock for decay math.
pub struct PersonalityEngine {
    llm: Arc<LlmClient>,
    personalities: Arc<dyn PersonalityRepo>,
    clock: Arc<dyn Clock>,
}

impl PersonalityEngine {
    /// Create an engine over the given collaborators.
    pub fn new(
        llm: Arc<LlmClient>,
        personalities: Arc<dyn PersonalityRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            llm,
            personalities,
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// Initialize and persist the personality of a freshly created
    /// faction.
    ///
    /// Traits and values are sampled (adjusted by faction kind), decision
    /// weights derived and normalized, and the LLM asked for an opening
    /// mood and decision style. On LLM failure the personality starts
    /// cautious and measured.
    pub async fn init_personality(
        &self,
        ctx: &CancellationToken,
        faction: &Faction,
        rng: &mut (impl Rng + Send),
    ) -> Result<FactionPersonality, FactionError> {
        let traits = sample_traits(rng, faction.kind);
        let values = sample_values(rng);
        let decision_weights = derive_weights(&traits, &values);

        let (mood, decision_style) = match self.ask_temperament(ctx, faction).await {
            Ok(pair) => pair,
            Err(LlmError::Cancelled) => return Err(FactionError::Cancelled),
            Err(e) => {
                warn!(faction = %faction.id, error = %e, "temperament generation failed, using defaults");
                (FactionMood::Cautious, String::from("measured"))
            }
        };

        let personality = FactionPersonality {
            faction: faction.id,
            traits,
            values,
            decision_weights,
            mood,
            decision_style,
            memories: Vec::new(),
            learning: LearningData::default(),
            last_learning: None,
        };

        self.personalities.upsert(&personality).await?;
        debug!(faction = %faction.id, mood = ?personality.mood, "personality initialized");
        Ok(personality)
    }

    /// Ask the LLM for an opening mood and decision style.
    async fn ask_temperament(
        &self,
        ctx: &CancellationToken,
        faction: &Faction,
    ) -> Result<(FactionMood, String), LlmError> {
        let system = "You define the temperament of organizations in a fantasy world. \
                      Respond with JSON only: {\"mood\": \"triumphant|confident|cautious|worried|desperate\", \
                      \"decision_style\": \"<one or two words>\"}";
        let user = format!(
            "Faction: {name}\nKind: {kind:?}\nGoals: {goals}\nDescribe its current temperament.",
            name = faction.name,
            kind = faction.kind,
            goals = faction.public_goals.join("; "),
        );
        let text = self.llm.generate_completion(ctx, &user, system).await?;
        let dto: TemperamentDto = match decode_response(&text) {
            Ok(dto) => dto,
            Err(_) => TemperamentDto {
                mood: String::new(),
                decision_style: String::new(),
            },
        };
        let mood = parse_mood(&dto.mood).unwrap_or(FactionMood::Cautious);
        let style = if dto.decision_style.is_empty() {
            String::from("measured")
        } else {
            dto.decision_style
        };
        Ok((mood, style))
    }

    // -----------------------------------------------------------------------
    // Memory
    // -----------------------------------------------------------------------

    /// Record an event on a faction's memory, pruning when over the cap.
    ///
    /// The impact starts from the event-type table and is amplified by
    /// how much the faction values wealth and power, clamped to
    /// `[-1, 1]`.
    pub async fn record_memory(
        &self,
        faction: FactionId,
        event: &RememberedEvent,
    ) -> Result<FactionMemory, FactionError> {
        let mut personality = self.personalities.get(faction).await?;
        let now = self.clock.now();

        let wealth = personality.values.get("wealth").copied().unwrap_or(0.0);
        let power = personality.values.get("power").copied().unwrap_or(0.0);
        let impact = (event_impact_base(&event.event_type) + 0.2 * wealth + 0.2 * power)
            .clamp(-1.0, 1.0);

        let memory = FactionMemory::new(
            event.event_type.clone(),
            event.description.clone(),
            impact,
            MEMORY_DECAY,
            event.participants.clone(),
            now,
        );
        personality.memories.push(memory.clone());
        prune_memories(&mut personality.memories);

        self.personalities.upsert(&personality).await?;
        Ok(memory)
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    /// Put a decision before a faction and return its choice.
    ///
    /// The deterministic option scores and the relevant memories are
    /// offered to the LLM; on any LLM or parse failure the top-scored
    /// option wins. A `strategic_decision` memory of the choice is
    /// appended either way.
    pub async fn decide(
        &self,
        ctx: &CancellationToken,
        faction: FactionId,
        decision: &FactionDecision,
    ) -> Result<DecisionOutcome, FactionError> {
        if decision.options.is_empty() {
            return Err(FactionError::NoOptions);
        }

        let mut personality = self.personalities.get(faction).await?;
        let now = self.clock.now();
        let scores = score_options(&personality, decision);
        let memories = relevant_memories(&personality, decision, now);

        let llm_pick = match self.ask_choice(ctx, &personality, decision, &memories).await {
            Ok(pick) => pick,
            Err(LlmError::Cancelled) => return Err(FactionError::Cancelled),
            Err(e) => {
                debug!(faction = %faction, error = %e, "LLM choice failed, falling back to scores");
                None
            }
        };

        let (choice, reasoning) = match llm_pick {
            Some((name, reasoning)) => (name, reasoning),
            None => {
                let fallback = best_option(&personality, decision)
                    .map(|option| option.name.clone())
                    .unwrap_or_default();
                (fallback, None)
            }
        };

        let memory = FactionMemory::new(
            "strategic_decision",
            format!("Chose \"{choice}\" when deciding: {}", decision.description),
            DECISION_MEMORY_IMPACT,
            DECISION_MEMORY_DECAY,
            decision.subject.into_iter().collect(),
            now,
        );
        personality.memories.push(memory);
        prune_memories(&mut personality.memories);
        self.personalities.upsert(&personality).await?;

        Ok(DecisionOutcome {
            choice,
            reasoning,
            scores,
        })
    }

    /// Ask the LLM to pick an option; `None` when the pick is unusable.
    async fn ask_choice(
        &self,
        ctx: &CancellationToken,
        personality: &FactionPersonality,
        decision: &FactionDecision,
        memories: &[&FactionMemory],
    ) -> Result<Option<(String, Option<String>)>, LlmError> {
        let system = "You decide for a faction in a fantasy world, in line with its temperament. \
                      Respond with JSON only: {\"choice\": \"<option name>\", \"reasoning\": \"<one sentence>\"}";

        let mut user = format!(
            "Decision ({kind}): {description}\nMood: {mood:?}, style: {style}\n\nOptions:\n",
            kind = decision.decision_type,
            description = decision.description,
            mood = personality.mood,
            style = personality.decision_style,
        );
        for option in &decision.options {
            user.push_str(&format!(
                "- {name}: {desc} (benefits: {benefits}; risks: {risks})\n",
                name = option.name,
                desc = option.description,
                benefits = option.benefits.join(", "),
                risks = option.risks.join(", "),
            ));
        }
        if !memories.is_empty() {
            user.push_str("\nRelevant memories:\n");
            for memory in memories {
                user.push_str(&format!("- {}\n", memory.description));
            }
        }

        let text = self.llm.generate_completion(ctx, &user, system).await?;
        let Ok(dto) = decode_response::<ChoiceDto>(&text) else {
            return Ok(None);
        };
        let matched = decision
            .options
            .iter()
            .find(|option| option.name.eq_ignore_ascii_case(dto.choice.trim()));
        Ok(matched.map(|option| (option.name.clone(), dto.reasoning)))
    }

    // -----------------------------------------------------------------------
    // Mood
    // -----------------------------------------------------------------------

    /// Recompute a faction's mood from its recent memories and persist it.
    pub async fn update_mood(&self, faction: FactionId) -> Result<FactionMood, FactionError> {
        let mut personality = self.personalities.get(faction).await?;
        let mood = mood_from_memories(&personality.memories, self.clock.now());
        personality.mood = mood;
        self.personalities.upsert(&personality).await?;
        Ok(mood)
    }

    // -----------------------------------------------------------------------
    // Learning
    // -----------------------------------------------------------------------

    /// Fold one player interaction into the faction's learning state.
    ///
    /// Positive outcomes nudge the trait aligned with the interaction
    /// kind upward (successful diplomacy also files down aggression);
    /// negative and neutral outcomes are recorded without trait change.
    pub async fn learn_from_interaction(
        &self,
        faction: FactionId,
        kind: &str,
        outcome: InteractionOutcome,
    ) -> Result<(), FactionError> {
        let mut personality = self.personalities.get(faction).await?;
        let now = self.clock.now();

        personality.learning.player_interactions.push(PlayerInteraction {
            kind: kind.to_owned(),
            outcome,
            at: now,
        });
        let overflow = personality
            .learning
            .player_interactions
            .len()
            .saturating_sub(INTERACTION_CAP);
        if overflow > 0 {
            personality.learning.player_interactions.drain(..overflow);
        }

        if outcome == InteractionOutcome::Positive {
            match kind {
                "diplomatic" => {
                    bump_trait(&mut personality, "diplomatic", LEARNING_STEP);
                    bump_trait(&mut personality, "aggressive", -UNLEARNING_STEP);
                }
                "trade" => bump_trait(&mut personality, "mercantile", LEARNING_STEP),
                "military" => bump_trait(&mut personality, "militaristic", LEARNING_STEP),
                _ => {}
            }
        }

        personality.last_learning = Some(now);
        self.personalities.upsert(&personality).await?;
        Ok(())
    }
}

/// Base memory impact per event type.
fn event_impact_base(event_type: &str) -> f64 {
    match event_type {
        "faction_interaction" => 0.5,
        "military_conflict" => 0.8,
        "player_action" => 0.9,
        _ => 0.3,
    }
}

/// Adjust a trait by a signed step, clamped to `[0, 1]`.
fn bump_trait(personality: &mut FactionPersonality, name: &str, step: f64) {
    let entry = personality.traits.entry(name.to_owned()).or_insert(0.0);
    *entry = (*entry + step).clamp(0.0, 1.0);
}

/// Parse a mood label from LLM output.
fn parse_mood(label: &str) -> Option<FactionMood> {
    match label.trim().to_ascii_lowercase().as_str() {
        "triumphant" => Some(FactionMood::Triumphant),
        "confident" => Some(FactionMood::Confident),
        "cautious" => Some(FactionMood::Cautious),
        "worried" => Some(FactionMood::Worried),
        "desperate" => Some(FactionMood::Desperate),
        _ => None,
    }
}

/// Derive the mood from the mean effective impact of memories within the
/// last 30 days. No recent memories reads as cautious.
pub fn mood_from_memories(
    memories: &[FactionMemory],
    now: chrono::DateTime<chrono::Utc>,
) -> FactionMood {
    let window_start = now - TimeDelta::days(MOOD_WINDOW_DAYS);
    let recent: Vec<f64> = memories
        .iter()
        .filter(|memory| memory.occurred_at >= window_start)
        .map(|memory| memory.effective_impact(now))
        .collect();

    if recent.is_empty() {
        return FactionMood::Cautious;
    }
    let avg = recent.iter().sum::<f64>() / recent.len() as f64;

    if avg > 0.5 {
        FactionMood::Triumphant
    } else if avg > 0.2 {
        FactionMood::Confident
    } else if avg > -0.2 {
        FactionMood::Cautious
    } else if avg > -0.5 {
        FactionMood::Worried
    } else {
        FactionMood::Desperate
    }
}

/// Prune an over-cap memory list to the union of the most recent and the
/// highest-|impact| entries, preserving chronological order.
pub fn prune_memories(memories: &mut Vec<FactionMemory>) {
    if memories.len() <= MEMORY_CAP {
        return;
    }

    let mut keep = BTreeSet::new();

    let mut by_recency: Vec<&FactionMemory> = memories.iter().collect();
    by_recency.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    for memory in by_recency.iter().take(PRUNE_KEEP_RECENT) {
        keep.insert(memory.id);
    }

    let mut by_impact: Vec<&FactionMemory> = memories.iter().collect();
    by_impact.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    for memory in by_impact.iter().take(PRUNE_KEEP_IMPACTFUL) {
        keep.insert(memory.id);
    }

    memories.retain(|memory| keep.contains(&memory.id));
}
