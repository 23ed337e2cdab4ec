//! Core entity structs for the Loreforge game backend.
//!
//! Everything here is a plain value type: serializable, cloneable, and
//! free of behavior beyond small invariant-preserving helpers. References
//! between entities are identifier-based (no ownership cycles); the
//! repositories in `loreforge-db` resolve them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{
    AgendaStatus, FactionKind, FactionMood, GoalKind, GoalStatus, InteractionOutcome,
    NpcAttitude, RelationKind, SessionStatus, TimeOfDay,
};
use crate::ids::{
    AgendaId, CharacterId, CultureId, FactionId, GoalId, MemoryId, NpcId, RefreshTokenId,
    SessionId, SettlementId, SimulationLogId, UserId, WorldEventId,
};

/// Effective impact below which a faction memory no longer influences
/// decisions or mood.
pub const MEMORY_RELEVANCE_FLOOR: f64 = 0.1;

/// Hard cap on the number of memories a faction personality retains.
pub const MEMORY_CAP: usize = 100;

// ---------------------------------------------------------------------------
// Sessions and participation
// ---------------------------------------------------------------------------

/// A gameplay context owned by one referee.
///
/// The referee is always a participant; the participant count excluding
/// the referee never exceeds `max_players - 1`. The join code is unique
/// among non-completed sessions (enforced by the session repository).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Human-readable session name.
    pub name: String,
    /// Six-character join code over `A-Z0-9`.
    pub code: String,
    /// The user refereeing this session.
    pub referee: UserId,
    /// Lifecycle status (monotonic).
    pub status: SessionStatus,
    /// Whether the session currently accepts joins while active. The
    /// referee can lower this to lock the table mid-play.
    pub is_active: bool,
    /// Whether the session is listed publicly.
    pub is_public: bool,
    /// Whether joining requires an invite (the inverse of `is_public`
    /// at creation time).
    pub requires_invite: bool,
    /// Total seats including the referee, in `2..=10`.
    pub max_players: u32,
    /// Optional cap on the level of characters brought into the session.
    pub max_character_level: Option<u32>,
    /// Opaque per-session state owned by the play layer.
    #[serde(default)]
    pub state: BTreeMap<String, serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Number of seats available to non-referee players.
    pub const fn player_capacity(&self) -> u32 {
        self.max_players.saturating_sub(1)
    }
}

/// A user's attachment to a session, optionally bound to a character.
///
/// The `(user, session)` pair is unique; the referee's participant row
/// exists for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// The attached user.
    pub user: UserId,
    /// The session joined.
    pub session: SessionId,
    /// Character the user is playing, if any.
    pub character: Option<CharacterId>,
    /// Live presence flag.
    pub is_online: bool,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
}

/// The six ability scores of a character or NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    /// Strength score.
    pub strength: i32,
    /// Dexterity score.
    pub dexterity: i32,
    /// Constitution score.
    pub constitution: i32,
    /// Intelligence score.
    pub intelligence: i32,
    /// Wisdom score.
    pub wisdom: i32,
    /// Charisma score.
    pub charisma: i32,
}

impl AbilityScores {
    /// A flat array of tens, the baseline commoner.
    pub const fn all_tens() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }

    /// The standard ability modifier: `floor((score - 10) / 2)`.
    pub const fn modifier(score: i32) -> i32 {
        (score - 10).div_euclid(2)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::all_tens()
    }
}

/// A stored refresh-token record backing access-token renewal.
///
/// Only the hash of the credential lands here; issuing and verifying
/// the JWTs built on top is the auth collaborator's concern. The core
/// stores, looks up, and revokes these rows, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Unique record identifier.
    pub id: RefreshTokenId,
    /// The user the token was issued to.
    pub user: UserId,
    /// Hash of the opaque token string.
    pub token_hash: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops being exchangeable.
    pub expires_at: DateTime<Utc>,
    /// Whether the token was revoked before expiry.
    pub revoked: bool,
}

impl RefreshToken {
    /// Whether the token can still be exchanged at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// A player character. Opaque to the core beyond ownership and level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique character identifier.
    pub id: CharacterId,
    /// The owning user.
    pub owner: UserId,
    /// Character name.
    pub name: String,
    /// Character level (1-based).
    pub level: u32,
    /// Ability scores.
    pub abilities: AbilityScores,
    /// Proficiency labels (skills, tools, saves).
    #[serde(default)]
    pub proficiencies: Vec<String>,
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// One faction's view of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRelation {
    /// Numeric standing in `[-100, 100]`.
    pub standing: i32,
    /// Diplomatic stance derived from (or overriding) the standing.
    pub kind: RelationKind,
}

impl FactionRelation {
    /// A fresh relation: standing 0, neutral stance.
    pub const fn neutral() -> Self {
        Self {
            standing: 0,
            kind: RelationKind::Neutral,
        }
    }

    /// Apply a signed standing change, clamping to `[-100, 100]` and
    /// re-deriving the stance.
    pub fn shift(&mut self, delta: i32) {
        self.standing = self.standing.saturating_add(delta).clamp(-100, 100);
        self.kind = RelationKind::from_standing(self.standing);
    }
}

/// A named organization within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    /// Unique faction identifier.
    pub id: FactionId,
    /// Owning session.
    pub session: SessionId,
    /// Faction name.
    pub name: String,
    /// Broad classification.
    pub kind: FactionKind,
    /// Public-facing description.
    pub description: String,
    /// Goals the faction openly pursues.
    #[serde(default)]
    pub public_goals: Vec<String>,
    /// Goals the faction hides.
    #[serde(default)]
    pub secret_goals: Vec<String>,
    /// Named traits, each in `[0, 1]`.
    #[serde(default)]
    pub traits: BTreeMap<String, f64>,
    /// Named values, each in `[0, 1]`.
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
    /// Political reach, `1..=10`.
    pub influence: u8,
    /// Military strength, `1..=10`.
    pub military_strength: u8,
    /// Economic power, `1..=10`.
    pub economic_power: u8,
    /// Magical power, `1..=10`.
    pub magical_power: u8,
    /// Approximate number of members.
    pub member_count: u32,
    /// Standing towards other factions in the same session.
    #[serde(default)]
    pub relationships: BTreeMap<FactionId, FactionRelation>,
}

impl Faction {
    /// Standing towards `other`, defaulting to neutral when unrecorded.
    pub fn relation_with(&self, other: FactionId) -> FactionRelation {
        self.relationships
            .get(&other)
            .copied()
            .unwrap_or_else(FactionRelation::neutral)
    }
}

/// A past event recorded on a faction, with exponential decay.
///
/// The effective impact at age `d` days is `impact * decay^d`; once the
/// absolute effective impact drops below [`MEMORY_RELEVANCE_FLOOR`] the
/// memory no longer matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionMemory {
    /// Unique memory identifier.
    pub id: MemoryId,
    /// Type tag of the remembered event (e.g. `military_conflict`).
    pub event_type: String,
    /// Short human-readable account.
    pub description: String,
    /// Initial emotional impact in `[-1, 1]`.
    pub impact: f64,
    /// Per-day decay factor in `(0, 1]`.
    pub decay: f64,
    /// Factions involved in the remembered event.
    #[serde(default)]
    pub participants: Vec<FactionId>,
    /// When the remembered event happened.
    pub occurred_at: DateTime<Utc>,
}

impl FactionMemory {
    /// Create a memory, clamping impact to `[-1, 1]` and decay to `(0, 1]`.
    pub fn new(
        event_type: impl Into<String>,
        description: impl Into<String>,
        impact: f64,
        decay: f64,
        participants: Vec<FactionId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            event_type: event_type.into(),
            description: description.into(),
            impact: impact.clamp(-1.0, 1.0),
            decay: decay.clamp(f64::MIN_POSITIVE, 1.0),
            participants,
            occurred_at,
        }
    }

    /// Age of the memory in fractional days at `now`. Never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.occurred_at).num_seconds();
        if seconds <= 0 {
            0.0
        } else {
            seconds as f64 / 86_400.0
        }
    }

    /// Impact after exponential decay: `impact * decay^age_days`.
    pub fn effective_impact(&self, now: DateTime<Utc>) -> f64 {
        self.impact * self.decay.powf(self.age_days(now))
    }

    /// Whether the memory still carries enough weight to matter.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.effective_impact(now).abs() >= MEMORY_RELEVANCE_FLOOR
    }

    /// Whether the given faction took part in the remembered event.
    pub fn involves(&self, faction: FactionId) -> bool {
        self.participants.contains(&faction)
    }
}

/// One recorded player interaction, kept by the learning system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInteraction {
    /// Interaction category (e.g. `diplomatic`, `trade`, `military`).
    pub kind: String,
    /// How it went for the faction.
    pub outcome: InteractionOutcome,
    /// When it happened.
    pub at: DateTime<Utc>,
}

/// Accumulated learning state of a faction personality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningData {
    /// Recent player interactions, capped at 50 entries.
    #[serde(default)]
    pub player_interactions: Vec<PlayerInteraction>,
    /// Free-form extensions written by the learning system.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The decision-making soul of a faction.
///
/// Decision weights are normalized to sum to 1; memories are bounded by
/// [`MEMORY_CAP`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionPersonality {
    /// The faction this personality belongs to.
    pub faction: FactionId,
    /// Named traits in `[0, 1]`.
    pub traits: BTreeMap<String, f64>,
    /// Named values in `[0, 1]`.
    pub values: BTreeMap<String, f64>,
    /// Normalized decision weights (sum 1).
    pub decision_weights: BTreeMap<String, f64>,
    /// Current collective mood.
    pub mood: FactionMood,
    /// Short label for how the faction approaches choices
    /// (e.g. `calculated`, `opportunistic`).
    pub decision_style: String,
    /// Bounded memory list, newest last.
    #[serde(default)]
    pub memories: Vec<FactionMemory>,
    /// Learning state.
    #[serde(default)]
    pub learning: LearningData,
    /// Last time the learning system updated this personality.
    pub last_learning: Option<DateTime<Utc>>,
}

/// One stage of a faction's long-term plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaStage {
    /// Stage name.
    pub name: String,
    /// What the stage involves.
    pub description: String,
    /// Whether the stage is done.
    pub complete: bool,
    /// When the stage was completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// An ordered list of stages representing a faction's long-term plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionAgenda {
    /// Unique agenda identifier.
    pub id: AgendaId,
    /// The faction pursuing this agenda.
    pub faction: FactionId,
    /// Agenda title.
    pub title: String,
    /// Ordered stages.
    pub stages: Vec<AgendaStage>,
    /// Completed-stage fraction in `[0, 1]`.
    pub progress: f64,
    /// Whether the agenda is still pursued.
    pub status: AgendaStatus,
}

impl FactionAgenda {
    /// Recompute `progress` as completed stages over total stages.
    /// An agenda with no stages counts as fully complete.
    pub fn recompute_progress(&mut self) {
        let total = self.stages.len();
        if total == 0 {
            self.progress = 1.0;
            return;
        }
        let done = self.stages.iter().filter(|s| s.complete).count();
        self.progress = done as f64 / total as f64;
    }

    /// Index of the first incomplete stage, if any.
    pub fn next_stage(&self) -> Option<usize> {
        self.stages.iter().position(|s| !s.complete)
    }
}

// ---------------------------------------------------------------------------
// World events
// ---------------------------------------------------------------------------

/// A follow-on effect attached to a world event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConsequence {
    /// Consequence category (e.g. `economic`, `relationship`).
    pub kind: String,
    /// What the consequence applies to (entity name or identifier).
    pub target: String,
    /// Short description of the effect.
    pub effect: String,
    /// Signed strength of the effect.
    pub magnitude: f64,
    /// Duration in days; `None` means permanent.
    pub duration_days: Option<u32>,
    /// Free-form parameters.
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

/// An immutable record of something that happened in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Unique event identifier.
    pub id: WorldEventId,
    /// Owning session.
    pub session: SessionId,
    /// Type tag (e.g. `npc_goal_progress`, `faction_interaction`).
    pub event_type: String,
    /// Short headline.
    pub title: String,
    /// Full account of what happened.
    pub description: String,
    /// Named impact magnitudes.
    #[serde(default)]
    pub impact: BTreeMap<String, f64>,
    /// Entities affected, by name or identifier.
    #[serde(default)]
    pub affected_entities: Vec<String>,
    /// Whether players can see this event.
    pub player_visible: bool,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Follow-on effects, if any.
    #[serde(default)]
    pub consequences: Vec<EventConsequence>,
}

// ---------------------------------------------------------------------------
// NPCs
// ---------------------------------------------------------------------------

/// A non-player character living in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    /// Unique NPC identifier.
    pub id: NpcId,
    /// Owning session.
    pub session: SessionId,
    /// NPC name.
    pub name: String,
    /// Disposition towards the party.
    pub attitude: NpcAttitude,
    /// Ability scores (drive goal progress modifiers).
    pub abilities: AbilityScores,
}

/// A per-NPC objective advanced by the background simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcGoal {
    /// Unique goal identifier.
    pub id: GoalId,
    /// The NPC pursuing this goal.
    pub npc: NpcId,
    /// What the goal is about.
    pub kind: GoalKind,
    /// Human-readable description.
    pub description: String,
    /// Priority `1..=5` (5 is most urgent).
    pub priority: u8,
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
    /// Progress state.
    pub status: GoalStatus,
    /// When the NPC started pursuing the goal.
    pub started_at: DateTime<Utc>,
    /// When the goal reached completion.
    pub completed_at: Option<DateTime<Utc>>,
}

/// One entry of an NPC's daily routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// The time-of-day bucket the entry covers.
    pub time_of_day: TimeOfDay,
    /// What the NPC does.
    pub activity: String,
    /// Where the NPC does it.
    pub location: String,
}

/// An NPC's daily routine: one activity/location per time-of-day bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcSchedule {
    /// The NPC this schedule belongs to.
    pub npc: NpcId,
    /// Routine entries.
    pub entries: Vec<ScheduleEntry>,
}

impl NpcSchedule {
    /// The default routine given to NPCs that have none: daily routine at
    /// home, work at the workplace, socializing at the tavern, rest at home.
    pub fn default_for(npc: NpcId) -> Self {
        Self {
            npc,
            entries: vec![
                ScheduleEntry {
                    time_of_day: TimeOfDay::Morning,
                    activity: String::from("daily_routine"),
                    location: String::from("home"),
                },
                ScheduleEntry {
                    time_of_day: TimeOfDay::Afternoon,
                    activity: String::from("work"),
                    location: String::from("workplace"),
                },
                ScheduleEntry {
                    time_of_day: TimeOfDay::Evening,
                    activity: String::from("socializing"),
                    location: String::from("tavern"),
                },
                ScheduleEntry {
                    time_of_day: TimeOfDay::Night,
                    activity: String::from("rest"),
                    location: String::from("home"),
                },
            ],
        }
    }

    /// Entries active during the given time-of-day bucket.
    pub fn entries_at(&self, time_of_day: TimeOfDay) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries
            .iter()
            .filter(move |e| e.time_of_day == time_of_day)
    }
}

// ---------------------------------------------------------------------------
// Settlements and cultures
// ---------------------------------------------------------------------------

/// A populated place whose economy the simulation advances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Unique settlement identifier.
    pub id: SettlementId,
    /// Owning session.
    pub session: SessionId,
    /// Settlement name.
    pub name: String,
    /// Resident head count.
    pub population: u64,
    /// Form of government (free-form label).
    pub government: String,
    /// Economic health in `[0, 1]`.
    pub prosperity: f64,
    /// Names of connected trade routes.
    #[serde(default)]
    pub trade_routes: Vec<String>,
    /// Main goods produced for export.
    #[serde(default)]
    pub primary_exports: Vec<String>,
}

/// A cultural group whose customs drift over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culture {
    /// Unique culture identifier.
    pub id: CultureId,
    /// Owning session.
    pub session: SessionId,
    /// Culture name.
    pub name: String,
    /// Summary of values and customs.
    pub description: String,
}

// ---------------------------------------------------------------------------
// Simulation bookkeeping
// ---------------------------------------------------------------------------

/// Per-session simulation watermark plus opaque world data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// The session this state belongs to.
    pub session: SessionId,
    /// When the world was last advanced.
    pub last_simulated: DateTime<Utc>,
    /// Opaque world data owned by the play layer.
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Record of one simulation step, kept for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationLog {
    /// Unique log identifier.
    pub id: SimulationLogId,
    /// The session that was advanced.
    pub session: SessionId,
    /// When the step started.
    pub started_at: DateTime<Utc>,
    /// When the step finished.
    pub ended_at: Option<DateTime<Utc>>,
    /// Number of world events emitted by the step.
    pub events_created: u32,
    /// Per-phase counts and recorded errors.
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    /// False when event or state persistence failed.
    pub success: bool,
}
