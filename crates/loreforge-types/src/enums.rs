//! Enumeration types for the Loreforge game backend.
//!
//! Covers session lifecycle, faction classification and mood, NPC goals
//! and schedules, encounter difficulty, and the six canonical abilities.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a game session.
///
/// Transitions are monotonic: `Pending -> Active -> Completed`. A session
/// never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created but not yet started by the referee.
    Pending,
    /// In play.
    Active,
    /// Finished; the session is read-only history.
    Completed,
}

impl SessionStatus {
    /// Whether a transition from `self` to `next` respects the monotonic
    /// `Pending -> Active -> Completed` ordering. Staying in place is allowed.
    pub fn can_transition_to(self, next: Self) -> bool {
        next >= self
    }
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// Broad classification of a faction's nature.
///
/// The kind drives personality adjustments and the base power tables used
/// by the procedural faction builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionKind {
    /// Temple hierarchies, holy orders, zealous sects.
    Religious,
    /// Standing armies, mercenary companies, knightly orders.
    Military,
    /// Thieves' guilds, smuggling rings, assassin brotherhoods.
    Criminal,
    /// Trade consortiums, merchant houses, banking families.
    Mercantile,
    /// Noble courts, city councils, shadow cabinets.
    Political,
    /// Mage circles, wizard colleges, enchanter cabals.
    Arcane,
    /// Libraries, academies, cartographer societies.
    Scholarly,
    /// Secretive worshippers of forbidden powers.
    Cult,
}

/// Diplomatic stance between two factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Formal or de-facto allies.
    Ally,
    /// No strong alignment either way.
    Neutral,
    /// Open or covert enemies.
    Enemy,
}

impl RelationKind {
    /// Derive the stance from a numeric standing in `[-100, 100]`.
    ///
    /// Standings above +50 read as allied, below -50 as hostile, and
    /// everything between as neutral.
    pub const fn from_standing(standing: i32) -> Self {
        if standing > 50 {
            Self::Ally
        } else if standing < -50 {
            Self::Enemy
        } else {
            Self::Neutral
        }
    }
}

/// Collective emotional state of a faction, derived from recent memories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionMood {
    /// Recent events have gone overwhelmingly well.
    Triumphant,
    /// Things are going well.
    Confident,
    /// Neither winning nor losing; watchful.
    #[default]
    Cautious,
    /// Recent setbacks weigh on the leadership.
    Worried,
    /// The faction is losing on every front.
    Desperate,
}

/// Whether a faction agenda is still being pursued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgendaStatus {
    /// Stages remain incomplete.
    Active,
    /// Every stage is done.
    Completed,
}

/// Outcome of a player's interaction with a faction, as judged by the
/// learning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionOutcome {
    /// The interaction went the faction's way.
    Positive,
    /// No meaningful change.
    Neutral,
    /// The interaction went against the faction.
    Negative,
}

// ---------------------------------------------------------------------------
// NPCs
// ---------------------------------------------------------------------------

/// An NPC's disposition towards the player party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcAttitude {
    /// Actively friendly to the party.
    Ally,
    /// Indifferent until given a reason not to be.
    Neutral,
    /// Hostile to the party.
    Hostile,
}

impl NpcAttitude {
    /// Whether this NPC's background activity should be visible to players.
    ///
    /// Hostile NPCs act off-screen; allies and neutrals can be observed.
    pub const fn is_player_facing(self) -> bool {
        matches!(self, Self::Ally | Self::Neutral)
    }
}

/// What an NPC goal is ultimately about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Accumulating money or property.
    Wealth,
    /// Gaining social or political sway.
    Influence,
    /// Mastering a craft or talent.
    Skill,
    /// Learning secrets or scholarship.
    Knowledge,
    /// Settling a score.
    Revenge,
    /// Winning someone's heart.
    Romance,
    /// Protecting self, family, or home.
    Security,
    /// Completing a specific undertaking.
    Quest,
}

impl GoalKind {
    /// All goal kinds, for uniform random selection.
    pub const ALL: [Self; 8] = [
        Self::Wealth,
        Self::Influence,
        Self::Skill,
        Self::Knowledge,
        Self::Revenge,
        Self::Romance,
        Self::Security,
        Self::Quest,
    ];

    /// Lowercase label used in descriptions and event payloads.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Wealth => "wealth",
            Self::Influence => "influence",
            Self::Skill => "skill",
            Self::Knowledge => "knowledge",
            Self::Revenge => "revenge",
            Self::Romance => "romance",
            Self::Security => "security",
            Self::Quest => "quest",
        }
    }
}

/// Progress state of an NPC goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Being pursued.
    Active,
    /// Reached full progress.
    Completed,
    /// Given up before completion.
    Abandoned,
}

/// Coarse time-of-day bucket used by NPC schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// Roughly 05:00-11:59.
    Morning,
    /// Roughly 12:00-16:59.
    Afternoon,
    /// Roughly 17:00-21:59.
    Evening,
    /// Roughly 22:00-04:59.
    Night,
}

impl TimeOfDay {
    /// Map an hour of the day (0..=23) to its schedule bucket.
    pub const fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::Night,
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Encounter difficulty tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Low threat; drains few resources.
    Easy,
    /// A speed bump with some tension.
    #[default]
    Medium,
    /// Dangerous; could go badly.
    Hard,
    /// Potentially lethal.
    Deadly,
}

impl Difficulty {
    /// Parse a difficulty label, falling back to [`Difficulty::Medium`]
    /// for anything unrecognized.
    pub fn parse_lossy(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            "deadly" => Self::Deadly,
            _ => Self::Medium,
        }
    }
}

/// The six canonical abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Raw physical power.
    Strength,
    /// Agility and reflexes.
    Dexterity,
    /// Endurance and vitality.
    Constitution,
    /// Reasoning and memory.
    Intelligence,
    /// Perception and willpower.
    Wisdom,
    /// Force of personality.
    Charisma,
}

impl Ability {
    /// Parse a canonical ability name, case-insensitively.
    ///
    /// Returns `None` for anything that is not one of the six abilities.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "strength" => Some(Self::Strength),
            "dexterity" => Some(Self::Dexterity),
            "constitution" => Some(Self::Constitution),
            "intelligence" => Some(Self::Intelligence),
            "wisdom" => Some(Self::Wisdom),
            "charisma" => Some(Self::Charisma),
            _ => None,
        }
    }

    /// Canonical capitalized name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Strength => "Strength",
            Self::Dexterity => "Dexterity",
            Self::Constitution => "Constitution",
            Self::Intelligence => "Intelligence",
            Self::Wisdom => "Wisdom",
            Self::Charisma => "Charisma",
        }
    }
}

impl core::fmt::Display for Ability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_is_monotonic() {
        assert!(SessionStatus::Pending.can_transition_to(SessionStatus::Active));
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Completed));
        assert!(SessionStatus::Pending.can_transition_to(SessionStatus::Completed));
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Active));
        assert!(!SessionStatus::Completed.can_transition_to(SessionStatus::Active));
        assert!(!SessionStatus::Active.can_transition_to(SessionStatus::Pending));
    }

    #[test]
    fn relation_kind_from_standing_bands() {
        assert_eq!(RelationKind::from_standing(80), RelationKind::Ally);
        assert_eq!(RelationKind::from_standing(51), RelationKind::Ally);
        assert_eq!(RelationKind::from_standing(50), RelationKind::Neutral);
        assert_eq!(RelationKind::from_standing(0), RelationKind::Neutral);
        assert_eq!(RelationKind::from_standing(-50), RelationKind::Neutral);
        assert_eq!(RelationKind::from_standing(-51), RelationKind::Enemy);
        assert_eq!(RelationKind::from_standing(-100), RelationKind::Enemy);
    }

    #[test]
    fn time_of_day_from_hour_buckets() {
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(16), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(22), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(3), TimeOfDay::Night);
    }

    #[test]
    fn difficulty_parse_lossy_defaults_to_medium() {
        assert_eq!(Difficulty::parse_lossy("easy"), Difficulty::Easy);
        assert_eq!(Difficulty::parse_lossy("DEADLY"), Difficulty::Deadly);
        assert_eq!(Difficulty::parse_lossy("impossible"), Difficulty::Medium);
        assert_eq!(Difficulty::parse_lossy(""), Difficulty::Medium);
    }

    #[test]
    fn ability_parse_is_case_insensitive() {
        assert_eq!(Ability::parse("Dexterity"), Some(Ability::Dexterity));
        assert_eq!(Ability::parse("CHARISMA"), Some(Ability::Charisma));
        assert_eq!(Ability::parse("wisdom"), Some(Ability::Wisdom));
        assert_eq!(Ability::parse("luck"), None);
    }

    #[test]
    fn npc_attitude_visibility() {
        assert!(NpcAttitude::Ally.is_player_facing());
        assert!(NpcAttitude::Neutral.is_player_facing());
        assert!(!NpcAttitude::Hostile.is_player_facing());
    }

    #[test]
    fn enums_roundtrip_serde() {
        let json = serde_json::to_string(&FactionKind::Mercantile).ok();
        assert_eq!(json.as_deref(), Some("\"mercantile\""));
        let back: Result<FactionKind, _> = serde_json::from_str("\"mercantile\"");
        assert_eq!(back.ok(), Some(FactionKind::Mercantile));
    }
}
