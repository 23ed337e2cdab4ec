//! Typed artifacts produced by the content generators.
//!
//! These records are the contract between the generation layer and the
//! HTTP layer: a generator either returns one of these fully validated
//! or fails without persisting anything.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{Ability, Difficulty};
use crate::ids::{ClassId, EncounterId, SessionId};

// ---------------------------------------------------------------------------
// Character classes
// ---------------------------------------------------------------------------

/// One feature of a character class, gained at a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFeature {
    /// Level at which the feature is gained (1-based).
    pub level: u32,
    /// Feature name.
    pub name: String,
    /// What the feature does.
    #[serde(default)]
    pub description: String,
}

/// A validated custom character class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterClass {
    /// Unique class identifier.
    pub id: ClassId,
    /// Class name.
    pub name: String,
    /// Flavor description.
    pub description: String,
    /// Intended party role (e.g. "stealth damage dealer").
    pub role: String,
    /// Hit die size: one of 6, 8, 10, 12.
    pub hit_die: u32,
    /// Primary ability of the class.
    pub primary_ability: Ability,
    /// Exactly two saving-throw proficiencies.
    pub saving_throw_proficiencies: Vec<String>,
    /// Spellcasting ability, when the class casts.
    pub spellcasting_ability: Option<String>,
    /// Features by level; at least one at level 1.
    pub class_features: Vec<ClassFeature>,
    /// Derived balance score in `0..=10`.
    pub balance_score: u8,
}

// ---------------------------------------------------------------------------
// Encounters
// ---------------------------------------------------------------------------

/// One enemy line in an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterEnemy {
    /// Creature name.
    pub name: String,
    /// Challenge rating as written ("1/2", "3"). Unknown ratings
    /// contribute zero XP.
    pub cr: String,
    /// How many of this creature appear.
    pub quantity: u32,
}

/// XP budgets for rescaling the encounter up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingOptions {
    /// Budget for an easy rendition.
    pub easy: u32,
    /// Budget for a medium rendition.
    pub medium: u32,
    /// Budget for a hard rendition.
    pub hard: u32,
    /// Budget for a deadly rendition (derived as twice hard).
    pub deadly: u32,
}

/// A validated combat encounter with derived XP math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    /// Unique encounter identifier.
    pub id: EncounterId,
    /// Session the encounter was generated for, when known.
    pub session: Option<SessionId>,
    /// Encounter title.
    pub title: String,
    /// Read-aloud description.
    pub description: String,
    /// Requested difficulty tier.
    pub difficulty: Difficulty,
    /// Enemy roster.
    pub enemies: Vec<EncounterEnemy>,
    /// XP budget for the party at the requested difficulty.
    pub xp_budget: u32,
    /// Raw XP total of the roster.
    pub total_xp: u32,
    /// Roster XP adjusted for enemy count and party size.
    pub adjusted_xp: u32,
    /// Quantity-weighted mean challenge rating.
    pub average_cr: f64,
    /// Party-specific tactical notes keyed by tactic tag
    /// (`vs_healer`, `vs_caster`, `vs_tank`).
    #[serde(default)]
    pub tactics: BTreeMap<String, String>,
    /// Budgets for rescaling the encounter.
    pub scaling: ScalingOptions,
}

// ---------------------------------------------------------------------------
// DM-assistant artifacts
// ---------------------------------------------------------------------------

/// A generated location description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedLocation {
    /// Location name.
    pub name: String,
    /// Atmospheric description.
    pub description: String,
    /// Points of interest within the location.
    #[serde(default)]
    pub notable_features: Vec<String>,
    /// Adventure hooks seeded in the location.
    #[serde(default)]
    pub hooks: Vec<String>,
}

/// A generated environmental hazard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentalHazard {
    /// Hazard name.
    pub name: String,
    /// What the hazard looks like before it triggers.
    pub description: String,
    /// What sets the hazard off.
    pub trigger: String,
    /// What happens to those caught in it.
    pub effect: String,
    /// Difficulty class to avoid or escape the hazard.
    pub difficulty_class: u32,
    /// Damage expression (e.g. "4d6 fire").
    #[serde(default)]
    pub damage: String,
}

/// A generated plot twist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotTwist {
    /// Twist headline.
    pub title: String,
    /// The twist itself.
    pub description: String,
    /// Hints the DM can drop before the reveal.
    #[serde(default)]
    pub foreshadowing: Vec<String>,
    /// How the twist changes the campaign.
    #[serde(default)]
    pub impact: String,
}
