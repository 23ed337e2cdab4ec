//! LLM-backed content generators for the Loreforge game backend.
//!
//! Every generator runs the same pipeline: assemble a prompt fixing the
//! domain voice and required JSON shape, call the gateway, slice the
//! JSON out of the (often prose-wrapped) response, enforce the domain
//! invariants and derive secondary fields, then persist. Generators
//! fail closed -- no artifact is stored unless every phase succeeded --
//! with one deliberate exception: the faction generator falls back to a
//! fully procedural build when the LLM lets it down.
//!
//! # Modules
//!
//! - [`prompt`] -- embedded prompt templates and system prompts
//! - [`tables`] -- XP thresholds, CR values, encounter multipliers
//! - [`class`] -- custom character classes
//! - [`encounter`] -- combat encounters with XP derivation
//! - [`assist`] -- DM assists (dialogue, locations, narration, twists,
//!   hazards, portraits)
//! - [`faction_gen`] -- factions with procedural fallback
//! - [`error`] -- [`GenerateError`]

pub mod assist;
pub mod class;
pub mod encounter;
pub mod error;
pub mod faction_gen;
pub mod prompt;
pub mod tables;

pub use assist::{
    CombatNarrationRequest, CombatOutcome, DialogueRequest, DmAssistant, HazardRequest,
    LocationRequest, PlotTwistRequest, PortraitRequest, narration_intensity,
};
pub use class::{ClassGenerator, ClassRequest};
pub use encounter::{EncounterGenerator, EncounterRequest};
pub use error::GenerateError;
pub use faction_gen::{FactionGenerator, FactionRequest};
pub use prompt::PromptLibrary;
pub use tables::{cr_to_xp, group_multiplier, party_size_modifier, xp_budget, xp_threshold};
