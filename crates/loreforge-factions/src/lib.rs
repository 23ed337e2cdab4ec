//! Faction personality engine for the Loreforge game backend.
//!
//! Gives each faction a decision-making soul: sampled traits and values,
//! normalized decision weights, a bounded memory list with exponential
//! day-based decay, scored option choices with an LLM assist and a
//! deterministic fallback, mood derived from recent memories, and a
//! learning loop fed by player interactions.
//!
//! # Modules
//!
//! - [`profile`] -- trait/value sampling and weight derivation
//! - [`decision`] -- option scoring and memory selection
//! - [`engine`] -- the [`PersonalityEngine`] orchestrating it all
//! - [`error`] -- [`FactionError`]

pub mod decision;
pub mod engine;
pub mod error;
pub mod profile;

pub use decision::{
    DecisionOption, DecisionOutcome, FactionDecision, best_option, relevant_event_type,
    relevant_memories, score_option, score_options,
};
pub use engine::{PersonalityEngine, RememberedEvent, mood_from_memories, prune_memories};
pub use error::FactionError;
pub use profile::{TRAIT_NAMES, VALUE_NAMES, derive_weights, sample_traits, sample_values};
