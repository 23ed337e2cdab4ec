//! Living-world simulator for the Loreforge game backend.
//!
//! Between play sessions the world keeps moving: NPCs chase their
//! goals and keep their routines, settlement economies drift and jolt,
//! factions advance agendas and collide, nature intervenes, and
//! cultures slowly change shape. One call to
//! [`WorldSimulator::simulate_world_progress`] replays all of that for
//! the wall-clock time elapsed since the previous step, persisting the
//! resulting world events in emission order and logging what each
//! sub-simulation did.
//!
//! # Modules
//!
//! - [`progress`] -- step gating, orchestration, persistence, logging
//! - `npc` -- NPC goals and routines
//! - `economy` -- settlement events and prosperity drift
//! - `politics` -- agendas, opportunities, faction interactions
//! - `nature` -- natural events
//! - `culture` -- cultural drift
//! - [`error`] -- [`SimError`]

pub mod error;
pub mod progress;

mod culture;
mod economy;
mod nature;
mod npc;
mod politics;

pub use error::SimError;
pub use progress::{SimDeps, SimulationReport, WorldSimulator};
