//! Data layer for the Loreforge game backend.
//!
//! The core reaches storage only through the repository traits in
//! [`repos`]; implementations must preserve what was written
//! field-for-field and resolve concurrent writes last-write-wins, with
//! uniqueness (join code, participant tuple) enforced at this seam.
//!
//! Two backends ship in-crate:
//!
//! - [`memory::MemoryBackend`] -- a complete in-memory implementation of
//!   every trait, used by the test suites and the default engine wiring.
//! - `PostgreSQL` stores for the append-heavy aggregates (world events,
//!   world state, simulation logs), using runtime-checked [`sqlx`]
//!   queries so no live database is needed at build time.
//!
//! # Modules
//!
//! - [`error`] -- [`DbError`] with distinguished `NotFound`/`Conflict`
//! - [`repos`] -- repository traits, one per aggregate
//! - [`memory`] -- shared in-memory backend
//! - [`postgres`] -- connection pool and configuration
//! - [`event_store`] -- world event history table
//! - [`state_store`] -- world state watermark table
//! - [`log_store`] -- simulation log table

pub mod error;
pub mod event_store;
pub mod log_store;
pub mod memory;
pub mod postgres;
pub mod repos;
pub mod state_store;

pub use error::DbError;
pub use event_store::PgWorldEventStore;
pub use log_store::PgSimulationLogStore;
pub use memory::MemoryBackend;
pub use postgres::{PostgresConfig, PostgresPool};
pub use repos::{
    AgendaRepo, CharacterRepo, ClassRepo, CultureRepo, EncounterRepo, FactionRepo, NpcGoalRepo,
    NpcRepo, NpcScheduleRepo, ParticipantRepo, PersonalityRepo, RefreshTokenRepo, SessionRepo,
    SettlementRepo, SimulationLogRepo, WorldEventRepo, WorldStateRepo,
};
pub use state_store::PgWorldStateStore;
