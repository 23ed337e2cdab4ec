//! In-process event distribution for the Loreforge game backend.
//!
//! Subsystems stay loosely coupled by publishing typed events onto a
//! shared [`EventBus`] instead of calling each other: the session
//! orchestrator announces lifecycle changes, the simulator republishes
//! persisted world events, and subscribers (analytics, audit, presence)
//! consume them without the publisher knowing who listens.
//!
//! # Modules
//!
//! - [`event`] -- The [`GameEvent`] contract, concrete event types, and
//!   canonical type tags
//! - [`bus`] -- The bus itself: snapshot-on-publish fan-out with
//!   per-handler panic isolation

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventHandler, HandlerError};
pub use event::{
    CharacterLeveled, CombatEnded, CombatStarted, FactionRelationChanged, GameEvent,
    PlayerJoined, PlayerLeft, SessionCreated, WorldEventRecorded, topic,
};
