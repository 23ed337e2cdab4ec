//! Repository traits, one per aggregate.
//!
//! The core never touches storage directly; it goes through these seams.
//! Implementations must preserve field-for-field what was written, let
//! concurrent writes to the same aggregate resolve last-write-wins, and
//! enforce the two uniqueness constraints (session join code among
//! non-completed sessions, participant `(user, session)` tuple) by
//! returning [`DbError::Conflict`].
//!
//! Every lookup miss is the distinguished [`DbError::NotFound`] kind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use loreforge_types::{
    Character, CharacterClass, CharacterId, ClassId, Culture, Encounter, EncounterId, Faction,
    FactionAgenda, FactionId, FactionPersonality, GoalId, Npc, NpcGoal, NpcId, NpcSchedule,
    Participant, RefreshToken, RefreshTokenId, Session, SessionId, Settlement, SettlementId,
    SimulationLog, UserId, WorldEvent, WorldState,
};

use crate::error::DbError;

/// Sessions: lifecycle records and join-code lookup.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Persist a new session. Fails with [`DbError::Conflict`] when the
    /// join code is already held by a non-completed session.
    async fn create(&self, session: &Session) -> Result<(), DbError>;
    /// Fetch a session by id.
    async fn get(&self, id: SessionId) -> Result<Session, DbError>;
    /// Fetch a non-completed session by join code.
    async fn get_by_code(&self, code: &str) -> Result<Session, DbError>;
    /// Sessions refereed by the user.
    async fn list_by_referee(&self, user: UserId) -> Result<Vec<Session>, DbError>;
    /// Sessions the user participates in (including as referee).
    async fn list_by_participant(&self, user: UserId) -> Result<Vec<Session>, DbError>;
    /// All sessions currently in play (status active).
    async fn list_active(&self) -> Result<Vec<Session>, DbError>;
    /// Overwrite an existing session (last write wins).
    async fn update(&self, session: &Session) -> Result<(), DbError>;
    /// Delete a session and its participation records.
    async fn delete(&self, id: SessionId) -> Result<(), DbError>;
}

/// Participants: attachment of users to sessions.
#[async_trait]
pub trait ParticipantRepo: Send + Sync {
    /// Attach a user. Fails with [`DbError::Conflict`] when the
    /// `(user, session)` pair already exists.
    async fn add(&self, participant: &Participant) -> Result<(), DbError>;
    /// Fetch one participation record.
    async fn get(&self, session: SessionId, user: UserId) -> Result<Participant, DbError>;
    /// All participants of a session, in join order.
    async fn list(&self, session: SessionId) -> Result<Vec<Participant>, DbError>;
    /// Detach a user from a session.
    async fn remove(&self, session: SessionId, user: UserId) -> Result<(), DbError>;
    /// Flip the live-presence flag.
    async fn set_online(
        &self,
        session: SessionId,
        user: UserId,
        online: bool,
    ) -> Result<(), DbError>;
}

/// Player characters. The core only reads ownership and level.
#[async_trait]
pub trait CharacterRepo: Send + Sync {
    /// Persist a new character.
    async fn create(&self, character: &Character) -> Result<(), DbError>;
    /// Fetch a character by id.
    async fn get(&self, id: CharacterId) -> Result<Character, DbError>;
    /// Characters owned by the user.
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Character>, DbError>;
    /// Overwrite an existing character.
    async fn update(&self, character: &Character) -> Result<(), DbError>;
}

/// Factions within sessions.
#[async_trait]
pub trait FactionRepo: Send + Sync {
    /// Persist a new faction.
    async fn create(&self, faction: &Faction) -> Result<(), DbError>;
    /// Fetch a faction by id.
    async fn get(&self, id: FactionId) -> Result<Faction, DbError>;
    /// All factions of a session.
    async fn list_by_session(&self, session: SessionId) -> Result<Vec<Faction>, DbError>;
    /// Overwrite an existing faction.
    async fn update(&self, faction: &Faction) -> Result<(), DbError>;
}

/// Faction personalities (one per faction, updated in place).
#[async_trait]
pub trait PersonalityRepo: Send + Sync {
    /// Fetch the personality of a faction.
    async fn get(&self, faction: FactionId) -> Result<FactionPersonality, DbError>;
    /// Insert or overwrite the personality of a faction.
    async fn upsert(&self, personality: &FactionPersonality) -> Result<(), DbError>;
}

/// Non-player characters.
#[async_trait]
pub trait NpcRepo: Send + Sync {
    /// Persist a new NPC.
    async fn create(&self, npc: &Npc) -> Result<(), DbError>;
    /// Fetch an NPC by id.
    async fn get(&self, id: NpcId) -> Result<Npc, DbError>;
    /// All NPCs of a session.
    async fn list_by_session(&self, session: SessionId) -> Result<Vec<Npc>, DbError>;
}

/// NPC goals advanced by the background simulation.
#[async_trait]
pub trait NpcGoalRepo: Send + Sync {
    /// Persist a new goal.
    async fn create(&self, goal: &NpcGoal) -> Result<(), DbError>;
    /// Fetch a goal by id.
    async fn get(&self, id: GoalId) -> Result<NpcGoal, DbError>;
    /// All goals of an NPC (any status).
    async fn list_by_npc(&self, npc: NpcId) -> Result<Vec<NpcGoal>, DbError>;
    /// Overwrite an existing goal.
    async fn update(&self, goal: &NpcGoal) -> Result<(), DbError>;
}

/// NPC daily routines.
#[async_trait]
pub trait NpcScheduleRepo: Send + Sync {
    /// Fetch an NPC's schedule, [`DbError::NotFound`] when it has none.
    async fn get(&self, npc: NpcId) -> Result<NpcSchedule, DbError>;
    /// Insert or overwrite an NPC's schedule.
    async fn upsert(&self, schedule: &NpcSchedule) -> Result<(), DbError>;
}

/// Faction agendas (long-term plans).
#[async_trait]
pub trait AgendaRepo: Send + Sync {
    /// Persist a new agenda.
    async fn create(&self, agenda: &FactionAgenda) -> Result<(), DbError>;
    /// All agendas of a faction (any status).
    async fn list_by_faction(&self, faction: FactionId) -> Result<Vec<FactionAgenda>, DbError>;
    /// Overwrite an existing agenda.
    async fn update(&self, agenda: &FactionAgenda) -> Result<(), DbError>;
}

/// Append-only world event history.
#[async_trait]
pub trait WorldEventRepo: Send + Sync {
    /// Append one event.
    async fn append(&self, event: &WorldEvent) -> Result<(), DbError>;
    /// All events of a session in append order.
    async fn list_by_session(&self, session: SessionId) -> Result<Vec<WorldEvent>, DbError>;
    /// Player-visible events of a session in append order.
    async fn list_visible(&self, session: SessionId) -> Result<Vec<WorldEvent>, DbError>;
}

/// Per-session world state (simulation watermark).
#[async_trait]
pub trait WorldStateRepo: Send + Sync {
    /// Fetch the world state of a session.
    async fn get(&self, session: SessionId) -> Result<WorldState, DbError>;
    /// Insert or overwrite the world state of a session.
    async fn upsert(&self, state: &WorldState) -> Result<(), DbError>;
}

/// Simulation step logs.
#[async_trait]
pub trait SimulationLogRepo: Send + Sync {
    /// Persist a newly opened log.
    async fn create(&self, log: &SimulationLog) -> Result<(), DbError>;
    /// Overwrite a log (e.g. closing it with an end time).
    async fn update(&self, log: &SimulationLog) -> Result<(), DbError>;
    /// Recent logs of a session, newest first.
    async fn list_by_session(&self, session: SessionId) -> Result<Vec<SimulationLog>, DbError>;
}

/// Settlements whose economies the simulation advances.
#[async_trait]
pub trait SettlementRepo: Send + Sync {
    /// Persist a new settlement.
    async fn create(&self, settlement: &Settlement) -> Result<(), DbError>;
    /// Fetch a settlement by id.
    async fn get(&self, id: SettlementId) -> Result<Settlement, DbError>;
    /// All settlements of a session.
    async fn list_by_session(&self, session: SessionId) -> Result<Vec<Settlement>, DbError>;
    /// Overwrite an existing settlement.
    async fn update(&self, settlement: &Settlement) -> Result<(), DbError>;
}

/// Cultural groups whose customs drift over time.
#[async_trait]
pub trait CultureRepo: Send + Sync {
    /// Persist a new culture.
    async fn create(&self, culture: &Culture) -> Result<(), DbError>;
    /// All cultures of a session.
    async fn list_by_session(&self, session: SessionId) -> Result<Vec<Culture>, DbError>;
}

/// Stored refresh-token records for the auth collaborator.
///
/// The core never mints or verifies tokens; it only keeps the records
/// that let the auth layer renew and revoke them.
#[async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    /// Persist a newly issued token record.
    async fn create(&self, token: &RefreshToken) -> Result<(), DbError>;
    /// Look up a token record by the hash of its credential.
    async fn get_by_hash(&self, token_hash: &str) -> Result<RefreshToken, DbError>;
    /// Mark one token revoked.
    async fn revoke(&self, id: RefreshTokenId) -> Result<(), DbError>;
    /// Revoke every token of a user (log out everywhere).
    async fn revoke_all_for_user(&self, user: UserId) -> Result<(), DbError>;
    /// Drop rows expired at `now`; returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, DbError>;
}

/// Generated custom character classes.
#[async_trait]
pub trait ClassRepo: Send + Sync {
    /// Persist a validated class.
    async fn create(&self, class: &CharacterClass) -> Result<(), DbError>;
    /// Fetch a class by id.
    async fn get(&self, id: ClassId) -> Result<CharacterClass, DbError>;
}

/// Generated encounters.
#[async_trait]
pub trait EncounterRepo: Send + Sync {
    /// Persist a validated encounter.
    async fn create(&self, encounter: &Encounter) -> Result<(), DbError>;
    /// Fetch an encounter by id.
    async fn get(&self, id: EncounterId) -> Result<Encounter, DbError>;
}
