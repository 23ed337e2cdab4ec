//! In-memory reference implementation of every repository trait.
//!
//! Backs the test suite and the default engine wiring when no database
//! is configured. One write-preferring read-write lock guards the whole
//! store; clones share the same underlying state.
//!
//! Uniqueness constraints (join code among non-completed sessions, the
//! participant `(user, session)` tuple) are enforced here exactly as a
//! production backend would enforce them with unique indexes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use loreforge_types::{
    AgendaId, Character, CharacterClass, CharacterId, ClassId, Culture, CultureId, Encounter,
    EncounterId, Faction, FactionAgenda, FactionId, FactionPersonality, GoalId, Npc, NpcGoal,
    NpcId, NpcSchedule, Participant, RefreshToken, RefreshTokenId, Session, SessionId,
    SessionStatus, Settlement, SettlementId, SimulationLog, SimulationLogId, UserId, WorldEvent,
    WorldState,
};

use crate::error::DbError;
use crate::repos::{
    AgendaRepo, CharacterRepo, ClassRepo, CultureRepo, EncounterRepo, FactionRepo, NpcGoalRepo,
    NpcRepo, NpcScheduleRepo, ParticipantRepo, PersonalityRepo, RefreshTokenRepo, SessionRepo,
    SettlementRepo, SimulationLogRepo, WorldEventRepo, WorldStateRepo,
};

/// Everything the backend holds, keyed by aggregate.
#[derive(Debug, Default)]
struct State {
    sessions: BTreeMap<SessionId, Session>,
    participants: Vec<Participant>,
    characters: BTreeMap<CharacterId, Character>,
    factions: BTreeMap<FactionId, Faction>,
    personalities: BTreeMap<FactionId, FactionPersonality>,
    npcs: BTreeMap<NpcId, Npc>,
    goals: BTreeMap<GoalId, NpcGoal>,
    schedules: BTreeMap<NpcId, NpcSchedule>,
    agendas: BTreeMap<AgendaId, FactionAgenda>,
    world_events: Vec<WorldEvent>,
    world_states: BTreeMap<SessionId, WorldState>,
    simulation_logs: BTreeMap<SimulationLogId, SimulationLog>,
    settlements: BTreeMap<SettlementId, Settlement>,
    cultures: BTreeMap<CultureId, Culture>,
    classes: BTreeMap<ClassId, CharacterClass>,
    encounters: BTreeMap<EncounterId, Encounter>,
    refresh_tokens: BTreeMap<RefreshTokenId, RefreshToken>,
}

/// Shared in-memory store implementing all repository traits.
///
/// Cloning is cheap and shares state, so the same backend can be handed
/// to every subsystem as its respective `Arc<dyn ...Repo>`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<State>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of world events across all sessions (test helper).
    pub async fn world_event_count(&self) -> usize {
        self.inner.read().await.world_events.len()
    }

    /// Total number of stored classes (test helper).
    pub async fn class_count(&self) -> usize {
        self.inner.read().await.classes.len()
    }

    /// Total number of stored encounters (test helper).
    pub async fn encounter_count(&self) -> usize {
        self.inner.read().await.encounters.len()
    }
}

#[async_trait]
impl SessionRepo for MemoryBackend {
    async fn create(&self, session: &Session) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        let code_taken = state.sessions.values().any(|existing| {
            existing.code == session.code && existing.status != SessionStatus::Completed
        });
        if code_taken {
            return Err(DbError::conflict(format!(
                "join code {} already in use",
                session.code
            )));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get(&self, id: SessionId) -> Result<Session, DbError> {
        self.inner
            .read()
            .await
            .sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("session", id))
    }

    async fn get_by_code(&self, code: &str) -> Result<Session, DbError> {
        self.inner
            .read()
            .await
            .sessions
            .values()
            .find(|s| s.code == code && s.status != SessionStatus::Completed)
            .cloned()
            .ok_or_else(|| DbError::not_found("session", code))
    }

    async fn list_by_referee(&self, user: UserId) -> Result<Vec<Session>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.referee == user)
            .cloned()
            .collect())
    }

    async fn list_by_participant(&self, user: UserId) -> Result<Vec<Session>, DbError> {
        let state = self.inner.read().await;
        Ok(state
            .sessions
            .values()
            .filter(|s| {
                state
                    .participants
                    .iter()
                    .any(|p| p.session == s.id && p.user == user)
            })
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> Result<Vec<Session>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Active)
            .cloned()
            .collect())
    }

    async fn update(&self, session: &Session) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        if !state.sessions.contains_key(&session.id) {
            return Err(DbError::not_found("session", session.id));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        if state.sessions.remove(&id).is_none() {
            return Err(DbError::not_found("session", id));
        }
        state.participants.retain(|p| p.session != id);
        Ok(())
    }
}

#[async_trait]
impl ParticipantRepo for MemoryBackend {
    async fn add(&self, participant: &Participant) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        let duplicate = state
            .participants
            .iter()
            .any(|p| p.session == participant.session && p.user == participant.user);
        if duplicate {
            return Err(DbError::conflict(format!(
                "user {} already in session {}",
                participant.user, participant.session
            )));
        }
        state.participants.push(participant.clone());
        Ok(())
    }

    async fn get(&self, session: SessionId, user: UserId) -> Result<Participant, DbError> {
        self.inner
            .read()
            .await
            .participants
            .iter()
            .find(|p| p.session == session && p.user == user)
            .cloned()
            .ok_or_else(|| DbError::not_found("participant", user))
    }

    async fn list(&self, session: SessionId) -> Result<Vec<Participant>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .iter()
            .filter(|p| p.session == session)
            .cloned()
            .collect())
    }

    async fn remove(&self, session: SessionId, user: UserId) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        let before = state.participants.len();
        state
            .participants
            .retain(|p| !(p.session == session && p.user == user));
        if state.participants.len() == before {
            return Err(DbError::not_found("participant", user));
        }
        Ok(())
    }

    async fn set_online(
        &self,
        session: SessionId,
        user: UserId,
        online: bool,
    ) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        let participant = state
            .participants
            .iter_mut()
            .find(|p| p.session == session && p.user == user)
            .ok_or_else(|| DbError::not_found("participant", user))?;
        participant.is_online = online;
        Ok(())
    }
}

#[async_trait]
impl CharacterRepo for MemoryBackend {
    async fn create(&self, character: &Character) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .characters
            .insert(character.id, character.clone());
        Ok(())
    }

    async fn get(&self, id: CharacterId) -> Result<Character, DbError> {
        self.inner
            .read()
            .await
            .characters
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("character", id))
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Character>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .characters
            .values()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect())
    }

    async fn update(&self, character: &Character) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        if !state.characters.contains_key(&character.id) {
            return Err(DbError::not_found("character", character.id));
        }
        state.characters.insert(character.id, character.clone());
        Ok(())
    }
}

#[async_trait]
impl FactionRepo for MemoryBackend {
    async fn create(&self, faction: &Faction) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .factions
            .insert(faction.id, faction.clone());
        Ok(())
    }

    async fn get(&self, id: FactionId) -> Result<Faction, DbError> {
        self.inner
            .read()
            .await
            .factions
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("faction", id))
    }

    async fn list_by_session(&self, session: SessionId) -> Result<Vec<Faction>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .factions
            .values()
            .filter(|f| f.session == session)
            .cloned()
            .collect())
    }

    async fn update(&self, faction: &Faction) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        if !state.factions.contains_key(&faction.id) {
            return Err(DbError::not_found("faction", faction.id));
        }
        state.factions.insert(faction.id, faction.clone());
        Ok(())
    }
}

#[async_trait]
impl PersonalityRepo for MemoryBackend {
    async fn get(&self, faction: FactionId) -> Result<FactionPersonality, DbError> {
        self.inner
            .read()
            .await
            .personalities
            .get(&faction)
            .cloned()
            .ok_or_else(|| DbError::not_found("personality", faction))
    }

    async fn upsert(&self, personality: &FactionPersonality) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .personalities
            .insert(personality.faction, personality.clone());
        Ok(())
    }
}

#[async_trait]
impl NpcRepo for MemoryBackend {
    async fn create(&self, npc: &Npc) -> Result<(), DbError> {
        self.inner.write().await.npcs.insert(npc.id, npc.clone());
        Ok(())
    }

    async fn get(&self, id: NpcId) -> Result<Npc, DbError> {
        self.inner
            .read()
            .await
            .npcs
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("npc", id))
    }

    async fn list_by_session(&self, session: SessionId) -> Result<Vec<Npc>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .npcs
            .values()
            .filter(|n| n.session == session)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NpcGoalRepo for MemoryBackend {
    async fn create(&self, goal: &NpcGoal) -> Result<(), DbError> {
        self.inner.write().await.goals.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn get(&self, id: GoalId) -> Result<NpcGoal, DbError> {
        self.inner
            .read()
            .await
            .goals
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("npc goal", id))
    }

    async fn list_by_npc(&self, npc: NpcId) -> Result<Vec<NpcGoal>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .goals
            .values()
            .filter(|g| g.npc == npc)
            .cloned()
            .collect())
    }

    async fn update(&self, goal: &NpcGoal) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        if !state.goals.contains_key(&goal.id) {
            return Err(DbError::not_found("npc goal", goal.id));
        }
        state.goals.insert(goal.id, goal.clone());
        Ok(())
    }
}

#[async_trait]
impl NpcScheduleRepo for MemoryBackend {
    async fn get(&self, npc: NpcId) -> Result<NpcSchedule, DbError> {
        self.inner
            .read()
            .await
            .schedules
            .get(&npc)
            .cloned()
            .ok_or_else(|| DbError::not_found("npc schedule", npc))
    }

    async fn upsert(&self, schedule: &NpcSchedule) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .schedules
            .insert(schedule.npc, schedule.clone());
        Ok(())
    }
}

#[async_trait]
impl AgendaRepo for MemoryBackend {
    async fn create(&self, agenda: &FactionAgenda) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .agendas
            .insert(agenda.id, agenda.clone());
        Ok(())
    }

    async fn list_by_faction(&self, faction: FactionId) -> Result<Vec<FactionAgenda>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .agendas
            .values()
            .filter(|a| a.faction == faction)
            .cloned()
            .collect())
    }

    async fn update(&self, agenda: &FactionAgenda) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        if !state.agendas.contains_key(&agenda.id) {
            return Err(DbError::not_found("agenda", agenda.id));
        }
        state.agendas.insert(agenda.id, agenda.clone());
        Ok(())
    }
}

#[async_trait]
impl WorldEventRepo for MemoryBackend {
    async fn append(&self, event: &WorldEvent) -> Result<(), DbError> {
        self.inner.write().await.world_events.push(event.clone());
        Ok(())
    }

    async fn list_by_session(&self, session: SessionId) -> Result<Vec<WorldEvent>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .world_events
            .iter()
            .filter(|e| e.session == session)
            .cloned()
            .collect())
    }

    async fn list_visible(&self, session: SessionId) -> Result<Vec<WorldEvent>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .world_events
            .iter()
            .filter(|e| e.session == session && e.player_visible)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WorldStateRepo for MemoryBackend {
    async fn get(&self, session: SessionId) -> Result<WorldState, DbError> {
        self.inner
            .read()
            .await
            .world_states
            .get(&session)
            .cloned()
            .ok_or_else(|| DbError::not_found("world state", session))
    }

    async fn upsert(&self, world_state: &WorldState) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .world_states
            .insert(world_state.session, world_state.clone());
        Ok(())
    }
}

#[async_trait]
impl SimulationLogRepo for MemoryBackend {
    async fn create(&self, log: &SimulationLog) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .simulation_logs
            .insert(log.id, log.clone());
        Ok(())
    }

    async fn update(&self, log: &SimulationLog) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        if !state.simulation_logs.contains_key(&log.id) {
            return Err(DbError::not_found("simulation log", log.id));
        }
        state.simulation_logs.insert(log.id, log.clone());
        Ok(())
    }

    async fn list_by_session(&self, session: SessionId) -> Result<Vec<SimulationLog>, DbError> {
        let mut logs: Vec<SimulationLog> = self
            .inner
            .read()
            .await
            .simulation_logs
            .values()
            .filter(|l| l.session == session)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(logs)
    }
}

#[async_trait]
impl SettlementRepo for MemoryBackend {
    async fn create(&self, settlement: &Settlement) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .settlements
            .insert(settlement.id, settlement.clone());
        Ok(())
    }

    async fn get(&self, id: SettlementId) -> Result<Settlement, DbError> {
        self.inner
            .read()
            .await
            .settlements
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("settlement", id))
    }

    async fn list_by_session(&self, session: SessionId) -> Result<Vec<Settlement>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .settlements
            .values()
            .filter(|s| s.session == session)
            .cloned()
            .collect())
    }

    async fn update(&self, settlement: &Settlement) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        if !state.settlements.contains_key(&settlement.id) {
            return Err(DbError::not_found("settlement", settlement.id));
        }
        state.settlements.insert(settlement.id, settlement.clone());
        Ok(())
    }
}

#[async_trait]
impl CultureRepo for MemoryBackend {
    async fn create(&self, culture: &Culture) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .cultures
            .insert(culture.id, culture.clone());
        Ok(())
    }

    async fn list_by_session(&self, session: SessionId) -> Result<Vec<Culture>, DbError> {
        Ok(self
            .inner
            .read()
            .await
            .cultures
            .values()
            .filter(|c| c.session == session)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RefreshTokenRepo for MemoryBackend {
    async fn create(&self, token: &RefreshToken) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .refresh_tokens
            .insert(token.id, token.clone());
        Ok(())
    }

    async fn get_by_hash(&self, token_hash: &str) -> Result<RefreshToken, DbError> {
        self.inner
            .read()
            .await
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned()
            .ok_or_else(|| DbError::not_found("refresh token", token_hash))
    }

    async fn revoke(&self, id: RefreshTokenId) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        let token = state
            .refresh_tokens
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("refresh token", id))?;
        token.revoked = true;
        Ok(())
    }

    async fn revoke_all_for_user(&self, user: UserId) -> Result<(), DbError> {
        let mut state = self.inner.write().await;
        for token in state.refresh_tokens.values_mut() {
            if token.user == user {
                token.revoked = true;
            }
        }
        Ok(())
    }

    async fn purge_expired(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, DbError> {
        let mut state = self.inner.write().await;
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, t| t.expires_at > now);
        Ok(before.saturating_sub(state.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl ClassRepo for MemoryBackend {
    async fn create(&self, class: &CharacterClass) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .classes
            .insert(class.id, class.clone());
        Ok(())
    }

    async fn get(&self, id: ClassId) -> Result<CharacterClass, DbError> {
        self.inner
            .read()
            .await
            .classes
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("class", id))
    }
}

#[async_trait]
impl EncounterRepo for MemoryBackend {
    async fn create(&self, encounter: &Encounter) -> Result<(), DbError> {
        self.inner
            .write()
            .await
            .encounters
            .insert(encounter.id, encounter.clone());
        Ok(())
    }

    async fn get(&self, id: EncounterId) -> Result<Encounter, DbError> {
        self.inner
            .read()
            .await
            .encounters
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("encounter", id))
    }
}
