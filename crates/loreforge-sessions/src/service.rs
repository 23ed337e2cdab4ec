//! The session orchestrator.
//!
//! Holds the authoritative rules for session lifecycle, capacity,
//! authorization, and presence. Every mutation re-reads membership and
//! capacity before writing; the repository's unique constraints (join
//! code, participant tuple) backstop races, and any precondition
//! violation aborts before persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use loreforge_db::{CharacterRepo, DbError, ParticipantRepo, SessionRepo};
use loreforge_events::{EventBus, PlayerJoined, PlayerLeft, SessionCreated};
use loreforge_types::{
    CharacterId, Clock, Participant, Session, SessionId, SessionStatus, UserId,
};

use crate::code::{generate_join_code, is_valid_code};
use crate::error::SessionError;

/// Default seat count (including the referee).
const DEFAULT_MAX_PLAYERS: u32 = 6;

/// Seat count bounds (including the referee).
const MIN_PLAYERS: u32 = 2;
const MAX_PLAYERS: u32 = 10;

/// How many times code issuance retries on a collision.
const CODE_ATTEMPTS: u32 = 5;

/// A request to create a session.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    /// Human-readable session name.
    pub name: String,
    /// The refereeing user.
    pub referee: UserId,
    /// Whether the session is listed publicly.
    pub is_public: bool,
    /// Total seats including the referee; defaults to 6.
    pub max_players: Option<u32>,
    /// Optional cap on character levels at the table.
    pub max_character_level: Option<u32>,
    /// Join code to use; issued from OS entropy when absent.
    pub code: Option<String>,
}

/// Orchestrates session lifecycle, membership, and presence.
pub struct SessionService {
    sessions: Arc<dyn SessionRepo>,
    participants: Arc<dyn ParticipantRepo>,
    characters: Arc<dyn CharacterRepo>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    /// Create a service over the given collaborators.
    pub fn new(
        sessions: Arc<dyn SessionRepo>,
        participants: Arc<dyn ParticipantRepo>,
        characters: Arc<dyn CharacterRepo>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            participants,
            characters,
            bus,
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a session and seat the referee.
    pub async fn create(&self, request: &CreateSessionRequest) -> Result<Session, SessionError> {
        if request.name.trim().is_empty() {
            return Err(SessionError::InvalidInput(String::from(
                "session name is required",
            )));
        }
        if request.referee.into_inner().is_nil() {
            return Err(SessionError::InvalidInput(String::from(
                "referee is required",
            )));
        }
        let max_players = request.max_players.unwrap_or(DEFAULT_MAX_PLAYERS);
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
            return Err(SessionError::InvalidInput(format!(
                "max players must be between {MIN_PLAYERS} and {MAX_PLAYERS}, got {max_players}"
            )));
        }
        if let Some(code) = &request.code
            && !is_valid_code(code)
        {
            return Err(SessionError::InvalidInput(String::from(
                "join code must be six characters A-Z0-9",
            )));
        }

        let now = self.clock.now();
        let mut session = Session {
            id: SessionId::new(),
            name: request.name.trim().to_owned(),
            code: match &request.code {
                Some(code) => code.clone(),
                None => generate_join_code()?,
            },
            referee: request.referee,
            status: SessionStatus::Pending,
            is_active: true,
            is_public: request.is_public,
            requires_invite: !request.is_public,
            max_players,
            max_character_level: request.max_character_level,
            state: BTreeMap::new(),
            created_at: now,
        };

        // The repository enforces code uniqueness; regenerate and retry
        // on collision (only for codes we issued ourselves).
        let mut attempt: u32 = 0;
        loop {
            match self.sessions.create(&session).await {
                Ok(()) => break,
                Err(DbError::Conflict { .. }) => {
                    if request.code.is_some() {
                        return Err(SessionError::InvalidInput(String::from(
                            "join code already in use",
                        )));
                    }
                    attempt += 1;
                    if attempt >= CODE_ATTEMPTS {
                        return Err(SessionError::Repository(DbError::conflict(
                            "could not issue a unique join code",
                        )));
                    }
                    session.code = generate_join_code()?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.participants
            .add(&Participant {
                user: request.referee,
                session: session.id,
                character: None,
                is_online: false,
                joined_at: now,
            })
            .await?;

        self.bus.publish(Arc::new(SessionCreated {
            session: session.id,
            name: session.name.clone(),
            referee: session.referee,
            at: now,
        }));
        info!(session = %session.id, name = session.name, "session created");
        Ok(session)
    }

    /// Fetch a session by id.
    pub async fn get(&self, id: SessionId) -> Result<Session, SessionError> {
        Ok(self.sessions.get(id).await?)
    }

    /// Fetch a joinable session by its code (completed sessions have
    /// released theirs).
    pub async fn get_by_code(&self, code: &str) -> Result<Session, SessionError> {
        Ok(self.sessions.get_by_code(code).await?)
    }

    /// Sessions refereed by a user.
    pub async fn list_by_referee(&self, user: UserId) -> Result<Vec<Session>, SessionError> {
        Ok(self.sessions.list_by_referee(user).await?)
    }

    /// Sessions a user participates in.
    pub async fn list_by_participant(&self, user: UserId) -> Result<Vec<Session>, SessionError> {
        Ok(self.sessions.list_by_participant(user).await?)
    }

    /// Update a session, preserving its referee and creation time.
    ///
    /// Status changes must follow the monotonic
    /// `pending -> active -> completed` order.
    pub async fn update(&self, updated: &Session) -> Result<Session, SessionError> {
        let original = self.sessions.get(updated.id).await?;

        if updated.name.trim().is_empty() {
            return Err(SessionError::InvalidInput(String::from(
                "session name is required",
            )));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&updated.max_players) {
            return Err(SessionError::InvalidInput(format!(
                "max players must be between {MIN_PLAYERS} and {MAX_PLAYERS}, got {}",
                updated.max_players
            )));
        }
        if !original.status.can_transition_to(updated.status) {
            return Err(SessionError::InvalidInput(format!(
                "session status cannot move from {:?} back to {:?}",
                original.status, updated.status
            )));
        }

        let mut preserved = updated.clone();
        preserved.referee = original.referee;
        preserved.created_at = original.created_at;
        self.sessions.update(&preserved).await?;
        Ok(preserved)
    }

    /// Delete a session and its participation records.
    pub async fn delete(&self, id: SessionId) -> Result<(), SessionError> {
        Ok(self.sessions.delete(id).await?)
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Join a session, optionally bringing a character.
    pub async fn join(
        &self,
        session_id: SessionId,
        user: UserId,
        character: Option<CharacterId>,
    ) -> Result<Participant, SessionError> {
        let session = self.sessions.get(session_id).await?;

        if session.status == SessionStatus::Completed {
            return Err(SessionError::Forbidden(String::from(
                "session has already ended",
            )));
        }
        if session.status == SessionStatus::Active && !session.is_active {
            return Err(SessionError::Forbidden(String::from(
                "session is locked by the referee",
            )));
        }
        if self.participants.get(session_id, user).await.is_ok() {
            return Err(SessionError::AlreadyJoined);
        }

        // Re-read membership right before mutating; the repository's
        // unique constraint backstops the race.
        let roster = self.participants.list(session_id).await?;
        let non_referee = roster
            .iter()
            .filter(|p| p.user != session.referee)
            .count() as u32;
        if non_referee >= session.player_capacity() {
            return Err(SessionError::Full {
                max: session.player_capacity(),
            });
        }

        if let Some(character_id) = character {
            let sheet = self.characters.get(character_id).await.map_err(|e| {
                if e.is_not_found() {
                    SessionError::InvalidInput(String::from("character not found"))
                } else {
                    SessionError::Repository(e)
                }
            })?;
            if sheet.owner != user {
                return Err(SessionError::Forbidden(String::from(
                    "character does not belong to you",
                )));
            }
            if let Some(cap) = session.max_character_level
                && sheet.level > cap
            {
                return Err(SessionError::InvalidInput(format!(
                    "character level {} exceeds the session limit of {cap}",
                    sheet.level
                )));
            }
        }

        let participant = Participant {
            user,
            session: session_id,
            character,
            is_online: false,
            joined_at: self.clock.now(),
        };
        match self.participants.add(&participant).await {
            Ok(()) => {}
            Err(DbError::Conflict { .. }) => return Err(SessionError::AlreadyJoined),
            Err(e) => return Err(e.into()),
        }

        self.bus.publish(Arc::new(PlayerJoined {
            session: session_id,
            user,
            character,
            at: participant.joined_at,
        }));
        Ok(participant)
    }

    /// Leave a session. The referee cannot leave.
    pub async fn leave(&self, session_id: SessionId, user: UserId) -> Result<(), SessionError> {
        let session = self.sessions.get(session_id).await?;
        if session.referee == user {
            return Err(SessionError::Forbidden(String::from(
                "the referee cannot leave the session",
            )));
        }
        self.remove_participant(session_id, user, false).await
    }

    /// Remove a player by referee action. The referee cannot be kicked.
    pub async fn kick(&self, session_id: SessionId, target: UserId) -> Result<(), SessionError> {
        let session = self.sessions.get(session_id).await?;
        if session.referee == target {
            return Err(SessionError::Forbidden(String::from(
                "the referee cannot be kicked",
            )));
        }
        // Kicking someone who is not at the table is a caller error.
        if self.participants.get(session_id, target).await.is_err() {
            return Err(SessionError::Forbidden(String::from(
                "user is not in this session",
            )));
        }
        self.remove_participant(session_id, target, true).await
    }

    async fn remove_participant(
        &self,
        session_id: SessionId,
        user: UserId,
        kicked: bool,
    ) -> Result<(), SessionError> {
        self.participants
            .remove(session_id, user)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    SessionError::Forbidden(String::from("user is not in this session"))
                } else {
                    SessionError::Repository(e)
                }
            })?;
        self.bus.publish(Arc::new(PlayerLeft {
            session: session_id,
            user,
            kicked,
            at: self.clock.now(),
        }));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Presence and authorization
    // -----------------------------------------------------------------------

    /// Flip a participant's live-presence flag.
    pub async fn set_presence(
        &self,
        session_id: SessionId,
        user: UserId,
        online: bool,
    ) -> Result<(), SessionError> {
        self.participants
            .set_online(session_id, user, online)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    SessionError::Forbidden(String::from("user is not in this session"))
                } else {
                    SessionError::Repository(e)
                }
            })
    }

    /// Whether a user belongs to a session (as referee or player).
    pub async fn validate_in_session(
        &self,
        session_id: SessionId,
        user: UserId,
    ) -> Result<bool, SessionError> {
        let session = self.sessions.get(session_id).await?;
        if session.referee == user {
            return Ok(true);
        }
        match self.participants.get(session_id, user).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
