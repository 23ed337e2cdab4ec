//! Typed game events distributed over the in-process bus.
//!
//! Every event exposes a string type tag (the bus routing key), a
//! timestamp, and a JSON payload. Concrete variants add typed fields on
//! top of that contract. Subscribers must not assume shared mutable
//! state with publishers; anything they mutate goes through the
//! repository interfaces.

use chrono::{DateTime, Utc};
use serde_json::json;

use loreforge_types::{CharacterId, FactionId, SessionId, UserId, WorldEvent};

/// Canonical event type tags, `namespace:action` style.
///
/// Subscribers register against these constants; free-form strings are
/// reserved for the `world:event:<type>` family emitted by the
/// simulator.
pub mod topic {
    /// A session has been created.
    pub const SESSION_CREATED: &str = "session:created";
    /// A player joined a session.
    pub const PLAYER_JOINED: &str = "session:player_joined";
    /// A player left (or was removed from) a session.
    pub const PLAYER_LEFT: &str = "session:player_left";
    /// A combat encounter has started.
    pub const COMBAT_STARTED: &str = "combat:started";
    /// A combat encounter has ended.
    pub const COMBAT_ENDED: &str = "combat:ended";
    /// A character gained a level.
    pub const CHARACTER_LEVELED: &str = "character:leveled";
    /// The standing between two factions changed.
    pub const FACTION_RELATION_CHANGED: &str = "faction:relation_changed";
    /// The simulator persisted a world event.
    pub const WORLD_EVENT_RECORDED: &str = "world:event_recorded";

    /// All canonical tags, for iteration and validation.
    pub const ALL: &[&str] = &[
        SESSION_CREATED,
        PLAYER_JOINED,
        PLAYER_LEFT,
        COMBAT_STARTED,
        COMBAT_ENDED,
        CHARACTER_LEVELED,
        FACTION_RELATION_CHANGED,
        WORLD_EVENT_RECORDED,
    ];
}

/// Something that happened, distributable over the bus.
pub trait GameEvent: Send + Sync {
    /// Routing key for subscriber lookup.
    fn event_type(&self) -> &str;
    /// When the event occurred.
    fn timestamp(&self) -> DateTime<Utc>;
    /// JSON payload for untyped consumers (audit, analytics).
    fn data(&self) -> serde_json::Value;
}

// ---------------------------------------------------------------------------
// Session lifecycle events
// ---------------------------------------------------------------------------

/// A session was created.
#[derive(Debug, Clone)]
pub struct SessionCreated {
    /// The new session.
    pub session: SessionId,
    /// The session's display name.
    pub name: String,
    /// The refereeing user.
    pub referee: UserId,
    /// When the session was created.
    pub at: DateTime<Utc>,
}

impl GameEvent for SessionCreated {
    fn event_type(&self) -> &str {
        topic::SESSION_CREATED
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn data(&self) -> serde_json::Value {
        json!({
            "session": self.session,
            "name": self.name,
            "referee": self.referee,
        })
    }
}

/// A player joined a session.
#[derive(Debug, Clone)]
pub struct PlayerJoined {
    /// The session joined.
    pub session: SessionId,
    /// The joining user.
    pub user: UserId,
    /// The character brought along, if any.
    pub character: Option<CharacterId>,
    /// When the join happened.
    pub at: DateTime<Utc>,
}

impl GameEvent for PlayerJoined {
    fn event_type(&self) -> &str {
        topic::PLAYER_JOINED
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn data(&self) -> serde_json::Value {
        json!({
            "session": self.session,
            "user": self.user,
            "character": self.character,
        })
    }
}

/// A player left a session, voluntarily or by referee action.
#[derive(Debug, Clone)]
pub struct PlayerLeft {
    /// The session left.
    pub session: SessionId,
    /// The departing user.
    pub user: UserId,
    /// True when the referee removed the player.
    pub kicked: bool,
    /// When the departure happened.
    pub at: DateTime<Utc>,
}

impl GameEvent for PlayerLeft {
    fn event_type(&self) -> &str {
        topic::PLAYER_LEFT
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn data(&self) -> serde_json::Value {
        json!({
            "session": self.session,
            "user": self.user,
            "kicked": self.kicked,
        })
    }
}

// ---------------------------------------------------------------------------
// Play events
// ---------------------------------------------------------------------------

/// A combat encounter began.
#[derive(Debug, Clone)]
pub struct CombatStarted {
    /// The session in combat.
    pub session: SessionId,
    /// Label of the encounter, if known.
    pub encounter: Option<String>,
    /// When combat started.
    pub at: DateTime<Utc>,
}

impl GameEvent for CombatStarted {
    fn event_type(&self) -> &str {
        topic::COMBAT_STARTED
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn data(&self) -> serde_json::Value {
        json!({
            "session": self.session,
            "encounter": self.encounter,
        })
    }
}

/// A combat encounter finished.
#[derive(Debug, Clone)]
pub struct CombatEnded {
    /// The session that was in combat.
    pub session: SessionId,
    /// Whether the party prevailed.
    pub victory: bool,
    /// When combat ended.
    pub at: DateTime<Utc>,
}

impl GameEvent for CombatEnded {
    fn event_type(&self) -> &str {
        topic::COMBAT_ENDED
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn data(&self) -> serde_json::Value {
        json!({
            "session": self.session,
            "victory": self.victory,
        })
    }
}

/// A character gained a level.
#[derive(Debug, Clone)]
pub struct CharacterLeveled {
    /// The session the character plays in.
    pub session: SessionId,
    /// The character that leveled.
    pub character: CharacterId,
    /// The level reached.
    pub new_level: u32,
    /// When the level-up happened.
    pub at: DateTime<Utc>,
}

impl GameEvent for CharacterLeveled {
    fn event_type(&self) -> &str {
        topic::CHARACTER_LEVELED
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn data(&self) -> serde_json::Value {
        json!({
            "session": self.session,
            "character": self.character,
            "new_level": self.new_level,
        })
    }
}

// ---------------------------------------------------------------------------
// Faction and world events
// ---------------------------------------------------------------------------

/// The standing between two factions changed.
#[derive(Debug, Clone)]
pub struct FactionRelationChanged {
    /// The session both factions belong to.
    pub session: SessionId,
    /// The faction whose relation map changed.
    pub faction: FactionId,
    /// The other side of the relation.
    pub other: FactionId,
    /// Signed change applied to the standing.
    pub delta: i32,
    /// Resulting standing in `[-100, 100]`.
    pub standing: i32,
    /// When the change happened.
    pub at: DateTime<Utc>,
}

impl GameEvent for FactionRelationChanged {
    fn event_type(&self) -> &str {
        topic::FACTION_RELATION_CHANGED
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn data(&self) -> serde_json::Value {
        json!({
            "session": self.session,
            "faction": self.faction,
            "other": self.other,
            "delta": self.delta,
            "standing": self.standing,
        })
    }
}

/// The simulator persisted a world event; republished for subscribers
/// (analytics, audit, presence) that do not poll the repository.
#[derive(Debug, Clone)]
pub struct WorldEventRecorded {
    /// The persisted world event.
    pub event: WorldEvent,
}

impl GameEvent for WorldEventRecorded {
    fn event_type(&self) -> &str {
        topic::WORLD_EVENT_RECORDED
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.event.occurred_at
    }

    fn data(&self) -> serde_json::Value {
        serde_json::to_value(&self.event).unwrap_or_else(|_| json!(null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap_or_default()
    }

    #[test]
    fn topics_follow_namespace_pattern() {
        for tag in topic::ALL {
            assert!(tag.contains(':'), "tag {tag} lacks a namespace");
        }
    }

    #[test]
    fn topics_have_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for tag in topic::ALL {
            assert!(seen.insert(tag), "duplicate tag {tag}");
        }
    }

    #[test]
    fn session_created_carries_payload() {
        let event = SessionCreated {
            session: SessionId::new(),
            name: String::from("The Sunken Vault"),
            referee: UserId::new(),
            at: now(),
        };
        assert_eq!(event.event_type(), topic::SESSION_CREATED);
        assert_eq!(event.timestamp(), now());
        let data = event.data();
        assert_eq!(
            data.get("name").and_then(serde_json::Value::as_str),
            Some("The Sunken Vault")
        );
    }

    #[test]
    fn relation_changed_payload_has_both_sides() {
        let event = FactionRelationChanged {
            session: SessionId::new(),
            faction: FactionId::new(),
            other: FactionId::new(),
            delta: -12,
            standing: -40,
            at: now(),
        };
        let data = event.data();
        assert_eq!(
            data.get("delta").and_then(serde_json::Value::as_i64),
            Some(-12)
        );
        assert_eq!(
            data.get("standing").and_then(serde_json::Value::as_i64),
            Some(-40)
        );
    }
}
