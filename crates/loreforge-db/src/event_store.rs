//! `PostgreSQL` store for the append-only world event history.
//!
//! World events are the source of truth for what happened in a session.
//! Every simulation step appends its events here in emission order; UI
//! collaborators poll this table for player-visible history.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use loreforge_types::{SessionId, WorldEvent, WorldEventId};

use crate::error::DbError;
use crate::repos::WorldEventRepo;

/// Operations on the `world_events` table.
#[derive(Debug, Clone)]
pub struct PgWorldEventStore {
    pool: PgPool,
}

impl PgWorldEventStore {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A row from the `world_events` table.
///
/// Uses runtime types rather than compile-time checked types to avoid
/// requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
struct WorldEventRow {
    id: Uuid,
    session_id: Uuid,
    event_type: String,
    title: String,
    description: String,
    impact: serde_json::Value,
    affected_entities: serde_json::Value,
    player_visible: bool,
    occurred_at: chrono::DateTime<chrono::Utc>,
    consequences: serde_json::Value,
}

impl WorldEventRow {
    fn into_event(self) -> Result<WorldEvent, DbError> {
        Ok(WorldEvent {
            id: WorldEventId::from(self.id),
            session: SessionId::from(self.session_id),
            event_type: self.event_type,
            title: self.title,
            description: self.description,
            impact: serde_json::from_value(self.impact)?,
            affected_entities: serde_json::from_value(self.affected_entities)?,
            player_visible: self.player_visible,
            occurred_at: self.occurred_at,
            consequences: serde_json::from_value(self.consequences)?,
        })
    }
}

#[async_trait]
impl WorldEventRepo for PgWorldEventStore {
    async fn append(&self, event: &WorldEvent) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO world_events
                  (id, session_id, event_type, title, description, impact,
                   affected_entities, player_visible, occurred_at, consequences)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(event.id.into_inner())
        .bind(event.session.into_inner())
        .bind(&event.event_type)
        .bind(&event.title)
        .bind(&event.description)
        .bind(serde_json::to_value(&event.impact)?)
        .bind(serde_json::to_value(&event.affected_entities)?)
        .bind(event.player_visible)
        .bind(event.occurred_at)
        .bind(serde_json::to_value(&event.consequences)?)
        .execute(&self.pool)
        .await?;

        tracing::debug!(event_type = event.event_type, "Inserted world event");
        Ok(())
    }

    async fn list_by_session(&self, session: SessionId) -> Result<Vec<WorldEvent>, DbError> {
        let rows = sqlx::query_as::<_, WorldEventRow>(
            r"SELECT id, session_id, event_type, title, description, impact,
                     affected_entities, player_visible, occurred_at, consequences
              FROM world_events
              WHERE session_id = $1
              ORDER BY occurred_at, id",
        )
        .bind(session.into_inner())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorldEventRow::into_event).collect()
    }

    async fn list_visible(&self, session: SessionId) -> Result<Vec<WorldEvent>, DbError> {
        let rows = sqlx::query_as::<_, WorldEventRow>(
            r"SELECT id, session_id, event_type, title, description, impact,
                     affected_entities, player_visible, occurred_at, consequences
              FROM world_events
              WHERE session_id = $1 AND player_visible
              ORDER BY occurred_at, id",
        )
        .bind(session.into_inner())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorldEventRow::into_event).collect()
    }
}
