//! `PostgreSQL` store for per-session world state watermarks.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use loreforge_types::{SessionId, WorldState};

use crate::error::DbError;
use crate::repos::WorldStateRepo;

/// Operations on the `world_states` table.
#[derive(Debug, Clone)]
pub struct PgWorldStateStore {
    pool: PgPool,
}

impl PgWorldStateStore {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A row from the `world_states` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct WorldStateRow {
    session_id: Uuid,
    last_simulated: chrono::DateTime<chrono::Utc>,
    data: serde_json::Value,
}

#[async_trait]
impl WorldStateRepo for PgWorldStateStore {
    async fn get(&self, session: SessionId) -> Result<WorldState, DbError> {
        let row = sqlx::query_as::<_, WorldStateRow>(
            r"SELECT session_id, last_simulated, data
              FROM world_states
              WHERE session_id = $1",
        )
        .bind(session.into_inner())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("world state", session))?;

        Ok(WorldState {
            session: SessionId::from(row.session_id),
            last_simulated: row.last_simulated,
            data: serde_json::from_value(row.data)?,
        })
    }

    async fn upsert(&self, state: &WorldState) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO world_states (session_id, last_simulated, data)
              VALUES ($1, $2, $3)
              ON CONFLICT (session_id)
              DO UPDATE SET last_simulated = EXCLUDED.last_simulated,
                            data = EXCLUDED.data",
        )
        .bind(state.session.into_inner())
        .bind(state.last_simulated)
        .bind(serde_json::to_value(&state.data)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
