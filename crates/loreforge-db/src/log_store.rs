//! `PostgreSQL` store for simulation step logs.
//!
//! A log row is opened at the start of each simulation step and closed
//! (end time, counts, success flag) when the step finishes. Kept for
//! post-hoc analysis of what the living world did between play sessions.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use loreforge_types::{SessionId, SimulationLog, SimulationLogId};

use crate::error::DbError;
use crate::repos::SimulationLogRepo;

/// Operations on the `simulation_logs` table.
#[derive(Debug, Clone)]
pub struct PgSimulationLogStore {
    pool: PgPool,
}

impl PgSimulationLogStore {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A row from the `simulation_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SimulationLogRow {
    id: Uuid,
    session_id: Uuid,
    started_at: chrono::DateTime<chrono::Utc>,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
    events_created: i64,
    details: serde_json::Value,
    success: bool,
}

impl SimulationLogRow {
    fn into_log(self) -> Result<SimulationLog, DbError> {
        Ok(SimulationLog {
            id: SimulationLogId::from(self.id),
            session: SessionId::from(self.session_id),
            started_at: self.started_at,
            ended_at: self.ended_at,
            events_created: u32::try_from(self.events_created).unwrap_or(u32::MAX),
            details: serde_json::from_value(self.details)?,
            success: self.success,
        })
    }
}

#[async_trait]
impl SimulationLogRepo for PgSimulationLogStore {
    async fn create(&self, log: &SimulationLog) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO simulation_logs
                  (id, session_id, started_at, ended_at, events_created, details, success)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(log.id.into_inner())
        .bind(log.session.into_inner())
        .bind(log.started_at)
        .bind(log.ended_at)
        .bind(i64::from(log.events_created))
        .bind(serde_json::to_value(&log.details)?)
        .bind(log.success)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, log: &SimulationLog) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE simulation_logs
              SET ended_at = $2, events_created = $3, details = $4, success = $5
              WHERE id = $1",
        )
        .bind(log.id.into_inner())
        .bind(log.ended_at)
        .bind(i64::from(log.events_created))
        .bind(serde_json::to_value(&log.details)?)
        .bind(log.success)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("simulation log", log.id));
        }
        Ok(())
    }

    async fn list_by_session(&self, session: SessionId) -> Result<Vec<SimulationLog>, DbError> {
        let rows = sqlx::query_as::<_, SimulationLogRow>(
            r"SELECT id, session_id, started_at, ended_at, events_created, details, success
              FROM simulation_logs
              WHERE session_id = $1
              ORDER BY started_at DESC",
        )
        .bind(session.into_inner())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SimulationLogRow::into_log).collect()
    }
}
