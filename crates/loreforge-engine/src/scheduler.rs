//! Periodic per-session simulation scheduling.
//!
//! Each pass lists the active sessions and advances them one at a time
//! -- sequential on purpose, since concurrent steps for the same
//! session must be serialized and the per-step cost is bounded by the
//! simulator's own gating. Shutdown is cooperative via the cancellation
//! token, which also aborts a step between its sub-simulations.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use loreforge_db::SessionRepo;
use loreforge_sim::{SimError, WorldSimulator};

use crate::subscribers::Analytics;

/// Run scheduler passes until the token is cancelled.
pub async fn run(
    simulator: Arc<WorldSimulator>,
    sessions: Arc<dyn SessionRepo>,
    analytics: Arc<Analytics>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip straight to waiting.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("scheduler shutting down");
                return;
            }
            _ = ticker.tick() => {
                pass(&simulator, &sessions, &analytics, &shutdown).await;
            }
        }
    }
}

/// One pass over every active session.
async fn pass(
    simulator: &WorldSimulator,
    sessions: &Arc<dyn SessionRepo>,
    analytics: &Analytics,
    shutdown: &CancellationToken,
) {
    let active = match sessions.list_active().await {
        Ok(active) => active,
        Err(e) => {
            warn!(error = %e, "could not list active sessions");
            return;
        }
    };

    for session in &active {
        match simulator.simulate_world_progress(shutdown, session.id).await {
            Ok(report) if report.skipped => {}
            Ok(report) => {
                info!(
                    session = %session.id,
                    events = report.events_created,
                    success = report.success,
                    "session advanced"
                );
            }
            Err(SimError::Cancelled) => {
                info!(session = %session.id, "simulation cancelled mid-pass");
                return;
            }
            Err(e) => {
                warn!(session = %session.id, error = %e, "simulation step failed");
            }
        }
    }

    info!(
        sessions = active.len(),
        world_events_total = analytics.world_events(),
        "scheduler pass complete"
    );
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};

    use loreforge_db::{MemoryBackend, WorldStateRepo};
    use loreforge_events::EventBus;
    use loreforge_llm::{LlmClient, MockClient};
    use loreforge_sim::SimDeps;
    use loreforge_types::{
        Clock, FixedClock, Session, SessionId, SessionStatus, UserId, WorldState,
    };

    use super::*;

    fn instant() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap_or_default()
    }

    fn active_session() -> Session {
        Session {
            id: SessionId::new(),
            name: String::from("Night Watch"),
            code: String::from("NW0001"),
            referee: UserId::new(),
            status: SessionStatus::Active,
            is_active: true,
            is_public: true,
            requires_invite: false,
            max_players: 6,
            max_character_level: None,
            state: std::collections::BTreeMap::new(),
            created_at: instant(),
        }
    }

    #[tokio::test]
    async fn a_pass_advances_stale_active_sessions() {
        let backend = MemoryBackend::new();
        let session = active_session();
        loreforge_db::SessionRepo::create(&backend, &session)
            .await
            .ok();
        WorldStateRepo::upsert(
            &backend,
            &WorldState {
                session: session.id,
                last_simulated: instant() - TimeDelta::days(2),
                data: std::collections::BTreeMap::new(),
            },
        )
        .await
        .ok();

        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(instant()));
        let bus = Arc::new(EventBus::new());
        let deps = SimDeps::with_backend(
            &backend,
            Arc::new(LlmClient::Mock(MockClient::returning("Quiet days."))),
            Arc::clone(&bus),
            clock,
        );
        let simulator = WorldSimulator::with_seed(deps, 99);
        let sessions: Arc<dyn SessionRepo> = Arc::new(backend.clone());
        let analytics = Arc::new(Analytics::default());

        pass(
            &simulator,
            &sessions,
            &analytics,
            &CancellationToken::new(),
        )
        .await;

        // The watermark moved, so a second pass is a no-op.
        let state = WorldStateRepo::get(&backend, session.id).await.ok();
        assert_eq!(state.map(|s| s.last_simulated), Some(instant()));
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let backend = MemoryBackend::new();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(instant()));
        let deps = SimDeps::with_backend(
            &backend,
            Arc::new(LlmClient::Mock(MockClient::returning("{}"))),
            Arc::new(EventBus::new()),
            clock,
        );
        let simulator = Arc::new(WorldSimulator::with_seed(deps, 1));
        let sessions: Arc<dyn SessionRepo> = Arc::new(backend.clone());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        // Returns promptly because the token is already cancelled.
        run(
            simulator,
            sessions,
            Arc::new(Analytics::default()),
            Duration::from_secs(3600),
            shutdown,
        )
        .await;
    }
}
