//! The simulation step: gating, phase orchestration, persistence, and
//! logging.
//!
//! One call to [`WorldSimulator::simulate_world_progress`] advances a
//! session's world by the wall-clock time elapsed since the last step.
//! Five sub-simulations run in a fixed order -- NPC activities, economic
//! changes, political developments, natural events, cultural evolution
//! -- each collecting world events and reporting into the step's log.
//! A failing sub-simulation is recorded and the next one still runs;
//! only a failed world-state update fails the step itself.
//!
//! Two concurrent steps for the same session must be serialized by the
//! caller; the engine does not guard against double entry beyond
//! observing `last_simulated` as an advisory floor.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use loreforge_db::{
    AgendaRepo, CultureRepo, FactionRepo, MemoryBackend, NpcGoalRepo, NpcRepo, NpcScheduleRepo,
    PersonalityRepo, SettlementRepo, SimulationLogRepo, WorldEventRepo, WorldStateRepo,
};
use loreforge_events::{EventBus, WorldEventRecorded};
use loreforge_llm::LlmClient;
use loreforge_types::{
    Clock, SessionId, SimulationLog, SimulationLogId, WorldEvent, WorldState,
};

use crate::error::SimError;
use crate::{culture, economy, nature, npc, politics};

/// Minimum elapsed time before a step does any work.
fn min_elapsed() -> TimeDelta {
    TimeDelta::hours(1)
}

/// Everything the simulator needs to reach the world.
pub struct SimDeps {
    /// NPCs of the session.
    pub npcs: Arc<dyn NpcRepo>,
    /// NPC goals.
    pub goals: Arc<dyn NpcGoalRepo>,
    /// NPC daily routines.
    pub schedules: Arc<dyn NpcScheduleRepo>,
    /// Factions.
    pub factions: Arc<dyn FactionRepo>,
    /// Faction personalities (agenda pacing reads traits).
    pub personalities: Arc<dyn PersonalityRepo>,
    /// Faction agendas.
    pub agendas: Arc<dyn AgendaRepo>,
    /// Settlements.
    pub settlements: Arc<dyn SettlementRepo>,
    /// Cultures.
    pub cultures: Arc<dyn CultureRepo>,
    /// Append-only world event history.
    pub world_events: Arc<dyn WorldEventRepo>,
    /// Per-session simulation watermark.
    pub world_state: Arc<dyn WorldStateRepo>,
    /// Step logs.
    pub sim_logs: Arc<dyn SimulationLogRepo>,
    /// Gateway for optional narration.
    pub llm: Arc<LlmClient>,
    /// Bus for republishing persisted events.
    pub bus: Arc<EventBus>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl SimDeps {
    /// Wire every repository seam to one shared in-memory backend.
    pub fn with_backend(
        backend: &MemoryBackend,
        llm: Arc<LlmClient>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            npcs: Arc::new(backend.clone()),
            goals: Arc::new(backend.clone()),
            schedules: Arc::new(backend.clone()),
            factions: Arc::new(backend.clone()),
            personalities: Arc::new(backend.clone()),
            agendas: Arc::new(backend.clone()),
            settlements: Arc::new(backend.clone()),
            cultures: Arc::new(backend.clone()),
            world_events: Arc::new(backend.clone()),
            world_state: Arc::new(backend.clone()),
            sim_logs: Arc::new(backend.clone()),
            llm,
            bus,
            clock,
        }
    }
}

/// What one simulation step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    /// True when the step returned immediately (not enough elapsed time).
    pub skipped: bool,
    /// Number of world events persisted.
    pub events_created: u32,
    /// False when event persistence failed partway.
    pub success: bool,
    /// The step log, when one was opened.
    pub log: Option<SimulationLogId>,
}

impl SimulationReport {
    const fn skipped() -> Self {
        Self {
            skipped: true,
            events_created: 0,
            success: true,
            log: None,
        }
    }
}

/// Per-step timing context handed to the sub-simulations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepWindow {
    /// The session being advanced.
    pub session: SessionId,
    /// The step's wall-clock "now".
    pub now: DateTime<Utc>,
    /// Elapsed time since the previous step.
    pub delta: TimeDelta,
}

impl StepWindow {
    /// Elapsed time in fractional days.
    pub fn days(&self) -> f64 {
        self.delta.num_seconds() as f64 / 86_400.0
    }

    /// Elapsed time in fractional weeks.
    pub fn weeks(&self) -> f64 {
        self.days() / 7.0
    }

    /// Elapsed time in fractional months (30-day months).
    pub fn months(&self) -> f64 {
        self.days() / 30.0
    }

    /// Elapsed whole hours, capped for schedule replay.
    pub fn hours_capped(&self, cap: i64) -> i64 {
        self.delta.num_hours().clamp(0, cap)
    }
}

/// Clamp a derived probability into what `random_bool` accepts.
pub(crate) fn chance(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}

/// The living-world simulator.
pub struct WorldSimulator {
    pub(crate) deps: SimDeps,
    rng: Mutex<SmallRng>,
}

impl WorldSimulator {
    /// Create a simulator seeded from entropy.
    pub fn new(deps: SimDeps) -> Self {
        Self {
            deps,
            rng: Mutex::new(SmallRng::from_os_rng()),
        }
    }

    /// Create a simulator with a fixed seed (deterministic tests).
    pub fn with_seed(deps: SimDeps, seed: u64) -> Self {
        Self {
            deps,
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    /// Fork a per-step RNG off the master stream.
    fn fork_rng(&self) -> SmallRng {
        let mut master = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        SmallRng::from_rng(&mut *master)
    }

    /// Advance a session's world by the elapsed wall-clock time.
    ///
    /// Returns immediately when less than an hour has passed since the
    /// previous step. Sub-simulation failures are recorded in the step
    /// log and never abort the step; cancellation is honored between
    /// sub-simulations.
    pub async fn simulate_world_progress(
        &self,
        ctx: &CancellationToken,
        session: SessionId,
    ) -> Result<SimulationReport, SimError> {
        let now = self.deps.clock.now();

        let mut state = match self.deps.world_state.get(session).await {
            Ok(state) => state,
            Err(e) if e.is_not_found() => {
                // First contact with this session: start the clock now.
                let state = WorldState {
                    session,
                    last_simulated: now,
                    data: BTreeMap::new(),
                };
                self.deps.world_state.upsert(&state).await?;
                debug!(%session, "world state initialized, skipping first step");
                return Ok(SimulationReport::skipped());
            }
            Err(e) => return Err(e.into()),
        };

        let delta = now - state.last_simulated;
        if delta < min_elapsed() {
            return Ok(SimulationReport::skipped());
        }

        let mut log = SimulationLog {
            id: SimulationLogId::new(),
            session,
            started_at: now,
            ended_at: None,
            events_created: 0,
            details: BTreeMap::new(),
            success: true,
        };
        self.deps.sim_logs.create(&log).await?;

        let window = StepWindow {
            session,
            now,
            delta,
        };
        let mut rng = self.fork_rng();
        let mut events: Vec<WorldEvent> = Vec::new();

        if ctx.is_cancelled() {
            return Err(SimError::Cancelled);
        }
        let outcome = npc::run(self, ctx, &window, &mut rng, &mut events).await;
        record_phase(&mut log, "npc_activities", outcome)?;

        if ctx.is_cancelled() {
            return Err(SimError::Cancelled);
        }
        let outcome = economy::run(self, &window, &mut rng, &mut events).await;
        record_phase(&mut log, "economic_changes", outcome)?;

        if ctx.is_cancelled() {
            return Err(SimError::Cancelled);
        }
        let outcome = politics::run(self, ctx, &window, &mut rng, &mut events).await;
        record_phase(&mut log, "political_developments", outcome)?;

        if ctx.is_cancelled() {
            return Err(SimError::Cancelled);
        }
        let outcome = nature::run(self, ctx, &window, &mut rng, &mut events).await;
        record_phase(&mut log, "natural_events", outcome)?;

        if ctx.is_cancelled() {
            return Err(SimError::Cancelled);
        }
        let outcome = culture::run(self, &window, &mut rng, &mut events).await;
        record_phase(&mut log, "cultural_evolution", outcome)?;

        // Persist in emission order; a failure marks the step unsuccessful
        // but the remaining events are still attempted.
        for event in &events {
            match self.deps.world_events.append(event).await {
                Ok(()) => {
                    log.events_created = log.events_created.saturating_add(1);
                    self.deps
                        .bus
                        .publish(Arc::new(WorldEventRecorded {
                            event: event.clone(),
                        }));
                }
                Err(e) => {
                    warn!(%session, error = %e, "world event persistence failed");
                    log.success = false;
                }
            }
        }

        state.last_simulated = now;
        self.deps.world_state.upsert(&state).await?;

        log.ended_at = Some(self.deps.clock.now());
        if let Err(e) = self.deps.sim_logs.update(&log).await {
            warn!(%session, error = %e, "simulation log close failed");
        }

        info!(
            %session,
            events = log.events_created,
            success = log.success,
            "world advanced"
        );
        Ok(SimulationReport {
            skipped: false,
            events_created: log.events_created,
            success: log.success,
            log: Some(log.id),
        })
    }
}

/// Fold a sub-simulation outcome into the step log.
///
/// Failures become a recorded error detail and the step continues; only
/// cancellation propagates.
fn record_phase(
    log: &mut SimulationLog,
    phase: &str,
    outcome: Result<serde_json::Value, SimError>,
) -> Result<(), SimError> {
    match outcome {
        Ok(detail) => {
            log.details.insert(phase.to_owned(), detail);
            Ok(())
        }
        Err(SimError::Cancelled) => Err(SimError::Cancelled),
        Err(e) => {
            warn!(session = %log.session, phase, error = %e, "sub-simulation failed, continuing");
            log.details
                .insert(phase.to_owned(), json!({"error": e.to_string()}));
            Ok(())
        }
    }
}
