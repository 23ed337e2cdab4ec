//! World Engine binary for the Loreforge game backend.
//!
//! Wires together the stores, the LLM gateway, the event bus, and the
//! living-world simulator, then runs the per-session simulation
//! scheduler until interrupted. The HTTP layer is a separate deployable
//! and not hosted here.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `loreforge-config.yaml` (defaults when
//!    the file is missing)
//! 3. Construct the LLM gateway from configuration
//! 4. Select stores: in-memory, with `PostgreSQL` for the durable
//!    aggregates when a database URL is configured
//! 5. Create the event bus and attach the audit/analytics subscribers
//! 6. Assemble the simulator
//! 7. Run the scheduler loop until ctrl-c

mod config;
mod error;
mod scheduler;
mod subscribers;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use loreforge_db::{
    MemoryBackend, PgSimulationLogStore, PgWorldEventStore, PgWorldStateStore, PostgresPool,
    SessionRepo, SimulationLogRepo, WorldEventRepo, WorldStateRepo,
};
use loreforge_events::EventBus;
use loreforge_llm::LlmClient;
use loreforge_sim::{SimDeps, WorldSimulator};
use loreforge_types::{Clock, SystemClock};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::subscribers::register_default_subscribers;

/// Application entry point for the World Engine.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("loreforge-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        llm_backend = ?config.llm.provider,
        interval_secs = config.simulation_interval_secs,
        durable_store = config.database_url.is_some(),
        "Configuration loaded"
    );

    // 3. Construct the LLM gateway.
    let llm = Arc::new(LlmClient::from_config(&config.llm)?);
    info!(backend = llm.name(), "LLM gateway ready");

    // 4. Select stores. The in-memory backend covers every aggregate;
    //    the append-heavy ones move to PostgreSQL when configured.
    let backend = MemoryBackend::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bus = Arc::new(EventBus::new());

    let mut deps = SimDeps::with_backend(&backend, Arc::clone(&llm), Arc::clone(&bus), clock);
    if let Some(url) = &config.database_url {
        let pool = PostgresPool::connect_url(url).await?;
        deps.world_events =
            Arc::new(PgWorldEventStore::new(pool.pool().clone())) as Arc<dyn WorldEventRepo>;
        deps.world_state =
            Arc::new(PgWorldStateStore::new(pool.pool().clone())) as Arc<dyn WorldStateRepo>;
        deps.sim_logs = Arc::new(PgSimulationLogStore::new(pool.pool().clone()))
            as Arc<dyn SimulationLogRepo>;
        info!("Durable stores attached");
    }

    // 5. Attach the default subscribers.
    let analytics = register_default_subscribers(&bus);
    info!("Event bus subscribers registered");

    // 6. Assemble the simulator.
    let simulator = Arc::new(WorldSimulator::new(deps));
    let sessions: Arc<dyn SessionRepo> = Arc::new(backend.clone());

    // 7. Run the scheduler until ctrl-c.
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    scheduler::run(
        simulator,
        sessions,
        analytics,
        Duration::from_secs(config.simulation_interval_secs),
        shutdown,
    )
    .await;

    info!("loreforge-engine shutdown complete");
    Ok(())
}

/// Load the engine configuration from `loreforge-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<EngineConfig, EngineError> {
    let config_path = Path::new("loreforge-config.yaml");
    if config_path.exists() {
        EngineConfig::from_file(config_path)
    } else {
        info!("Config file not found, using defaults");
        Ok(EngineConfig::default())
    }
}
