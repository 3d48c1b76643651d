//! Engine binary for the Frontier simulation.
//!
//! Wires together terrain generation, player seeding, demo path requests,
//! and the tick loop, then runs until a stop condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `frontier-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Generate the world from the seed
//! 4. Seed players and queue their starting territory
//! 5. Submit demo path requests
//! 6. Run the simulation loop (Ctrl-C requests a clean stop)
//! 7. Log the result

mod error;
mod report;
mod spawner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use frontier_core::config::SimulationConfig;
use frontier_core::{PathScheduler, RunControl, SimulationState, TickClock, runner};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::report::{ReportCallback, TransferCounter};
use crate::spawner::Spawner;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "frontier-config.yaml";

/// Ticks between territory census log lines.
const CENSUS_EVERY_TICKS: u64 = 50;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, loaded_from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config)?;
    info!("frontier-engine starting");
    if !loaded_from_file {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        world_name = %config.world.name,
        seed = config.world.seed,
        width = config.world.width,
        height = config.world.height,
        tick_interval_ms = config.world.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Generate the world.
    let grid = frontier_world::generate(&config.world.terrain())?;
    info!(
        tiles = grid.len(),
        land = grid.land_count(),
        "World generated"
    );

    let mut state = SimulationState::new(
        grid,
        TickClock::new(config.world.tick_interval_ms),
        PathScheduler::new(config.pathfinding.budget, config.pathfinding.step_cost)
            .with_result_limit(config.pathfinding.result_limit),
    );
    let transfers = TransferCounter::default();
    state.subscribe_ownership(Box::new(transfers.clone()));

    // 4. Seed players.
    let mut spawner = Spawner::new(config.world.seed);
    let players = spawner.spawn_players(&mut state, &config.population)?;
    info!(players = players.len(), "Players seeded");

    // 5. Submit demo path requests.
    let mut routes = config.demo.routes.clone();
    routes.extend(spawner.random_water_routes(state.grid(), config.demo.random_routes));
    for route in &routes {
        match state.submit_path_request(route.from, route.to) {
            Ok(id) => info!(%id, from = %route.from, to = %route.to, "Route requested"),
            Err(err) => warn!(from = %route.from, to = %route.to, error = %err, "Route rejected"),
        }
    }

    // 6. Run the simulation.
    let control = Arc::new(RunControl::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    spawn_ctrl_c_handler(Arc::clone(&control));

    let mut callback = ReportCallback::new(CENSUS_EVERY_TICKS);
    info!(
        live_requests = state.scheduler().live_count(),
        pending_transfers = state.pending_transfer_count(),
        "Simulation state assembled, entering tick loop"
    );
    let result = runner::run_simulation(&mut state, &control, &mut callback).await?;

    // 7. Log results.
    runner::log_simulation_end(&result);
    callback.log_totals(&state);
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        transfers = transfers.transfers(),
        changed_hands = transfers.changed_hands(),
        audit = ?state.ledger().verify_single_ownership(),
        "frontier-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration. A missing file yields defaults
/// (with environment overrides still applied).
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &SimulationConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log filter {:?}: {e}", config.logging.level),
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: format!("{e}"),
    })
}

/// Request a clean stop on Ctrl-C.
fn spawn_ctrl_c_handler(control: Arc<RunControl>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after the current tick");
                control.request_stop();
            }
            Err(err) => warn!(error = %err, "Failed to listen for Ctrl-C"),
        }
    });
}
