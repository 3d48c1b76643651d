//! Configuration loading and typed config structures for the Frontier
//! simulation.
//!
//! The canonical configuration lives in `frontier-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure and a loader that reads the file. Every section and field
//! has a default, so an empty document is a valid configuration.

use std::path::Path;

use frontier_types::Cell;
use frontier_world::TerrainConfig;
use serde::Deserialize;

use crate::pathfinder::DEFAULT_STEP_COST;
use crate::scheduler::{BudgetPolicy, DEFAULT_RESULT_LIMIT};

/// Environment variable that overrides `world.seed`.
pub const SEED_ENV_VAR: &str = "FRONTIER_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `frontier-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Map size, generation parameters, and tick pacing.
    #[serde(default)]
    pub world: WorldConfig,

    /// Search cost and per-tick work allowance.
    #[serde(default)]
    pub pathfinding: PathfindingConfig,

    /// Players seeded at start.
    #[serde(default)]
    pub population: PopulationConfig,

    /// When the run ends.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Sample routes submitted by the engine.
    #[serde(default)]
    pub demo: DemoConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `FRONTIER_SEED`, when set to an integer, overrides `world.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        let value = std::env::var(SEED_ENV_VAR).ok();
        self.apply_seed_override(value.as_deref());
    }

    /// Replace `world.seed` with `value` if it parses as `u64`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_seed_override(&mut self, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        match raw.trim().parse::<u64>() {
            Ok(seed) => self.world.seed = seed,
            Err(err) => {
                tracing::warn!(value = raw, error = %err, "Ignoring invalid {SEED_ENV_VAR}");
            }
        }
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for terrain and player placement.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Map width in tiles.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Map height in tiles.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Share of tiles that are land, in percent.
    #[serde(default = "default_land_percent")]
    pub land_percent: u8,

    /// Cap on water depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,

    /// Continent scale in tiles.
    #[serde(default = "default_feature_size")]
    pub feature_size: u32,

    /// Real-time milliseconds between ticks (0 = as fast as possible).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl WorldConfig {
    /// Terrain generator parameters for this world.
    pub const fn terrain(&self) -> TerrainConfig {
        TerrainConfig {
            width: self.width,
            height: self.height,
            seed: self.seed,
            land_percent: self.land_percent,
            max_depth: self.max_depth,
            feature_size: self.feature_size,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            width: default_width(),
            height: default_height(),
            land_percent: default_land_percent(),
            max_depth: default_max_depth(),
            feature_size: default_feature_size(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Pathfinding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathfindingConfig {
    /// Base cost of entering a tile before the magnitude discount.
    #[serde(default = "default_step_cost")]
    pub step_cost: u64,

    /// Per-tick work allowance.
    #[serde(default)]
    pub budget: BudgetPolicy,

    /// Finished results kept until collected; the oldest go first.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            step_cost: default_step_cost(),
            budget: BudgetPolicy::default(),
            result_limit: default_result_limit(),
        }
    }
}

/// Population configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopulationConfig {
    /// Number of players to seed.
    #[serde(default = "default_players")]
    pub players: u32,

    /// Radius (Manhattan, wrapped) of the starting territory claimed
    /// around each spawn tile.
    #[serde(default = "default_start_radius")]
    pub start_radius: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            players: default_players(),
            start_radius: default_start_radius(),
        }
    }
}

/// Simulation boundary configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of ticks before the run ends (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// End the run once no path request is in flight and no transfer is
    /// queued.
    #[serde(default)]
    pub stop_when_idle: bool,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            stop_when_idle: false,
        }
    }
}

/// A fixed route to request at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DemoRoute {
    /// Start cell.
    pub from: Cell,
    /// End cell.
    pub to: Cell,
}

/// Sample path requests the engine submits after seeding players.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DemoConfig {
    /// Explicit routes.
    #[serde(default)]
    pub routes: Vec<DemoRoute>,

    /// Additional routes between randomly chosen water tiles.
    #[serde(default)]
    pub random_routes: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Frontier".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_width() -> u32 {
    200
}

const fn default_height() -> u32 {
    100
}

const fn default_land_percent() -> u8 {
    40
}

const fn default_max_depth() -> u8 {
    30
}

const fn default_feature_size() -> u32 {
    16
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_step_cost() -> u64 {
    DEFAULT_STEP_COST
}

const fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

const fn default_players() -> u32 {
    4
}

const fn default_start_radius() -> u32 {
    2
}

const fn default_max_ticks() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_owned()
}
