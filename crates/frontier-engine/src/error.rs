//! Error types for the Frontier engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and the run so
//! that `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: frontier_core::ConfigError,
    },

    /// World generation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: frontier_world::WorldError,
    },

    /// A core API call failed (player registration, path submission).
    #[error("core error: {source}")]
    Core {
        /// The underlying core error.
        #[from]
        source: frontier_core::CoreError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: frontier_core::RunnerError,
    },

    /// Logging could not be initialised.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },

    /// Player seeding failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}
