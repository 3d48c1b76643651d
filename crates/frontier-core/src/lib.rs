//! Pathfinding, scheduling, and the tick cycle for the Frontier simulation.
//!
//! This crate owns the authoritative tick step: apply queued ownership
//! transfers, then advance every in-flight path search by a bounded budget.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter with checked advancement.
//! - [`config`] -- Configuration loading from `frontier-config.yaml` into
//!   strongly-typed structs.
//! - [`pathfinder`] -- [`PathRequest`], a resumable A*-style search.
//! - [`scheduler`] -- [`PathScheduler`], fair per-tick budgeting across
//!   many searches.
//! - [`tick`] -- [`SimulationState`] and the tick cycle.
//! - [`runner`] -- Async loop around the tick cycle with stop conditions.

pub mod clock;
pub mod config;
pub mod pathfinder;
pub mod runner;
pub mod scheduler;
pub mod tick;

pub use clock::{ClockError, TickClock};
pub use config::{ConfigError, SimulationConfig};
pub use pathfinder::{DEFAULT_STEP_COST, PathRequest};
pub use runner::{
    NoOpCallback, RunControl, RunnerError, SimulationEndReason, SimulationResult, TickCallback,
    log_simulation_end, run_simulation,
};
pub use scheduler::{
    BudgetPolicy, DEFAULT_RESULT_LIMIT, PathCompletion, PathScheduler, SchedulerError,
};
pub use tick::{CoreError, SimulationState, TickError, TickSummary, run_tick};
