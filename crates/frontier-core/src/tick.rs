//! Tick cycle: the authoritative step that drives the Frontier simulation.
//!
//! [`SimulationState`] is the only writer of the grid, the ownership
//! ledger, and the path scheduler. Callers interact with it through a small
//! API (submit/poll/cancel path requests, query owners and adjacency, queue
//! ownership transfers) and advance it with [`run_tick`], which runs these
//! phases in order:
//!
//! 1. **Clock** -- advance the tick counter.
//! 2. **Territory** -- apply queued ownership transfers in submission
//!    order. Observers are notified after each committed transfer. A
//!    transfer that fails validation is logged and skipped.
//! 3. **Pathfinding** -- advance every live path request by its budget and
//!    retire the finished ones.
//!
//! Given the same initial state and the same sequence of calls, the tick
//! cycle is deterministic.

use std::collections::VecDeque;

use frontier_types::{Cell, Owner, PathPoll, PathRequestId, Player};
use frontier_world::{OwnershipLedger, OwnershipObserver, SpatialGrid, WorldError};
use tracing::{info, warn};

use crate::clock::{ClockError, TickClock};
use crate::scheduler::{BudgetPolicy, PathCompletion, PathScheduler, SchedulerError};

/// Errors returned by the query and submission API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A grid or ledger operation failed (bad cell, unknown player).
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A scheduler operation failed (unknown request, ids exhausted).
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        source: SchedulerError,
    },
}

impl From<SchedulerError> for CoreError {
    fn from(source: SchedulerError) -> Self {
        match source {
            SchedulerError::World(source) => Self::World { source },
            other => Self::Scheduler { source: other },
        }
    }
}

/// Errors that abort a tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Transfers committed to the ledger.
    pub transfers_applied: usize,
    /// Transfers dropped because they failed validation.
    pub transfers_rejected: usize,
    /// Path requests that finished this tick, in issue order.
    pub completions: Vec<PathCompletion>,
    /// Path requests still searching after this tick.
    pub live_requests: usize,
}

#[derive(Debug, Clone, Copy)]
struct PendingTransfer {
    cell: Cell,
    owner: Owner,
}

/// The mutable simulation state passed through the tick cycle.
#[derive(Debug)]
pub struct SimulationState {
    clock: TickClock,
    grid: SpatialGrid,
    ledger: OwnershipLedger,
    scheduler: PathScheduler,
    pending_transfers: VecDeque<PendingTransfer>,
}

impl SimulationState {
    /// Wrap a grid with an all-unclaimed ledger and an empty scheduler.
    pub fn new(grid: SpatialGrid, clock: TickClock, scheduler: PathScheduler) -> Self {
        let ledger = OwnershipLedger::new(&grid);
        Self {
            clock,
            grid,
            ledger,
            scheduler,
            pending_transfers: VecDeque::new(),
        }
    }

    /// Convenience constructor with default clock pacing.
    pub fn with_policy(grid: SpatialGrid, policy: BudgetPolicy, step_cost: u64) -> Self {
        Self::new(grid, TickClock::default(), PathScheduler::new(policy, step_cost))
    }

    // -------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------

    /// The immutable map.
    pub const fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// The ownership ledger.
    pub const fn ledger(&self) -> &OwnershipLedger {
        &self.ledger
    }

    /// The path scheduler.
    pub const fn scheduler(&self) -> &PathScheduler {
        &self.scheduler
    }

    /// The tick clock.
    pub const fn clock(&self) -> &TickClock {
        &self.clock
    }

    /// Number of transfers waiting for the next tick.
    pub fn pending_transfer_count(&self) -> usize {
        self.pending_transfers.len()
    }

    /// Whether there is no outstanding work: no live searches and no
    /// queued transfers.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle() && self.pending_transfers.is_empty()
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Current owner of `cell`.
    pub fn query_owner(&self, cell: Cell) -> Result<Owner, CoreError> {
        Ok(self.ledger.owner_of(cell)?)
    }

    /// Orthogonal neighbours of `cell`, x wrapping.
    pub fn query_adjacency(&self, cell: Cell) -> Result<Vec<Cell>, CoreError> {
        Ok(self.grid.neighbors(cell)?)
    }

    // -------------------------------------------------------------------
    // Path requests
    // -------------------------------------------------------------------

    /// Start a search. It is first advanced on the next tick.
    pub fn submit_path_request(
        &mut self,
        source: Cell,
        destination: Cell,
    ) -> Result<PathRequestId, CoreError> {
        Ok(self.scheduler.submit(&self.grid, source, destination)?)
    }

    /// Current outcome of a search.
    pub fn poll_path_request(&self, id: PathRequestId) -> Result<PathPoll, CoreError> {
        Ok(self.scheduler.poll(id)?)
    }

    /// Collect a finished search's outcome, freeing its stored result.
    /// Live searches report [`PathPoll::Pending`].
    pub fn take_path_result(&mut self, id: PathRequestId) -> Result<PathPoll, CoreError> {
        Ok(self.scheduler.take(id)?)
    }

    /// Drop a search or its stored result.
    pub fn cancel_path_request(&mut self, id: PathRequestId) -> bool {
        self.scheduler.cancel(id)
    }

    // -------------------------------------------------------------------
    // Territory
    // -------------------------------------------------------------------

    /// Register a player so it can receive tiles.
    pub fn register_player(&mut self, player: Player) -> Result<(), CoreError> {
        Ok(self.ledger.register_player(player)?)
    }

    /// Queue a transfer for the next tick.
    ///
    /// The cell and the claimant are checked now, so a bad request fails
    /// here rather than inside [`run_tick`]. The ledger checks again when
    /// the transfer is applied.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::World`] wrapping [`WorldError::InvalidCell`] for
    /// an off-grid cell or [`WorldError::UnknownOwner`] for an unregistered
    /// player. Nothing is queued on error.
    pub fn queue_transfer(&mut self, cell: Cell, owner: Owner) -> Result<(), CoreError> {
        self.ledger.check_transfer(cell, owner)?;
        self.pending_transfers.push_back(PendingTransfer { cell, owner });
        Ok(())
    }

    /// Register an observer of committed ownership changes.
    pub fn subscribe_ownership(&mut self, observer: Box<dyn OwnershipObserver + Send>) {
        self.ledger.subscribe(observer);
    }
}

/// Execute one complete tick of the simulation.
///
/// Transfer and search failures are reported in the summary, never as
/// errors; only clock overflow aborts a tick.
pub fn run_tick(state: &mut SimulationState) -> Result<TickSummary, TickError> {
    // --- Phase 1: Clock ---
    let tick = state.clock.advance()?;
    info!(
        tick,
        pending_transfers = state.pending_transfers.len(),
        live_requests = state.scheduler.live_count(),
        "Tick started"
    );

    // --- Phase 2: Territory ---
    let (transfers_applied, transfers_rejected) = phase_territory(state, tick);

    // --- Phase 3: Pathfinding ---
    let completions = state.scheduler.step(&state.grid);
    let live_requests = state.scheduler.live_count();

    let summary = TickSummary {
        tick,
        transfers_applied,
        transfers_rejected,
        completions,
        live_requests,
    };
    info!(
        tick,
        transfers_applied,
        transfers_rejected,
        completed = summary.completions.len(),
        live_requests,
        "Tick finished"
    );
    Ok(summary)
}

/// Phase 2: drain the transfer queue into the ledger.
fn phase_territory(state: &mut SimulationState, tick: u64) -> (usize, usize) {
    let mut applied: usize = 0;
    let mut rejected: usize = 0;

    while let Some(PendingTransfer { cell, owner }) = state.pending_transfers.pop_front() {
        match state.ledger.transfer(cell, owner) {
            Ok(_) => applied = applied.saturating_add(1),
            Err(err) => {
                rejected = rejected.saturating_add(1);
                warn!(tick, %cell, %owner, error = %err, "Transfer rejected");
            }
        }
    }

    (applied, rejected)
}
