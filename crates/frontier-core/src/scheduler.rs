//! Fair time-slicing of many path searches within one tick.
//!
//! The scheduler owns every in-flight [`PathRequest`]. Once per tick,
//! [`PathScheduler::step`] advances each live request by a budget derived
//! from the [`BudgetPolicy`], in issue order, and retires the ones that
//! finished.
//!
//! Finished outcomes are kept for delivery. [`PathScheduler::poll`] peeks
//! at one, [`PathScheduler::take`] hands it over and forgets it, and
//! [`PathScheduler::cancel`] discards it. At most `result_limit` outcomes
//! are stored; past that the oldest (lowest id) is dropped, so a caller
//! that never collects results cannot grow the store without bound.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use frontier_types::{Cell, PathPoll, PathRequestId, PathStatus};
use frontier_world::{SpatialGrid, WorldError};
use serde::{Deserialize, Serialize};

use crate::pathfinder::{DEFAULT_STEP_COST, PathRequest};

/// Errors raised by scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The id was never issued, or its result was already cancelled.
    #[error("unknown path request: {0}")]
    UnknownRequest(PathRequestId),

    /// The request counter reached `u64::MAX`.
    #[error("path request ids exhausted")]
    IdsExhausted,

    /// The request named a cell outside the grid.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Default number of undelivered results kept by a scheduler.
pub const DEFAULT_RESULT_LIMIT: usize = 1_024;

/// How the per-tick work allowance is split across live requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum BudgetPolicy {
    /// Every live request gets the same fixed number of pops per tick.
    FixedPerRequest {
        /// Pops per request per tick.
        steps: u32,
    },
    /// A total number of pops per tick, divided evenly among live
    /// requests. Each request gets at least one pop.
    SharedTotal {
        /// Pops per tick across all requests.
        steps: u32,
    },
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self::SharedTotal { steps: 2_000 }
    }
}

impl BudgetPolicy {
    /// Per-request budget for a tick with `live` requests in flight.
    pub fn per_request(self, live: usize) -> NonZeroU32 {
        let steps = match self {
            Self::FixedPerRequest { steps } => steps,
            Self::SharedTotal { steps } => {
                let live = u32::try_from(live).unwrap_or(u32::MAX).max(1);
                steps.checked_div(live).unwrap_or(0)
            }
        };
        NonZeroU32::new(steps).unwrap_or(NonZeroU32::MIN)
    }
}

/// A request that reached a terminal state during [`PathScheduler::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCompletion {
    /// Handle returned by [`PathScheduler::submit`].
    pub id: PathRequestId,
    /// `Succeeded` or `Exhausted`.
    pub status: PathStatus,
    /// The route when `status` is `Succeeded`.
    pub path: Option<Vec<Cell>>,
    /// Cells expanded over the request's lifetime.
    pub expanded: u64,
}

impl PathCompletion {
    /// The outcome as callers see it through [`PathScheduler::poll`].
    pub fn to_poll(&self) -> PathPoll {
        match &self.path {
            Some(path) => PathPoll::Found(path.clone()),
            None => PathPoll::Unreachable,
        }
    }
}

/// Holds live path requests and their finished results.
#[derive(Debug, Clone)]
pub struct PathScheduler {
    policy: BudgetPolicy,
    step_cost: u64,
    result_limit: usize,
    next_id: Option<PathRequestId>,
    live: BTreeMap<PathRequestId, PathRequest>,
    completed: BTreeMap<PathRequestId, PathPoll>,
}

impl Default for PathScheduler {
    fn default() -> Self {
        Self::new(BudgetPolicy::default(), DEFAULT_STEP_COST)
    }
}

impl PathScheduler {
    /// Create an empty scheduler.
    pub const fn new(policy: BudgetPolicy, step_cost: u64) -> Self {
        Self {
            policy,
            step_cost,
            result_limit: DEFAULT_RESULT_LIMIT,
            next_id: Some(PathRequestId::FIRST),
            live: BTreeMap::new(),
            completed: BTreeMap::new(),
        }
    }

    /// Keep at most `limit` undelivered results. A limit of 0 keeps none:
    /// outcomes are then only seen through [`step`](Self::step).
    #[must_use]
    pub const fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    /// The configured budget policy.
    pub const fn policy(&self) -> BudgetPolicy {
        self.policy
    }

    /// Queue a new search. It is first advanced on the next
    /// [`step`](Self::step), after every request submitted before it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::World`] for off-grid endpoints and
    /// [`SchedulerError::IdsExhausted`] once the counter is spent.
    pub fn submit(
        &mut self,
        grid: &SpatialGrid,
        source: Cell,
        destination: Cell,
    ) -> Result<PathRequestId, SchedulerError> {
        let id = self.next_id.ok_or(SchedulerError::IdsExhausted)?;
        let request = PathRequest::new(grid, source, destination, self.step_cost)?;
        self.next_id = id.next();
        self.live.insert(id, request);
        tracing::debug!(%id, %source, %destination, "Path request submitted");
        Ok(id)
    }

    /// Advance every live request once and retire those that finished.
    ///
    /// Requests are visited in issue order. Completions are returned in the
    /// same order.
    pub fn step(&mut self, grid: &SpatialGrid) -> Vec<PathCompletion> {
        let budget = self.policy.per_request(self.live.len());
        let mut finished = Vec::new();

        for (&id, request) in &mut self.live {
            if request.advance(grid, budget).is_terminal() {
                finished.push(id);
            }
        }

        let mut completions = Vec::with_capacity(finished.len());
        for id in finished {
            let Some(request) = self.live.remove(&id) else {
                continue;
            };
            let completion = PathCompletion {
                id,
                status: request.status(),
                path: request.path(),
                expanded: request.expanded(),
            };
            tracing::debug!(
                %id,
                status = ?completion.status,
                expanded = completion.expanded,
                length = completion.path.as_ref().map_or(0, Vec::len),
                "Path request finished"
            );
            self.completed.insert(id, completion.to_poll());
            completions.push(completion);
        }
        self.evict_oldest_results();
        completions
    }

    fn evict_oldest_results(&mut self) {
        while self.completed.len() > self.result_limit {
            let Some((id, _)) = self.completed.pop_first() else {
                break;
            };
            tracing::debug!(%id, limit = self.result_limit, "Undelivered path result dropped");
        }
    }

    /// Current outcome of a request.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownRequest`] if `id` is neither live
    /// nor holds a stored result.
    pub fn poll(&self, id: PathRequestId) -> Result<PathPoll, SchedulerError> {
        if self.live.contains_key(&id) {
            return Ok(PathPoll::Pending);
        }
        self.completed
            .get(&id)
            .cloned()
            .ok_or(SchedulerError::UnknownRequest(id))
    }

    /// Hand over a finished outcome and forget it.
    ///
    /// A live request reports [`PathPoll::Pending`] and stays live. Once a
    /// result has been taken, the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownRequest`] if `id` is neither live
    /// nor holds a stored result.
    pub fn take(&mut self, id: PathRequestId) -> Result<PathPoll, SchedulerError> {
        if self.live.contains_key(&id) {
            return Ok(PathPoll::Pending);
        }
        self.completed
            .remove(&id)
            .ok_or(SchedulerError::UnknownRequest(id))
    }

    /// Drop a live request or a stored result. Returns whether anything
    /// was removed.
    pub fn cancel(&mut self, id: PathRequestId) -> bool {
        let removed = self.live.remove(&id).is_some() || self.completed.remove(&id).is_some();
        if removed {
            tracing::debug!(%id, "Path request cancelled");
        }
        removed
    }

    /// Borrow a live request, e.g. to inspect its progress.
    pub fn request(&self, id: PathRequestId) -> Option<&PathRequest> {
        self.live.get(&id)
    }

    /// Number of requests still searching.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of stored results.
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Whether no request is searching.
    pub fn is_idle(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use frontier_types::TileInfo;

    use super::*;

    fn open_sea(width: u32, height: u32) -> SpatialGrid {
        SpatialGrid::filled(width, height, TileInfo::water(0)).unwrap()
    }

    #[test]
    fn shared_budget_divides_evenly() {
        let policy = BudgetPolicy::SharedTotal { steps: 100 };
        assert_eq!(policy.per_request(0).get(), 100);
        assert_eq!(policy.per_request(4).get(), 25);
        assert_eq!(policy.per_request(1_000).get(), 1);
    }

    #[test]
    fn fixed_budget_ignores_load() {
        let policy = BudgetPolicy::FixedPerRequest { steps: 7 };
        assert_eq!(policy.per_request(1).get(), 7);
        assert_eq!(policy.per_request(50).get(), 7);
        let zero = BudgetPolicy::FixedPerRequest { steps: 0 };
        assert_eq!(zero.per_request(1).get(), 1);
    }

    #[test]
    fn policy_from_yaml() {
        let policy: BudgetPolicy =
            serde_yml::from_str("policy: fixed_per_request\nsteps: 12\n").unwrap();
        assert_eq!(policy, BudgetPolicy::FixedPerRequest { steps: 12 });
    }

    #[test]
    fn ids_are_issued_in_order() {
        let grid = open_sea(8, 8);
        let mut scheduler = PathScheduler::default();
        let a = scheduler.submit(&grid, Cell::new(0, 0), Cell::new(3, 3)).unwrap();
        let b = scheduler.submit(&grid, Cell::new(1, 1), Cell::new(4, 4)).unwrap();
        assert_eq!(a, PathRequestId::FIRST);
        assert!(b > a);
        assert_eq!(scheduler.live_count(), 2);
    }

    #[test]
    fn completes_and_reports_found() {
        let grid = open_sea(10, 10);
        let mut scheduler = PathScheduler::new(BudgetPolicy::FixedPerRequest { steps: 5 }, 100);
        let id = scheduler.submit(&grid, Cell::new(0, 0), Cell::new(9, 9)).unwrap();
        assert_eq!(scheduler.poll(id).unwrap(), PathPoll::Pending);

        let mut completions = Vec::new();
        for _ in 0..200 {
            completions.extend(scheduler.step(&grid));
            if scheduler.is_idle() {
                break;
            }
        }
        assert_eq!(completions.len(), 1);
        assert_eq!(completions.first().map(|c| c.id), Some(id));
        assert_eq!(scheduler.completed_count(), 1);

        let poll = scheduler.poll(id).unwrap();
        assert!(matches!(poll, PathPoll::Found(_)), "expected a route, got {poll:?}");
        if let PathPoll::Found(path) = poll {
            assert_eq!(path.first(), Some(&Cell::new(0, 0)));
            assert_eq!(path.last(), Some(&Cell::new(9, 9)));
        }
    }

    #[test]
    fn unreachable_is_reported() {
        let grid = SpatialGrid::from_layout(
            "\
~~~~~
~###~
~#~#~
~###~",
        )
        .unwrap();
        let mut scheduler = PathScheduler::default();
        let id = scheduler.submit(&grid, Cell::new(0, 0), Cell::new(2, 2)).unwrap();
        let completions = scheduler.step(&grid);
        assert_eq!(completions.len(), 1);
        assert_eq!(scheduler.poll(id).unwrap(), PathPoll::Unreachable);
    }

    #[test]
    fn cancel_drops_live_and_stored() {
        let grid = open_sea(30, 30);
        let mut scheduler = PathScheduler::new(BudgetPolicy::FixedPerRequest { steps: 1 }, 100);
        let slow = scheduler.submit(&grid, Cell::new(0, 0), Cell::new(15, 29)).unwrap();
        let quick = scheduler.submit(&grid, Cell::new(5, 5), Cell::new(5, 5)).unwrap();
        let _ = scheduler.step(&grid);

        assert_eq!(scheduler.poll(slow).unwrap(), PathPoll::Pending);
        assert!(matches!(scheduler.poll(quick).unwrap(), PathPoll::Found(_)));

        assert!(scheduler.cancel(slow));
        assert!(scheduler.cancel(quick));
        assert!(!scheduler.cancel(quick));
        assert_eq!(
            scheduler.poll(slow),
            Err(SchedulerError::UnknownRequest(slow))
        );
        assert_eq!(scheduler.live_count(), 0);
        assert_eq!(scheduler.completed_count(), 0);
    }

    #[test]
    fn take_delivers_once_and_frees_the_result() {
        let grid = open_sea(10, 10);
        let mut scheduler = PathScheduler::new(BudgetPolicy::FixedPerRequest { steps: 200 }, 100);
        let ids: Vec<_> = (0..3)
            .map(|i| scheduler.submit(&grid, Cell::new(i, 0), Cell::new(9, 9)).unwrap())
            .collect();
        assert_eq!(scheduler.take(ids[0]).unwrap(), PathPoll::Pending);
        assert_eq!(scheduler.live_count(), 3);

        let _ = scheduler.step(&grid);
        assert_eq!(scheduler.completed_count(), 3);

        for &id in &ids {
            assert!(matches!(scheduler.take(id).unwrap(), PathPoll::Found(_)));
            assert_eq!(scheduler.take(id), Err(SchedulerError::UnknownRequest(id)));
        }
        assert_eq!(scheduler.completed_count(), 0);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn uncollected_results_are_bounded() {
        let grid = open_sea(10, 10);
        let mut scheduler = PathScheduler::new(BudgetPolicy::FixedPerRequest { steps: 1 }, 100)
            .with_result_limit(5);

        let mut ids = Vec::new();
        for _ in 0..3 {
            for i in 0..4 {
                let cell = Cell::new(i, i);
                ids.push(scheduler.submit(&grid, cell, cell).unwrap());
            }
            let completions = scheduler.step(&grid);
            assert_eq!(completions.len(), 4);
            assert!(scheduler.completed_count() <= 5);
        }
        assert_eq!(scheduler.completed_count(), 5);

        // The oldest results went first.
        let (dropped, kept) = ids.split_at(ids.len() - 5);
        for id in dropped {
            assert_eq!(scheduler.poll(*id), Err(SchedulerError::UnknownRequest(*id)));
        }
        for id in kept {
            assert!(matches!(scheduler.poll(*id).unwrap(), PathPoll::Found(_)));
        }
    }

    #[test]
    fn zero_result_limit_stores_nothing() {
        let grid = open_sea(4, 4);
        let mut scheduler = PathScheduler::default().with_result_limit(0);
        let id = scheduler.submit(&grid, Cell::new(1, 1), Cell::new(1, 1)).unwrap();
        let completions = scheduler.step(&grid);
        assert_eq!(completions.first().map(|c| c.status), Some(PathStatus::Succeeded));
        assert_eq!(scheduler.completed_count(), 0);
        assert!(scheduler.poll(id).is_err());
    }

    #[test]
    fn off_grid_submission_is_rejected() {
        let grid = open_sea(4, 4);
        let mut scheduler = PathScheduler::default();
        let result = scheduler.submit(&grid, Cell::new(0, 0), Cell::new(9, 0));
        assert!(matches!(
            result,
            Err(SchedulerError::World(WorldError::InvalidCell { .. }))
        ));
        assert_eq!(scheduler.live_count(), 0);
        // A rejected submission does not consume an id.
        let id = scheduler.submit(&grid, Cell::new(0, 0), Cell::new(1, 0)).unwrap();
        assert_eq!(id, PathRequestId::FIRST);
    }

    #[test]
    fn unknown_poll_fails() {
        let scheduler = PathScheduler::default();
        assert!(matches!(
            scheduler.poll(PathRequestId(99)),
            Err(SchedulerError::UnknownRequest(_))
        ));
    }
}
