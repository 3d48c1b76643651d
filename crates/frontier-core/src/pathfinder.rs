//! Resumable best-first search over the spatial grid.
//!
//! A [`PathRequest`] holds the complete state of one A*-style search:
//! frontier, best-known costs, predecessor links, and status. Each call to
//! [`PathRequest::advance`] performs at most `budget` frontier pops and then
//! returns, so many searches can share a fixed per-tick work allowance. No
//! state lives on the stack between calls.
//!
//! Traversal rules:
//!
//! - A neighbour is expanded only if it is water or is the destination, so
//!   routes cross open water and may end on land.
//! - Entering a tile costs `step_cost - magnitude`, clamped at zero. Deeper
//!   water is cheaper, which pulls routes away from the coast.
//! - The heuristic is Manhattan distance with the horizontal component
//!   measured around the cylinder. With the magnitude discount it can
//!   overestimate, so routes are good but not guaranteed shortest.
//!   Because the distance wraps, routes near the east/west seam can differ
//!   from those of a search using plain, unwrapped Manhattan distance.
//!
//! The frontier is a `BTreeSet` keyed by `(estimate, insertion sequence,
//! cell)`. Equal estimates are served first-in first-out, which makes the
//! resulting paths a pure function of the grid, the endpoints, and the
//! budget sequence.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;

use frontier_types::{Cell, PathStatus};
use frontier_world::{SpatialGrid, WorldError};

/// Default base cost of entering a tile before the magnitude discount.
pub const DEFAULT_STEP_COST: u64 = 100;

/// One frontier entry. Field order is the priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FrontierEntry {
    estimate: u64,
    sequence: u64,
    cell: Cell,
}

/// State of one in-flight or finished search.
#[derive(Debug, Clone)]
pub struct PathRequest {
    source: Cell,
    destination: Cell,
    step_cost: u64,
    frontier: BTreeSet<FrontierEntry>,
    next_sequence: u64,
    came_from: BTreeMap<Cell, Cell>,
    cost_so_far: BTreeMap<Cell, u64>,
    last_dequeued: Option<Cell>,
    expanded: u64,
    status: PathStatus,
}

impl PathRequest {
    /// Start a search from `source` to `destination`.
    ///
    /// The source is seeded with cost 0. Neither endpoint needs to be
    /// water.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] if either endpoint lies outside
    /// the grid.
    pub fn new(
        grid: &SpatialGrid,
        source: Cell,
        destination: Cell,
        step_cost: u64,
    ) -> Result<Self, WorldError> {
        let source = grid.check(source)?;
        let destination = grid.check(destination)?;

        let mut request = Self {
            source,
            destination,
            step_cost,
            frontier: BTreeSet::new(),
            next_sequence: 0,
            came_from: BTreeMap::new(),
            cost_so_far: BTreeMap::new(),
            last_dequeued: None,
            expanded: 0,
            status: PathStatus::Running,
        };
        request.cost_so_far.insert(source, 0);
        let estimate = grid.wrapped_manhattan(source, destination);
        request.push(source, estimate);
        Ok(request)
    }

    /// Perform up to `budget` frontier pops.
    ///
    /// Returns [`PathStatus::Succeeded`] once the destination is dequeued,
    /// [`PathStatus::Exhausted`] once the frontier runs dry, and
    /// [`PathStatus::Running`] if the budget ran out first. A finished
    /// request returns its stored status without touching any state.
    ///
    /// `grid` must be the grid the request was created against.
    pub fn advance(&mut self, grid: &SpatialGrid, budget: NonZeroU32) -> PathStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        for _ in 0..budget.get() {
            let Some(entry) = self.frontier.pop_first() else {
                self.status = PathStatus::Exhausted;
                return self.status;
            };
            let current = entry.cell;
            self.last_dequeued = Some(current);

            let Some(&current_cost) = self.cost_so_far.get(&current) else {
                continue;
            };
            let heuristic = grid.wrapped_manhattan(current, self.destination);
            if entry.estimate != current_cost.saturating_add(heuristic) {
                // Superseded by a cheaper entry for the same cell.
                continue;
            }

            if current == self.destination {
                self.status = PathStatus::Succeeded;
                return self.status;
            }

            self.expanded = self.expanded.saturating_add(1);
            self.expand(grid, current, current_cost);
        }

        if self.frontier.is_empty() {
            self.status = PathStatus::Exhausted;
        }
        self.status
    }

    fn expand(&mut self, grid: &SpatialGrid, current: Cell, current_cost: u64) {
        for neighbor in grid.neighbors(current).unwrap_or_default() {
            let Ok(tile) = grid.tile(neighbor) else {
                continue;
            };
            if !tile.is_water() && neighbor != self.destination {
                continue;
            }

            let entry_cost = self.step_cost.saturating_sub(u64::from(tile.magnitude()));
            let tentative = current_cost.saturating_add(entry_cost);
            let improves = self
                .cost_so_far
                .get(&neighbor)
                .is_none_or(|&existing| tentative < existing);
            if !improves {
                continue;
            }

            self.cost_so_far.insert(neighbor, tentative);
            self.came_from.insert(neighbor, current);
            let estimate =
                tentative.saturating_add(grid.wrapped_manhattan(neighbor, self.destination));
            self.push(neighbor, estimate);
        }
    }

    fn push(&mut self, cell: Cell, estimate: u64) {
        self.frontier.insert(FrontierEntry {
            estimate,
            sequence: self.next_sequence,
            cell,
        });
        self.next_sequence = self.next_sequence.saturating_add(1);
    }

    /// The route from source to destination, inclusive of both ends.
    ///
    /// `None` unless the search has succeeded.
    pub fn path(&self) -> Option<Vec<Cell>> {
        if self.status != PathStatus::Succeeded {
            return None;
        }

        let mut path = vec![self.destination];
        let mut current = self.destination;
        // Predecessor chains are acyclic; the bound only guards a corrupted map.
        for _ in 0..=self.came_from.len() {
            if current == self.source {
                path.reverse();
                return Some(path);
            }
            current = *self.came_from.get(&current)?;
            path.push(current);
        }
        None
    }

    /// Current status.
    pub const fn status(&self) -> PathStatus {
        self.status
    }

    /// Start of the route.
    pub const fn source(&self) -> Cell {
        self.source
    }

    /// End of the route.
    pub const fn destination(&self) -> Cell {
        self.destination
    }

    /// Best accumulated cost recorded so far for `cell`, if visited.
    pub fn best_cost(&self, cell: Cell) -> Option<u64> {
        self.cost_so_far.get(&cell).copied()
    }

    /// All visited cells with their best accumulated costs, in cell order.
    pub fn best_costs(&self) -> impl Iterator<Item = (Cell, u64)> + '_ {
        self.cost_so_far.iter().map(|(&cell, &cost)| (cell, cost))
    }

    /// Number of cells expanded (non-stale pops other than the final one).
    pub const fn expanded(&self) -> u64 {
        self.expanded
    }

    /// Number of entries waiting in the frontier, stale ones included.
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// The cell most recently taken off the frontier.
    pub const fn last_dequeued(&self) -> Option<Cell> {
        self.last_dequeued
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use frontier_types::TileInfo;

    use super::*;

    fn budget(steps: u32) -> NonZeroU32 {
        NonZeroU32::new(steps).unwrap()
    }

    fn run_to_end(request: &mut PathRequest, grid: &SpatialGrid, steps: u32) -> u32 {
        let mut calls = 0_u32;
        while !request.advance(grid, budget(steps)).is_terminal() {
            calls = calls.saturating_add(1);
            assert!(calls < 10_000, "search did not terminate");
        }
        calls
    }

    fn is_connected(grid: &SpatialGrid, path: &[Cell]) -> bool {
        path.windows(2).all(|pair| match pair {
            [from, to] => grid.neighbors(*from).unwrap().contains(to),
            _ => false,
        })
    }

    #[test]
    fn open_water_route() {
        let grid = SpatialGrid::filled(10, 10, TileInfo::water(0)).unwrap();
        let mut request =
            PathRequest::new(&grid, Cell::new(0, 0), Cell::new(9, 9), DEFAULT_STEP_COST).unwrap();
        assert_eq!(request.status(), PathStatus::Running);
        assert!(request.path().is_none());

        run_to_end(&mut request, &grid, 5);
        assert_eq!(request.status(), PathStatus::Succeeded);

        let path = request.path().unwrap();
        assert_eq!(path.first(), Some(&Cell::new(0, 0)));
        assert_eq!(path.last(), Some(&Cell::new(9, 9)));
        assert!(is_connected(&grid, &path));
    }

    #[test]
    fn wraps_across_the_seam() {
        let grid = SpatialGrid::filled(10, 3, TileInfo::water(0)).unwrap();
        let mut request =
            PathRequest::new(&grid, Cell::new(1, 1), Cell::new(8, 1), DEFAULT_STEP_COST).unwrap();
        run_to_end(&mut request, &grid, 50);

        let path = request.path().unwrap();
        // 1 -> 0 -> 9 -> 8 is shorter than crossing seven columns.
        assert_eq!(
            path,
            vec![Cell::new(1, 1), Cell::new(0, 1), Cell::new(9, 1), Cell::new(8, 1)]
        );
    }

    #[test]
    fn source_equals_destination() {
        let grid = SpatialGrid::filled(4, 4, TileInfo::water(0)).unwrap();
        let cell = Cell::new(2, 2);
        let mut request = PathRequest::new(&grid, cell, cell, DEFAULT_STEP_COST).unwrap();
        assert_eq!(request.advance(&grid, budget(1)), PathStatus::Succeeded);
        assert_eq!(request.path(), Some(vec![cell]));
    }

    #[test]
    fn land_blocks_but_destination_is_enterable() {
        let layout = "\
~~~~~
~###~
~#~#~
~~~~~";
        let grid = SpatialGrid::from_layout(layout).unwrap();
        // Destination is land on the coast.
        let mut request =
            PathRequest::new(&grid, Cell::new(0, 0), Cell::new(2, 1), DEFAULT_STEP_COST).unwrap();
        run_to_end(&mut request, &grid, 8);
        let path = request.path().unwrap();
        let (last, inner) = path.split_last().unwrap();
        assert_eq!(*last, Cell::new(2, 1));
        assert!(inner.iter().all(|&c| grid.is_water(c).unwrap()));
    }

    #[test]
    fn enclosed_destination_is_exhausted() {
        let layout = "\
~~~~~~
~~###~
~~#~#~
~~###~
~~~~~~";
        let grid = SpatialGrid::from_layout(layout).unwrap();
        let mut request =
            PathRequest::new(&grid, Cell::new(0, 0), Cell::new(3, 2), DEFAULT_STEP_COST).unwrap();
        run_to_end(&mut request, &grid, 4);
        assert_eq!(request.status(), PathStatus::Exhausted);
        assert!(request.path().is_none());
        assert_eq!(request.frontier_len(), 0);
    }

    #[test]
    fn terminal_advance_is_idempotent() {
        let grid = SpatialGrid::filled(6, 6, TileInfo::water(0)).unwrap();
        let mut request =
            PathRequest::new(&grid, Cell::new(0, 0), Cell::new(5, 5), DEFAULT_STEP_COST).unwrap();
        run_to_end(&mut request, &grid, 3);

        let path = request.path();
        let expanded = request.expanded();
        let frontier = request.frontier_len();
        let last = request.last_dequeued();
        for _ in 0..5 {
            assert_eq!(request.advance(&grid, budget(100)), PathStatus::Succeeded);
        }
        assert_eq!(request.path(), path);
        assert_eq!(request.expanded(), expanded);
        assert_eq!(request.frontier_len(), frontier);
        assert_eq!(request.last_dequeued(), last);
    }

    #[test]
    fn budget_bounds_work_per_call() {
        let grid = SpatialGrid::filled(20, 20, TileInfo::water(0)).unwrap();
        let mut request =
            PathRequest::new(&grid, Cell::new(0, 0), Cell::new(19, 19), DEFAULT_STEP_COST)
                .unwrap();
        assert_eq!(request.advance(&grid, budget(1)), PathStatus::Running);
        assert_eq!(request.expanded(), 1);
        assert_eq!(request.last_dequeued(), Some(Cell::new(0, 0)));
        assert_eq!(request.advance(&grid, budget(3)), PathStatus::Running);
        assert!(request.expanded() <= 4);
    }

    #[test]
    fn deep_water_is_preferred() {
        // Row 0 is shallow, row 2 is deep; both connect the endpoints.
        // The land columns at the edges close the seam.
        let layout = "\
#~~~~~~~#
#~#####~#
#9999999#";
        let grid = SpatialGrid::from_layout(layout).unwrap();
        let mut request =
            PathRequest::new(&grid, Cell::new(1, 1), Cell::new(7, 1), DEFAULT_STEP_COST).unwrap();
        run_to_end(&mut request, &grid, 16);
        let path = request.path().unwrap();
        assert!(path.contains(&Cell::new(4, 2)));
        assert!(!path.contains(&Cell::new(4, 0)));
    }

    #[test]
    fn magnitude_above_step_cost_clamps_to_zero() {
        let grid = SpatialGrid::filled(5, 1, TileInfo::water(200)).unwrap();
        let mut request =
            PathRequest::new(&grid, Cell::new(0, 0), Cell::new(2, 0), DEFAULT_STEP_COST).unwrap();
        run_to_end(&mut request, &grid, 10);
        assert_eq!(request.best_cost(Cell::new(2, 0)), Some(0));
        assert!(request.path().is_some());
    }

    #[test]
    fn rejects_off_grid_endpoints() {
        let grid = SpatialGrid::filled(4, 4, TileInfo::water(0)).unwrap();
        let err = PathRequest::new(&grid, Cell::new(4, 0), Cell::new(0, 0), DEFAULT_STEP_COST);
        assert!(matches!(err, Err(WorldError::InvalidCell { .. })));
        let err = PathRequest::new(&grid, Cell::new(0, 0), Cell::new(0, 4), DEFAULT_STEP_COST);
        assert!(matches!(err, Err(WorldError::InvalidCell { .. })));
    }

    #[test]
    fn best_costs_never_increase() {
        let grid = SpatialGrid::from_layout(
            "\
~~~~~~~~
~1234~~~
~~##~~5~
~~~~~~~~",
        )
        .unwrap();
        let mut request =
            PathRequest::new(&grid, Cell::new(0, 0), Cell::new(7, 3), DEFAULT_STEP_COST).unwrap();

        let mut previous: BTreeMap<Cell, u64> = BTreeMap::new();
        loop {
            let status = request.advance(&grid, budget(2));
            for (cell, cost) in request.best_costs() {
                if let Some(&before) = previous.get(&cell) {
                    assert!(cost <= before, "cost of {cell} rose from {before} to {cost}");
                }
                previous.insert(cell, cost);
            }
            if status.is_terminal() {
                break;
            }
        }
        assert_eq!(request.status(), PathStatus::Succeeded);
    }
}
