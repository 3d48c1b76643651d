//! End-to-end behaviour of the spatial core: wraparound adjacency, the
//! single-owner ledger, and budgeted pathfinding driven through the tick
//! cycle.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

use frontier_core::{
    BudgetPolicy, DEFAULT_STEP_COST, PathRequest, SimulationState, TickSummary, run_tick,
};
use frontier_types::{Cell, Owner, OwnershipChange, PathPoll, PathStatus, Player, TileInfo};
use frontier_world::{OwnershipAudit, SpatialGrid, TerrainConfig, Tile, generate};

fn budget(steps: u32) -> NonZeroU32 {
    NonZeroU32::new(steps).unwrap()
}

fn open_sea(width: u32, height: u32) -> SpatialGrid {
    SpatialGrid::filled(width, height, TileInfo::water(0)).unwrap()
}

fn tick_until_idle(state: &mut SimulationState, limit: u32) -> Vec<TickSummary> {
    let mut summaries = Vec::new();
    for _ in 0..limit {
        summaries.push(run_tick(state).unwrap());
        if state.is_idle() {
            break;
        }
    }
    summaries
}

// =============================================================================
// Open water, small budget
// =============================================================================

#[test]
fn open_water_route_with_budget_five() {
    let grid = open_sea(10, 10);
    let mut request =
        PathRequest::new(&grid, Cell::new(0, 0), Cell::new(9, 9), DEFAULT_STEP_COST).unwrap();

    let mut calls = 0_u32;
    let mut status = PathStatus::Running;
    while status == PathStatus::Running && calls < 1_000 {
        status = request.advance(&grid, budget(5));
        calls += 1;
    }

    assert_eq!(status, PathStatus::Succeeded);
    // Needs more than one slice of work.
    assert!(calls > 1);
    let path = request.path().unwrap();
    assert_eq!(path[0], Cell::new(0, 0));
    assert_eq!(path[path.len() - 1], Cell::new(9, 9));
    for pair in path.windows(2) {
        assert!(grid.neighbors(pair[0]).unwrap().contains(&pair[1]));
    }
}

// =============================================================================
// Enclosed destination
// =============================================================================

#[test]
fn enclosed_destination_is_unreachable() {
    let grid = SpatialGrid::from_layout(
        "\
~~~~~~~~
~~~###~~
~~~#~#~~
~~~###~~
~~~~~~~~",
    )
    .unwrap();
    let mut state = SimulationState::with_policy(
        grid,
        BudgetPolicy::FixedPerRequest { steps: 3 },
        DEFAULT_STEP_COST,
    );

    let id = state
        .submit_path_request(Cell::new(0, 0), Cell::new(4, 2))
        .unwrap();
    let summaries = tick_until_idle(&mut state, 500);

    let completion = summaries
        .iter()
        .flat_map(|s| s.completions.iter())
        .find(|c| c.id == id)
        .unwrap();
    assert_eq!(completion.status, PathStatus::Exhausted);
    assert!(completion.path.is_none());
    assert_eq!(state.poll_path_request(id).unwrap(), PathPoll::Unreachable);
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn transfer_sequence_never_leaves_a_tile_unowned() {
    let mut state = SimulationState::with_policy(
        open_sea(6, 6),
        BudgetPolicy::default(),
        DEFAULT_STEP_COST,
    );
    let a = Player::new("A");
    let b = Player::new("B");
    let (owner_a, owner_b) = (a.owner(), b.owner());
    state.register_player(a).unwrap();
    state.register_player(b).unwrap();

    let observed: Arc<Mutex<Vec<OwnershipChange>>> = Arc::default();
    let sink = Arc::clone(&observed);
    state.subscribe_ownership(Box::new(move |change: &OwnershipChange| {
        sink.lock().unwrap().push(*change);
    }));

    let cell = Cell::new(3, 3);
    state.queue_transfer(cell, owner_a).unwrap();
    state.queue_transfer(cell, owner_b).unwrap();
    let summary = run_tick(&mut state).unwrap();
    assert_eq!(summary.transfers_applied, 2);

    assert_eq!(state.query_owner(cell).unwrap(), owner_b);
    assert!(!state.ledger().owns_tile(owner_a, cell).unwrap());
    assert_eq!(state.ledger().verify_single_ownership(), OwnershipAudit::Consistent);

    let observed = observed.lock().unwrap();
    let owners: Vec<(Owner, Owner)> = observed.iter().map(|c| (c.previous, c.current)).collect();
    assert_eq!(
        owners,
        vec![(Owner::TerraNullius, owner_a), (owner_a, owner_b)]
    );

    // Every cell has exactly one owner.
    for cell in state.grid().cells() {
        let owner = state.query_owner(cell).unwrap();
        let holders = [Owner::TerraNullius, owner_a, owner_b]
            .into_iter()
            .filter(|&o| state.ledger().owns_tile(o, cell).unwrap())
            .count();
        assert_eq!(holders, 1, "{cell} is held by {holders} owners");
        assert!(state.ledger().owns_tile(owner, cell).unwrap());
    }
}

// =============================================================================
// Wraparound
// =============================================================================

#[test]
fn width_eight_wraps_east_edge() {
    let state = SimulationState::with_policy(
        open_sea(8, 5),
        BudgetPolicy::default(),
        DEFAULT_STEP_COST,
    );
    let neighbors = state.query_adjacency(Cell::new(7, 2)).unwrap();
    assert!(neighbors.contains(&Cell::new(0, 2)));
    assert!(neighbors.contains(&Cell::new(6, 2)));

    let west = state.query_adjacency(Cell::new(0, 2)).unwrap();
    assert!(west.contains(&Cell::new(7, 2)));

    // Rows do not wrap.
    let top = state.query_adjacency(Cell::new(3, 0)).unwrap();
    assert!(top.iter().all(|c| c.y <= 1));
    assert_eq!(top.len(), 3);
    let bottom = state.query_adjacency(Cell::new(3, 4)).unwrap();
    assert!(!bottom.contains(&Cell::new(3, 0)));
}

// =============================================================================
// Search properties
// =============================================================================

#[test]
fn advance_after_termination_changes_nothing() {
    let grid = open_sea(7, 7);
    let mut request =
        PathRequest::new(&grid, Cell::new(1, 1), Cell::new(5, 4), DEFAULT_STEP_COST).unwrap();
    while !request.advance(&grid, budget(2)).is_terminal() {}

    let before = (
        request.status(),
        request.path(),
        request.expanded(),
        request.frontier_len(),
        request.best_costs().collect::<Vec<_>>(),
    );
    for steps in [1, 10, 1_000] {
        assert_eq!(request.advance(&grid, budget(steps)), PathStatus::Succeeded);
    }
    let after = (
        request.status(),
        request.path(),
        request.expanded(),
        request.frontier_len(),
        request.best_costs().collect::<Vec<_>>(),
    );
    assert_eq!(before, after);
}

#[test]
fn recorded_costs_only_improve() {
    let grid = generate(&TerrainConfig {
        width: 40,
        height: 20,
        seed: 11,
        land_percent: 30,
        max_depth: 8,
        feature_size: 6,
    })
    .unwrap();
    let water: Vec<Cell> = grid
        .tiles()
        .filter(|t| t.is_water())
        .map(Tile::cell)
        .collect();
    let source = water[0];
    let destination = water[water.len() - 1];

    let mut request = PathRequest::new(&grid, source, destination, DEFAULT_STEP_COST).unwrap();
    let mut seen: BTreeMap<Cell, u64> = BTreeMap::new();
    let mut rounds = 0_u32;
    loop {
        let status = request.advance(&grid, budget(3));
        for (cell, cost) in request.best_costs() {
            if let Some(previous) = seen.insert(cell, cost) {
                assert!(cost <= previous, "{cell}: {previous} -> {cost}");
            }
        }
        rounds += 1;
        if status.is_terminal() || rounds > 10_000 {
            break;
        }
    }
    assert!(request.status().is_terminal());
}

#[test]
fn identical_inputs_give_identical_paths() {
    let config = TerrainConfig {
        width: 48,
        height: 24,
        seed: 5,
        land_percent: 35,
        max_depth: 10,
        feature_size: 8,
    };
    let run = || {
        let grid = generate(&config).unwrap();
        let mut state = SimulationState::with_policy(
            grid,
            BudgetPolicy::SharedTotal { steps: 30 },
            DEFAULT_STEP_COST,
        );
        let water: Vec<Cell> = state
            .grid()
            .tiles()
            .filter(|t| t.is_water())
            .map(Tile::cell)
            .collect();
        let step = (water.len() / 5).max(1);
        let ids: Vec<_> = (0..4)
            .map(|i| {
                let from = water[i * step];
                let to = water[water.len() - 1 - i * step];
                state.submit_path_request(from, to).unwrap()
            })
            .collect();
        let _ = tick_until_idle(&mut state, 5_000);
        ids.into_iter()
            .map(|id| state.poll_path_request(id).unwrap())
            .collect::<Vec<_>>()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert!(first.iter().all(|p| *p != PathPoll::Pending));
}

#[test]
fn shared_budget_serves_every_request() {
    let mut state = SimulationState::with_policy(
        open_sea(16, 16),
        BudgetPolicy::SharedTotal { steps: 8 },
        DEFAULT_STEP_COST,
    );
    let ids: Vec<_> = (0..4)
        .map(|i| {
            state
                .submit_path_request(Cell::new(i, 0), Cell::new(15 - i, 15))
                .unwrap()
        })
        .collect();

    let _ = run_tick(&mut state).unwrap();
    // Two pops each: every request made progress, none finished yet.
    for id in &ids {
        let request = state.scheduler().request(*id).unwrap();
        assert!(request.last_dequeued().is_some());
        assert!(request.expanded() <= 2);
    }

    let _ = tick_until_idle(&mut state, 2_000);
    for id in ids {
        assert!(matches!(
            state.poll_path_request(id).unwrap(),
            PathPoll::Found(_)
        ));
    }
}
