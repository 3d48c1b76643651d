//! Player spawner for seeding the simulation with initial territory.
//!
//! At simulation start, the spawner registers N players with names drawn
//! from a fixed pool, gives each a home tile on the coast, and queues
//! transfers for every land tile within `start_radius` steps of home. The
//! transfers are applied on the first tick. Starting territories never
//! overlap.
//!
//! All randomness comes from an RNG seeded with the world seed, so a given
//! configuration always produces the same players in the same places.

use std::collections::{BTreeSet, VecDeque};

use frontier_core::SimulationState;
use frontier_core::config::{DemoRoute, PopulationConfig};
use frontier_types::{Cell, Player, PlayerId};
use frontier_world::SpatialGrid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of player names. The spawner picks randomly without
/// replacement from this list.
const NAME_POOL: &[&str] = &[
    "Aldmere", "Brightwater", "Caldera", "Dunmarch", "Eastholm", "Farrow", "Glenhaven",
    "Highcliff", "Ironstrand", "Juniper Isles", "Kestrel Bay", "Lowmoor", "Marrowgate",
    "Northreach", "Oakhollow", "Pinecrest", "Queensfall", "Redshore", "Saltmarsh", "Thornwick",
    "Umberlee", "Valemont", "Westwatch", "Yarrowby",
];

// -----------------------------------------------------------------------
// Spawning result
// -----------------------------------------------------------------------

/// One seeded player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnedPlayer {
    /// Registered identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Coastal home tile.
    pub home: Cell,
    /// Number of tiles queued for transfer, home included.
    pub claimed: usize,
}

/// Seeds players and hands out demo routes from one deterministic RNG.
#[derive(Debug)]
pub struct Spawner {
    rng: StdRng,
}

impl Spawner {
    /// Create a spawner seeded from the world seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Register `config.players` players and queue their starting
    /// territory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Spawner`] if the map has too few free land
    /// tiles, and propagates registration failures.
    pub fn spawn_players(
        &mut self,
        state: &mut SimulationState,
        config: &PopulationConfig,
    ) -> Result<Vec<SpawnedPlayer>, EngineError> {
        let mut candidates = home_candidates(state.grid());
        let mut claimed: BTreeSet<Cell> = BTreeSet::new();
        let mut used_names: BTreeSet<String> = BTreeSet::new();
        let mut spawned = Vec::new();

        for _ in 0..config.players {
            candidates.retain(|cell| !claimed.contains(cell));
            if candidates.is_empty() {
                return Err(EngineError::Spawner {
                    message: format!(
                        "no free land left after placing {} of {} players",
                        spawned.len(),
                        config.players
                    ),
                });
            }
            let pick = self.rng.random_range(0..candidates.len());
            let home = candidates.swap_remove(pick);

            let name = self.pick_unused_name(&used_names)?;
            used_names.insert(name.clone());
            let player = Player::new(name.clone());
            let id = player.id;
            let owner = player.owner();
            state.register_player(player)?;

            let territory = claim_area(state.grid(), home, config.start_radius, &claimed);
            for &cell in &territory {
                state.queue_transfer(cell, owner)?;
                claimed.insert(cell);
            }

            info!(
                player = %id,
                name = %name,
                home = %home,
                tiles = territory.len(),
                "Player spawned"
            );
            spawned.push(SpawnedPlayer {
                id,
                name,
                home,
                claimed: territory.len(),
            });
        }

        Ok(spawned)
    }

    /// Pick `count` routes between random water tiles.
    ///
    /// Returns fewer routes when the map has fewer than two water tiles.
    pub fn random_water_routes(&mut self, grid: &SpatialGrid, count: u32) -> Vec<DemoRoute> {
        let water: Vec<Cell> = grid
            .tiles()
            .filter(|t| t.is_water())
            .map(frontier_world::Tile::cell)
            .collect();
        if water.len() < 2 {
            return Vec::new();
        }

        let mut routes = Vec::new();
        for _ in 0..count {
            let from = self.rng.random_range(0..water.len());
            let mut to = self.rng.random_range(0..water.len());
            if to == from {
                to = from.checked_add(1).unwrap_or(0).checked_rem(water.len()).unwrap_or(0);
            }
            if let (Some(&from), Some(&to)) = (water.get(from), water.get(to)) {
                routes.push(DemoRoute { from, to });
            }
        }
        routes
    }

    fn pick_unused_name(&mut self, used: &BTreeSet<String>) -> Result<String, EngineError> {
        let available: Vec<&str> = NAME_POOL
            .iter()
            .filter(|&&n| !used.contains(n))
            .copied()
            .collect();

        if available.is_empty() {
            // All pool names are taken; generate a fallback name.
            let suffix: u32 = self.rng.random_range(1000..9999);
            return Ok(format!("Frontier-{suffix}"));
        }

        let idx = self.rng.random_range(0..available.len());
        available
            .get(idx)
            .map(|s| String::from(*s))
            .ok_or_else(|| EngineError::Spawner {
                message: format!("name pool index {idx} out of bounds"),
            })
    }
}

/// Land tiles next to water, or every land tile if there is no coast.
fn home_candidates(grid: &SpatialGrid) -> Vec<Cell> {
    let land: Vec<Cell> = grid
        .tiles()
        .filter(|t| t.is_land())
        .map(frontier_world::Tile::cell)
        .collect();
    let coastal: Vec<Cell> = land
        .iter()
        .copied()
        .filter(|&cell| {
            grid.neighbors(cell)
                .unwrap_or_default()
                .into_iter()
                .any(|n| grid.is_water(n).unwrap_or(false))
        })
        .collect();
    if coastal.is_empty() { land } else { coastal }
}

/// Land tiles within `radius` steps of `home` over land, skipping tiles
/// already `taken`. Includes `home`.
fn claim_area(grid: &SpatialGrid, home: Cell, radius: u32, taken: &BTreeSet<Cell>) -> Vec<Cell> {
    let mut area = vec![home];
    let mut seen: BTreeSet<Cell> = BTreeSet::from([home]);
    let mut queue: VecDeque<(Cell, u32)> = VecDeque::from([(home, 0)]);

    while let Some((cell, distance)) = queue.pop_front() {
        if distance >= radius {
            continue;
        }
        for neighbor in grid.neighbors(cell).unwrap_or_default() {
            if !seen.insert(neighbor) || taken.contains(&neighbor) {
                continue;
            }
            if !grid.is_land(neighbor).unwrap_or(false) {
                continue;
            }
            area.push(neighbor);
            queue.push_back((neighbor, distance.saturating_add(1)));
        }
    }
    area
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use frontier_core::run_tick;
    use frontier_core::scheduler::BudgetPolicy;
    use frontier_types::Owner;
    use frontier_world::{OwnershipAudit, TerrainConfig, generate};

    use super::*;

    fn make_state(seed: u64) -> SimulationState {
        let grid = generate(&TerrainConfig {
            width: 60,
            height: 30,
            seed,
            land_percent: 40,
            max_depth: 10,
            feature_size: 8,
        })
        .unwrap();
        SimulationState::with_policy(grid, BudgetPolicy::default(), 100)
    }

    fn population(players: u32, start_radius: u32) -> PopulationConfig {
        PopulationConfig {
            players,
            start_radius,
        }
    }

    #[test]
    fn spawns_correct_count() {
        let mut state = make_state(1);
        let spawned = Spawner::new(1)
            .spawn_players(&mut state, &population(5, 2))
            .unwrap();

        assert_eq!(spawned.len(), 5);
        assert_eq!(state.ledger().player_count(), 5);
        let names: BTreeSet<&str> = spawned.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn territory_is_applied_on_first_tick() {
        let mut state = make_state(2);
        let spawned = Spawner::new(2)
            .spawn_players(&mut state, &population(4, 2))
            .unwrap();
        for player in &spawned {
            assert_eq!(state.query_owner(player.home).unwrap(), Owner::TerraNullius);
        }

        let summary = run_tick(&mut state).unwrap();
        let expected: usize = spawned.iter().map(|p| p.claimed).sum();
        assert_eq!(summary.transfers_applied, expected);
        assert_eq!(summary.transfers_rejected, 0);

        for player in &spawned {
            let owner = Owner::Player(player.id);
            assert_eq!(state.query_owner(player.home).unwrap(), owner);
            assert_eq!(state.ledger().tile_count(owner), player.claimed);
            assert!(state.grid().is_land(player.home).unwrap());
        }
        assert_eq!(state.ledger().verify_single_ownership(), OwnershipAudit::Consistent);
    }

    #[test]
    fn same_seed_same_spawns() {
        let mut a = make_state(3);
        let mut b = make_state(3);
        let first = Spawner::new(9).spawn_players(&mut a, &population(3, 1)).unwrap();
        let second = Spawner::new(9).spawn_players(&mut b, &population(3, 1)).unwrap();
        let homes = |s: &[SpawnedPlayer]| s.iter().map(|p| (p.home, p.name.clone())).collect::<Vec<_>>();
        assert_eq!(homes(&first), homes(&second));
    }

    #[test]
    fn claim_area_stays_on_land_and_skips_taken() {
        let grid = SpatialGrid::from_layout(
            "\
~~~~~~~
~#####~
~#####~
~~~~~~~",
        )
        .unwrap();
        let taken = BTreeSet::from([Cell::new(2, 1)]);
        let area = claim_area(&grid, Cell::new(3, 1), 1, &taken);
        assert_eq!(area.first(), Some(&Cell::new(3, 1)));
        assert!(area.contains(&Cell::new(4, 1)));
        assert!(area.contains(&Cell::new(3, 2)));
        assert!(!area.contains(&Cell::new(2, 1)));
        assert!(!area.contains(&Cell::new(3, 0)));
        assert_eq!(area.len(), 3);
    }

    #[test]
    fn too_many_players_is_an_error() {
        let grid = SpatialGrid::from_layout("~#~\n~~~").unwrap();
        let mut state = SimulationState::with_policy(grid, BudgetPolicy::default(), 100);
        let result = Spawner::new(0).spawn_players(&mut state, &population(2, 0));
        assert!(matches!(result, Err(EngineError::Spawner { .. })));
    }

    #[test]
    fn water_routes_use_water_tiles() {
        let state = make_state(4);
        let routes = Spawner::new(4).random_water_routes(state.grid(), 6);
        assert_eq!(routes.len(), 6);
        for route in routes {
            assert!(state.grid().is_water(route.from).unwrap());
            assert!(state.grid().is_water(route.to).unwrap());
            assert_ne!(route.from, route.to);
        }
    }
}
