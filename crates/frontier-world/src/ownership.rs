//! The ownership ledger: single source of truth for who holds each tile.
//!
//! The [`OwnershipLedger`] keeps a dense owner table (one entry per tile,
//! constant-time lookup) and a per-owner territory index. Both are updated
//! inside a single `&mut self` call, so no reader can ever observe a tile
//! with zero or two owners.
//!
//! # Design
//!
//! - **Total**: every tile starts with [`Owner::TerraNullius`]; a transfer
//!   replaces the owner in place, it never clears it.
//! - **Closed set of claimants**: only registered players may receive tiles.
//! - **Notify after commit**: observers see an [`OwnershipChange`] only once
//!   the table and index already reflect it.
//! - **Auditable**: [`OwnershipLedger::verify_single_ownership`] cross-checks
//!   the table against the index, the analogue of a bookkeeping balance
//!   check.

use std::collections::{BTreeMap, BTreeSet};

use frontier_types::{Cell, Owner, OwnershipChange, Player, PlayerId};
use tracing::debug;

use crate::error::WorldError;
use crate::grid::{self, SpatialGrid};

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Receives a notification after every successful transfer.
pub trait OwnershipObserver {
    /// Called once the ledger already reflects `change`.
    fn on_ownership_changed(&mut self, change: &OwnershipChange);
}

impl<F> OwnershipObserver for F
where
    F: FnMut(&OwnershipChange),
{
    fn on_ownership_changed(&mut self, change: &OwnershipChange) {
        self(change);
    }
}

// ---------------------------------------------------------------------------
// Audit result
// ---------------------------------------------------------------------------

/// Outcome of [`OwnershipLedger::verify_single_ownership`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipAudit {
    /// Table and territory index agree: every tile has exactly one owner.
    Consistent,
    /// The territory index disagrees with the owner table.
    Inconsistent {
        /// Cells whose table owner does not list them in its territory.
        mismatched: Vec<Cell>,
        /// Sum of all territory sizes.
        indexed_total: usize,
        /// Number of tiles in the table.
        tile_total: usize,
    },
}

impl OwnershipAudit {
    /// Whether the audit found no problems.
    pub const fn is_consistent(&self) -> bool {
        matches!(self, Self::Consistent)
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Maps every tile to exactly one owner.
pub struct OwnershipLedger {
    width: u32,
    height: u32,
    /// Row-major owner table, same indexing as [`SpatialGrid`].
    owners: Vec<Owner>,
    /// Owner -> cells it holds. Empty player territories are kept.
    territories: BTreeMap<Owner, BTreeSet<Cell>>,
    /// Registered players.
    players: BTreeMap<PlayerId, Player>,
    observers: Vec<Box<dyn OwnershipObserver + Send>>,
}

impl OwnershipLedger {
    /// Create a ledger covering `grid` with every tile unclaimed.
    pub fn new(grid: &SpatialGrid) -> Self {
        let owners = vec![Owner::TerraNullius; grid.len()];
        let mut territories = BTreeMap::new();
        territories.insert(Owner::TerraNullius, grid.cells().collect::<BTreeSet<_>>());

        Self {
            width: grid.width(),
            height: grid.height(),
            owners,
            territories,
            players: BTreeMap::new(),
            observers: Vec::new(),
        }
    }

    // -------------------------------------------------------------------
    // Players
    // -------------------------------------------------------------------

    /// Register a player so it can receive tiles.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicatePlayer`] if the id is already known.
    pub fn register_player(&mut self, player: Player) -> Result<(), WorldError> {
        if self.players.contains_key(&player.id) {
            return Err(WorldError::DuplicatePlayer(player.id));
        }
        let owner = player.owner();
        debug!(player = %player.id, name = %player.name, "Player registered");
        self.players.insert(player.id, player);
        self.territories.entry(owner).or_default();
        Ok(())
    }

    /// Look up a registered player.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Iterate over registered players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of registered players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// The owner of a tile.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] for cells outside the grid.
    pub fn owner_of(&self, cell: Cell) -> Result<Owner, WorldError> {
        let index = self.index(cell)?;
        self.owners
            .get(index)
            .copied()
            .ok_or_else(|| self.invalid(cell))
    }

    /// Whether `owner` currently holds `cell`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] for cells outside the grid.
    pub fn owns_tile(&self, owner: Owner, cell: Cell) -> Result<bool, WorldError> {
        self.owner_of(cell).map(|current| current == owner)
    }

    /// Cells held by `owner`, in cell order.
    pub fn territory(&self, owner: Owner) -> impl Iterator<Item = Cell> + '_ {
        self.territories
            .get(&owner)
            .into_iter()
            .flat_map(|cells| cells.iter().copied())
    }

    /// Number of tiles held by `owner`.
    pub fn tile_count(&self, owner: Owner) -> usize {
        self.territories.get(&owner).map_or(0, BTreeSet::len)
    }

    /// Whether a tile touches a tile with a different owner.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] for cells outside the grid.
    pub fn is_border(&self, grid: &SpatialGrid, cell: Cell) -> Result<bool, WorldError> {
        let owner = self.owner_of(cell)?;
        for neighbor in grid.neighbors(cell)? {
            if self.owner_of(neighbor)? != owner {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // -------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------

    /// Check that `transfer(cell, new_owner)` would be accepted, without
    /// changing anything.
    ///
    /// # Errors
    ///
    /// Same as [`transfer`](Self::transfer).
    pub fn check_transfer(&self, cell: Cell, new_owner: Owner) -> Result<(), WorldError> {
        self.index(cell)?;
        match new_owner {
            Owner::Player(id) if !self.players.contains_key(&id) => {
                Err(WorldError::UnknownOwner(id))
            }
            _ => Ok(()),
        }
    }

    /// Reassign a tile to `new_owner` and notify observers.
    ///
    /// The owner table and territory index are both updated before any
    /// observer runs. Transferring a tile to its current owner succeeds and
    /// still notifies.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] for cells outside the grid and
    /// [`WorldError::UnknownOwner`] for unregistered players. On error the
    /// ledger is unchanged.
    pub fn transfer(&mut self, cell: Cell, new_owner: Owner) -> Result<OwnershipChange, WorldError> {
        self.check_transfer(cell, new_owner)?;
        let index = self.index(cell)?;

        let invalid = self.invalid(cell);
        let slot = self.owners.get_mut(index).ok_or(invalid)?;
        let previous = core::mem::replace(slot, new_owner);

        if previous != new_owner {
            if let Some(cells) = self.territories.get_mut(&previous) {
                cells.remove(&cell);
            }
            self.territories.entry(new_owner).or_default().insert(cell);
        }

        let change = OwnershipChange {
            cell,
            previous,
            current: new_owner,
        };
        debug!(%cell, from = %previous, to = %new_owner, "Tile transferred");

        for observer in &mut self.observers {
            observer.on_ownership_changed(&change);
        }
        Ok(change)
    }

    /// Add an observer notified after every successful transfer.
    pub fn subscribe(&mut self, observer: Box<dyn OwnershipObserver + Send>) {
        self.observers.push(observer);
    }

    /// Number of subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // -------------------------------------------------------------------
    // Audit
    // -------------------------------------------------------------------

    /// Cross-check the owner table against the territory index.
    pub fn verify_single_ownership(&self) -> OwnershipAudit {
        let mut mismatched = Vec::new();
        for (index, owner) in self.owners.iter().enumerate() {
            let Some(cell) = grid::cell_at(self.width, index) else {
                continue;
            };
            let listed = self
                .territories
                .get(owner)
                .is_some_and(|cells| cells.contains(&cell));
            if !listed {
                mismatched.push(cell);
            }
        }

        let indexed_total = self
            .territories
            .values()
            .fold(0_usize, |acc, cells| acc.saturating_add(cells.len()));
        let tile_total = self.owners.len();

        if mismatched.is_empty() && indexed_total == tile_total {
            OwnershipAudit::Consistent
        } else {
            OwnershipAudit::Inconsistent {
                mismatched,
                indexed_total,
                tile_total,
            }
        }
    }

    fn index(&self, cell: Cell) -> Result<usize, WorldError> {
        if cell.x >= self.width || cell.y >= self.height {
            return Err(self.invalid(cell));
        }
        grid::dense_index(self.width, cell).ok_or_else(|| self.invalid(cell))
    }

    const fn invalid(&self, cell: Cell) -> WorldError {
        WorldError::InvalidCell {
            cell,
            width: self.width,
            height: self.height,
        }
    }
}

impl core::fmt::Debug for OwnershipLedger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OwnershipLedger")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("players", &self.players.len())
            .field("unclaimed", &self.tile_count(Owner::TerraNullius))
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use frontier_types::TileInfo;

    use super::*;

    fn setup() -> (SpatialGrid, OwnershipLedger, Player, Player) {
        let grid = SpatialGrid::filled(6, 6, TileInfo::land(0)).unwrap();
        let mut ledger = OwnershipLedger::new(&grid);
        let a = Player::new("A");
        let b = Player::new("B");
        ledger.register_player(a.clone()).unwrap();
        ledger.register_player(b.clone()).unwrap();
        (grid, ledger, a, b)
    }

    #[test]
    fn every_tile_starts_unclaimed() {
        let (grid, ledger, _, _) = setup();
        for cell in grid.cells() {
            assert_eq!(ledger.owner_of(cell), Ok(Owner::TerraNullius));
        }
        assert_eq!(ledger.tile_count(Owner::TerraNullius), 36);
        assert!(ledger.verify_single_ownership().is_consistent());
    }

    #[test]
    fn transfer_then_transfer_again_keeps_last_owner() {
        let (_, mut ledger, a, b) = setup();
        let cell = Cell::new(3, 3);

        let first = ledger.transfer(cell, a.owner()).unwrap();
        assert_eq!(first.previous, Owner::TerraNullius);
        assert_eq!(ledger.owner_of(cell), Ok(a.owner()));

        let second = ledger.transfer(cell, b.owner()).unwrap();
        assert_eq!(second.previous, a.owner());
        assert_eq!(ledger.owner_of(cell), Ok(b.owner()));

        assert_eq!(ledger.tile_count(a.owner()), 0);
        assert_eq!(ledger.tile_count(b.owner()), 1);
        assert_eq!(ledger.tile_count(Owner::TerraNullius), 35);
        assert!(ledger.verify_single_ownership().is_consistent());
    }

    #[test]
    fn observers_never_see_an_unowned_tile() {
        let (_, mut ledger, a, b) = setup();
        let seen: Arc<Mutex<Vec<OwnershipChange>>> = Arc::default();
        let sink = Arc::clone(&seen);
        ledger.subscribe(Box::new(move |change: &OwnershipChange| {
            sink.lock().unwrap().push(*change);
        }));

        let cell = Cell::new(3, 3);
        ledger.transfer(cell, a.owner()).unwrap();
        ledger.transfer(cell, b.owner()).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.first().map(|c| c.current), Some(a.owner()));
        assert_eq!(seen.get(1).map(|c| (c.previous, c.current)), Some((a.owner(), b.owner())));
    }

    #[test]
    fn struct_observer_receives_changes() {
        struct CountingObserver {
            expected_owner: Owner,
            notified: Arc<Mutex<u32>>,
        }
        impl OwnershipObserver for CountingObserver {
            fn on_ownership_changed(&mut self, change: &OwnershipChange) {
                assert_eq!(change.current, self.expected_owner);
                *self.notified.lock().unwrap() += 1;
            }
        }

        let (_, mut ledger, a, _) = setup();
        let notified = Arc::new(Mutex::new(0));
        ledger.subscribe(Box::new(CountingObserver {
            expected_owner: a.owner(),
            notified: Arc::clone(&notified),
        }));
        ledger.transfer(Cell::new(0, 0), a.owner()).unwrap();
        assert_eq!(*notified.lock().unwrap(), 1);
        assert_eq!(ledger.observer_count(), 1);
    }

    #[test]
    fn transfer_to_unknown_player_fails_without_change() {
        let (_, mut ledger, _, _) = setup();
        let stranger = PlayerId::new();
        let result = ledger.transfer(Cell::new(1, 1), Owner::Player(stranger));
        assert_eq!(result, Err(WorldError::UnknownOwner(stranger)));
        assert_eq!(ledger.owner_of(Cell::new(1, 1)), Ok(Owner::TerraNullius));
    }

    #[test]
    fn transfer_off_grid_fails() {
        let (_, mut ledger, a, _) = setup();
        let result = ledger.transfer(Cell::new(6, 0), a.owner());
        assert!(matches!(result, Err(WorldError::InvalidCell { .. })));
        assert!(ledger.owner_of(Cell::new(0, 6)).is_err());
    }

    #[test]
    fn check_transfer_matches_transfer() {
        let (_, mut ledger, a, _) = setup();
        let stranger = PlayerId::new();
        assert_eq!(ledger.check_transfer(Cell::new(2, 2), a.owner()), Ok(()));
        assert_eq!(ledger.check_transfer(Cell::new(2, 2), Owner::TerraNullius), Ok(()));
        assert_eq!(
            ledger.check_transfer(Cell::new(2, 2), Owner::Player(stranger)),
            Err(WorldError::UnknownOwner(stranger))
        );
        assert!(matches!(
            ledger.check_transfer(Cell::new(0, 9), a.owner()),
            Err(WorldError::InvalidCell { .. })
        ));
        // Checking never mutates.
        assert_eq!(ledger.owner_of(Cell::new(2, 2)), Ok(Owner::TerraNullius));
        assert!(ledger.transfer(Cell::new(2, 2), a.owner()).is_ok());
    }

    #[test]
    fn lookup_on_missing_tile_is_invalid_cell() {
        let (_, ledger, a, _) = setup();
        let missing = Cell::new(6, 6);
        assert_eq!(
            ledger.owner_of(missing),
            Err(WorldError::InvalidCell {
                cell: missing,
                width: 6,
                height: 6,
            })
        );
        assert!(matches!(
            ledger.owns_tile(a.owner(), missing),
            Err(WorldError::InvalidCell { .. })
        ));
    }

    #[test]
    fn duplicate_player_rejected() {
        let (_, mut ledger, a, _) = setup();
        assert_eq!(
            ledger.register_player(a.clone()),
            Err(WorldError::DuplicatePlayer(a.id))
        );
        assert_eq!(ledger.player_count(), 2);
        assert_eq!(ledger.player(a.id).map(|p| p.name.as_str()), Some("A"));
    }

    #[test]
    fn owns_tile_and_territory() {
        let (_, mut ledger, a, _) = setup();
        ledger.transfer(Cell::new(2, 2), a.owner()).unwrap();
        ledger.transfer(Cell::new(1, 2), a.owner()).unwrap();
        assert_eq!(ledger.owns_tile(a.owner(), Cell::new(2, 2)), Ok(true));
        assert_eq!(ledger.owns_tile(Owner::TerraNullius, Cell::new(2, 2)), Ok(false));
        let territory: Vec<Cell> = ledger.territory(a.owner()).collect();
        assert_eq!(territory, vec![Cell::new(1, 2), Cell::new(2, 2)]);
    }

    #[test]
    fn same_owner_transfer_is_a_noop_change() {
        let (_, mut ledger, a, _) = setup();
        ledger.transfer(Cell::new(2, 2), a.owner()).unwrap();
        let again = ledger.transfer(Cell::new(2, 2), a.owner()).unwrap();
        assert!(!again.is_change());
        assert_eq!(ledger.tile_count(a.owner()), 1);
        assert!(ledger.verify_single_ownership().is_consistent());
    }

    #[test]
    fn border_detection_wraps() {
        let (grid, mut ledger, a, _) = setup();
        ledger.transfer(Cell::new(0, 3), a.owner()).unwrap();
        // (5, 3) is the wrapped west neighbour of (0, 3).
        assert_eq!(ledger.is_border(&grid, Cell::new(5, 3)), Ok(true));
        assert_eq!(ledger.is_border(&grid, Cell::new(3, 0)), Ok(false));
    }

    #[test]
    fn single_ownership_holds_under_many_transfers() {
        let (grid, mut ledger, a, b) = setup();
        for (i, cell) in grid.cells().enumerate() {
            let owner = if i % 3 == 0 { a.owner() } else { b.owner() };
            ledger.transfer(cell, owner).unwrap();
            if i % 5 == 0 {
                ledger.transfer(cell, Owner::TerraNullius).unwrap();
            }
        }
        assert!(ledger.verify_single_ownership().is_consistent());
        let total = ledger.tile_count(a.owner())
            + ledger.tile_count(b.owner())
            + ledger.tile_count(Owner::TerraNullius);
        assert_eq!(total, grid.len());
    }
}
