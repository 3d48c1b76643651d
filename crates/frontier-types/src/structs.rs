//! Core value structs shared across the Frontier workspace.
//!
//! These are plain data: coordinates, static tile attributes, registered
//! players, and the ownership-change record emitted by the ledger. Identity
//! of [`Cell`] and [`Owner`] values must survive save/load and replication
//! unchanged, so every type here derives `serde` and `ts-rs`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Owner, Terrain};
use crate::ids::PlayerId;

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// An immutable integer grid coordinate.
///
/// Cells are compared by value. Whether a cell lies inside a particular world
/// is decided by that world's grid, not by the cell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Cell {
    /// Column, wrapping modulo the world width.
    pub x: u32,
    /// Row, never wrapping.
    pub y: u32,
}

impl Cell {
    /// Create a cell at `(x, y)`.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Cell {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// Static attributes of one tile, set at world generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TileInfo {
    /// Land or water.
    pub terrain: Terrain,
    /// Terrain weight: water depth for water tiles, elevation for land.
    /// Higher magnitude makes a water tile cheaper to cross.
    pub magnitude: u8,
}

impl TileInfo {
    /// A water tile of the given depth.
    pub const fn water(magnitude: u8) -> Self {
        Self {
            terrain: Terrain::Water,
            magnitude,
        }
    }

    /// A land tile of the given elevation.
    pub const fn land(magnitude: u8) -> Self {
        Self {
            terrain: Terrain::Land,
            magnitude,
        }
    }
}

// ---------------------------------------------------------------------------
// Players and ownership
// ---------------------------------------------------------------------------

/// A registered player able to hold tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Unique player identifier.
    pub id: PlayerId,
    /// Display name chosen in the lobby.
    pub name: String,
}

impl Player {
    /// Create a player with a fresh identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(),
            name: name.into(),
        }
    }

    /// The owner value this player claims tiles as.
    pub const fn owner(&self) -> Owner {
        Owner::Player(self.id)
    }
}

/// Record of one completed ownership transfer.
///
/// Emitted strictly after the ledger has been updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OwnershipChange {
    /// The transferred tile.
    pub cell: Cell,
    /// Owner before the transfer.
    pub previous: Owner,
    /// Owner after the transfer.
    pub current: Owner,
}

impl OwnershipChange {
    /// Whether the transfer actually changed hands.
    pub fn is_change(&self) -> bool {
        self.previous != self.current
    }
}
