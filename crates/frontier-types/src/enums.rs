//! Enumeration types for the Frontier simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::PlayerId;
use crate::structs::Cell;

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Terrain classification of a tile, fixed at world generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Terrain {
    /// Claimable ground. Not traversable by naval paths.
    Land,
    /// Open water. Traversable by naval paths.
    Water,
}

impl Terrain {
    /// Whether this terrain is land.
    pub const fn is_land(self) -> bool {
        matches!(self, Self::Land)
    }

    /// Whether this terrain is water.
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Water)
    }
}

// ---------------------------------------------------------------------------
// Owner
// ---------------------------------------------------------------------------

/// The claimant of a tile.
///
/// Exactly one owner holds every tile at every instant. Unclaimed tiles are
/// held by [`Owner::TerraNullius`], a placeholder with a fixed identity that
/// can never collide with a player.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum Owner {
    /// Unclaimed land (and all water) at world start.
    #[default]
    TerraNullius,
    /// A registered player.
    Player(PlayerId),
}

impl Owner {
    /// Well-known identity string of the unclaimed-land placeholder.
    pub const TERRA_NULLIUS_ID: &'static str = "TerraNulliusID";

    /// Whether this owner is a concrete player.
    pub const fn is_player(self) -> bool {
        matches!(self, Self::Player(_))
    }

    /// The player behind this owner, if any.
    pub const fn player_id(self) -> Option<PlayerId> {
        match self {
            Self::Player(id) => Some(id),
            Self::TerraNullius => None,
        }
    }

    /// Stable identity string, as replicated to collaborators.
    pub fn id(self) -> String {
        self.to_string()
    }
}

impl From<PlayerId> for Owner {
    fn from(id: PlayerId) -> Self {
        Self::Player(id)
    }
}

impl core::fmt::Display for Owner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TerraNullius => f.write_str(Self::TERRA_NULLIUS_ID),
            Self::Player(id) => write!(f, "{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Path search status
// ---------------------------------------------------------------------------

/// Progress of one incremental path search.
///
/// [`PathStatus::Succeeded`] and [`PathStatus::Exhausted`] are terminal and
/// sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PathStatus {
    /// The frontier is non-empty and the destination has not been reached.
    Running,
    /// The destination was dequeued; a path is available.
    Succeeded,
    /// The frontier emptied before the destination was reached.
    Exhausted,
}

impl PathStatus {
    /// Whether the search has reached a terminal state.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Answer to a path request poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PathPoll {
    /// The search is still in flight.
    Pending,
    /// A route was found, ordered from source to destination inclusive.
    Found(Vec<Cell>),
    /// No route exists over the current terrain.
    Unreachable,
}
