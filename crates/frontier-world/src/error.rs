//! Error types for the `frontier-world` crate.
//!
//! Every failure is tied to the call that caused it. Malformed coordinates
//! are rejected synchronously by both the grid and the ledger.
//!
//! A lookup or transfer on a tile that does not exist is always
//! [`WorldError::InvalidCell`], whichever component is asked.
//! [`WorldError::UnknownOwner`] is reserved for the other side of a
//! transfer: a claimant that was never registered.

use frontier_types::{Cell, PlayerId};

/// Errors that can occur during grid and ownership operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A coordinate lies outside `[0, width) x [0, height)`. Returned for
    /// ownership lookups on tiles that do not exist.
    #[error("cell {cell} is outside the {width}x{height} grid")]
    InvalidCell {
        /// The rejected coordinate.
        cell: Cell,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },

    /// A transfer named a player that was never registered.
    #[error("unknown owner: player {0} is not registered")]
    UnknownOwner(PlayerId),

    /// A player was registered twice.
    #[error("duplicate player id: {0}")]
    DuplicatePlayer(PlayerId),

    /// Width or height is zero, or the tile count overflows `usize`.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// The number of supplied tiles does not match `width * height`.
    #[error("expected {expected} tiles, got {actual}")]
    TileCountMismatch {
        /// `width * height`.
        expected: usize,
        /// Number of tiles supplied.
        actual: usize,
    },

    /// An ASCII layout could not be parsed.
    #[error("invalid layout at line {line}: {reason}")]
    InvalidLayout {
        /// One-based line number within the layout.
        line: usize,
        /// What is wrong with the line.
        reason: String,
    },

    /// Terrain generation parameters are out of range.
    #[error("invalid terrain configuration: {0}")]
    InvalidTerrainConfig(String),
}
