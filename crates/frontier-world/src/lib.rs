//! Geography and territory for the Frontier simulation.
//!
//! This crate models the physical map and who holds it: a rectangular grid
//! of land and water tiles whose x-axis wraps into a cylinder, and a ledger
//! that records exactly one owner per tile.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid and ownership operations.
//! - [`grid`] -- [`SpatialGrid`]: tile storage, bounds checks, wrapped
//!   adjacency, and the cylinder distance metric.
//! - [`ownership`] -- [`OwnershipLedger`]: the single-owner map, territory
//!   indices, transfers, and change observers.
//! - [`terrain`] -- Deterministic seeded generation of grids.

pub mod error;
pub mod grid;
pub mod ownership;
pub mod terrain;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use grid::{SpatialGrid, Tile};
pub use ownership::{OwnershipAudit, OwnershipLedger, OwnershipObserver};
pub use terrain::{TerrainConfig, generate};
