//! Shared type definitions for the Frontier territorial simulation.
//!
//! This crate is the single source of truth for the value types that cross
//! crate boundaries: grid coordinates, tile attributes, owners, and path
//! request handles. Types defined here flow downstream to `TypeScript` via
//! `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Player identifiers and path request handles
//! - [`enums`] -- Terrain, owner, and path search status enumerations
//! - [`structs`] -- Cells, tile attributes, players, ownership changes

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Owner, PathPoll, PathStatus, Terrain};
pub use ids::{PathRequestId, PlayerId};
pub use structs::{Cell, OwnershipChange, Player, TileInfo};
