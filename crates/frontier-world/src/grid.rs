//! Spatial grid: authoritative geometry and adjacency.
//!
//! The [`SpatialGrid`] stores one [`Tile`] per cell in row-major order and
//! answers adjacency queries on a cylindrical world: the x-axis wraps modulo
//! the width, the y-axis is clamped. Terrain is fixed once the grid is
//! built; the grid exposes no mutation methods.
//!
//! # Layout format
//!
//! [`SpatialGrid::from_layout`] accepts one text row per grid row:
//!
//! | Char | Tile |
//! |------|------|
//! | `~` | water, magnitude 0 |
//! | `0`-`9` | water, magnitude `digit * 10` |
//! | `#` | land, magnitude 0 |
//! | `^` | land, magnitude 50 |
//!
//! Blank lines are ignored and surrounding whitespace is trimmed, so
//! layouts can be written as indented string literals.

use frontier_types::{Cell, Terrain, TileInfo};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Magnitude assigned to `^` (highland) in text layouts.
const HIGHLAND_MAGNITUDE: u8 = 50;

/// Multiplier applied to digit characters in text layouts.
const DIGIT_DEPTH_STEP: u8 = 10;

/// The runtime unit bound to one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    cell: Cell,
    info: TileInfo,
}

impl Tile {
    /// The cell this tile occupies.
    pub const fn cell(&self) -> Cell {
        self.cell
    }

    /// Land or water.
    pub const fn terrain(&self) -> Terrain {
        self.info.terrain
    }

    /// Terrain weight (water depth or land elevation).
    pub const fn magnitude(&self) -> u8 {
        self.info.magnitude
    }

    /// Static attributes as a value.
    pub const fn info(&self) -> TileInfo {
        self.info
    }

    /// Whether the tile is land.
    pub const fn is_land(&self) -> bool {
        self.info.terrain.is_land()
    }

    /// Whether the tile is water.
    pub const fn is_water(&self) -> bool {
        self.info.terrain.is_water()
    }
}

/// Immutable tile grid with horizontal wraparound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialGrid {
    width: u32,
    height: u32,
    /// Row-major: index `y * width + x`.
    tiles: Vec<Tile>,
}

impl SpatialGrid {
    /// Build a grid from row-major tile attributes.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is zero
    /// or the tile count overflows, and [`WorldError::TileCountMismatch`] if
    /// `tiles.len() != width * height`.
    pub fn new(width: u32, height: u32, tiles: Vec<TileInfo>) -> Result<Self, WorldError> {
        let expected = tile_count(width, height)?;
        if tiles.len() != expected {
            return Err(WorldError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }

        let tiles = tiles
            .into_iter()
            .zip(row_major_cells(width, height))
            .map(|(info, cell)| Tile { cell, info })
            .collect();

        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Build a grid where every tile has the same attributes.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] for zero or overflowing
    /// dimensions.
    pub fn filled(width: u32, height: u32, info: TileInfo) -> Result<Self, WorldError> {
        let count = tile_count(width, height)?;
        Self::new(width, height, vec![info; count])
    }

    /// Parse a grid from a text layout (see the module docs).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidLayout`] for unknown characters, ragged
    /// rows, or an empty layout.
    pub fn from_layout(layout: &str) -> Result<Self, WorldError> {
        let mut width: Option<u32> = None;
        let mut height: u32 = 0;
        let mut tiles = Vec::new();

        for (line_idx, raw) in layout.lines().enumerate() {
            let line_no = line_idx.saturating_add(1);
            let row = raw.trim();
            if row.is_empty() {
                continue;
            }

            let mut row_width: u32 = 0;
            for ch in row.chars() {
                tiles.push(parse_layout_char(ch).ok_or_else(|| WorldError::InvalidLayout {
                    line: line_no,
                    reason: format!("unknown tile character {ch:?}"),
                })?);
                row_width = row_width.checked_add(1).ok_or_else(|| WorldError::InvalidLayout {
                    line: line_no,
                    reason: "row too long".to_owned(),
                })?;
            }

            match width {
                None => width = Some(row_width),
                Some(w) if w != row_width => {
                    return Err(WorldError::InvalidLayout {
                        line: line_no,
                        reason: format!("row has {row_width} tiles, expected {w}"),
                    });
                }
                Some(_) => {}
            }

            height = height.checked_add(1).ok_or_else(|| WorldError::InvalidLayout {
                line: line_no,
                reason: "too many rows".to_owned(),
            })?;
        }

        let Some(width) = width else {
            return Err(WorldError::InvalidLayout {
                line: 0,
                reason: "layout contains no rows".to_owned(),
            });
        };

        Self::new(width, height, tiles)
    }

    // -------------------------------------------------------------------
    // Dimensions
    // -------------------------------------------------------------------

    /// Number of columns.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of tiles.
    pub const fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always `false`: a grid has at least one tile.
    pub const fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Whether the cell lies inside the grid.
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Reject cells outside the grid.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] when the cell is out of range.
    pub const fn check(&self, cell: Cell) -> Result<Cell, WorldError> {
        if self.contains(cell) {
            Ok(cell)
        } else {
            Err(WorldError::InvalidCell {
                cell,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Row-major index of a cell.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] when the cell is out of range.
    pub fn index(&self, cell: Cell) -> Result<usize, WorldError> {
        let cell = self.check(cell)?;
        dense_index(self.width, cell).ok_or(WorldError::InvalidCell {
            cell,
            width: self.width,
            height: self.height,
        })
    }

    // -------------------------------------------------------------------
    // Tile accessors
    // -------------------------------------------------------------------

    /// The tile at a cell.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] when the cell is out of range.
    pub fn tile(&self, cell: Cell) -> Result<&Tile, WorldError> {
        let index = self.index(cell)?;
        self.tiles.get(index).ok_or(WorldError::InvalidCell {
            cell,
            width: self.width,
            height: self.height,
        })
    }

    /// Whether the tile at `cell` is land.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] when the cell is out of range.
    pub fn is_land(&self, cell: Cell) -> Result<bool, WorldError> {
        self.tile(cell).map(Tile::is_land)
    }

    /// Whether the tile at `cell` is water.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] when the cell is out of range.
    pub fn is_water(&self, cell: Cell) -> Result<bool, WorldError> {
        self.tile(cell).map(Tile::is_water)
    }

    /// Magnitude of the tile at `cell`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] when the cell is out of range.
    pub fn magnitude(&self, cell: Cell) -> Result<u8, WorldError> {
        self.tile(cell).map(Tile::magnitude)
    }

    /// Iterate over all tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Iterate over all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.tiles.iter().map(Tile::cell)
    }

    /// Number of land tiles.
    pub fn land_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_land()).count()
    }

    // -------------------------------------------------------------------
    // Adjacency
    // -------------------------------------------------------------------

    /// Orthogonal neighbours of a cell, in the order west, east, north,
    /// south.
    ///
    /// The x-axis wraps: on a grid of width `W`, `(W-1, y)` and `(0, y)`
    /// are neighbours. Rows beyond the top or bottom edge are excluded.
    /// On grids one or two columns wide the wrapped neighbours coincide
    /// with the cell or with each other; duplicates and the cell itself are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidCell`] when the cell is out of range.
    pub fn neighbors(&self, cell: Cell) -> Result<Vec<Cell>, WorldError> {
        let cell = self.check(cell)?;
        let last_column = self.width.saturating_sub(1);

        let west = cell.x.checked_sub(1).unwrap_or(last_column);
        let east = cell.x.checked_add(1).filter(|&x| x < self.width).unwrap_or(0);

        let candidates = [
            Some(Cell::new(west, cell.y)),
            Some(Cell::new(east, cell.y)),
            cell.y.checked_sub(1).map(|y| Cell::new(cell.x, y)),
            cell.y
                .checked_add(1)
                .filter(|&y| y < self.height)
                .map(|y| Cell::new(cell.x, y)),
        ];

        let mut result = Vec::with_capacity(candidates.len());
        for candidate in candidates.into_iter().flatten() {
            if candidate != cell && !result.contains(&candidate) {
                result.push(candidate);
            }
        }
        Ok(result)
    }

    /// Manhattan distance on the cylinder: the horizontal component takes
    /// the shorter way around.
    ///
    /// Both cells are assumed to lie inside the grid.
    pub fn wrapped_manhattan(&self, a: Cell, b: Cell) -> u64 {
        let dx = a.x.abs_diff(b.x);
        let dx = dx.min(self.width.saturating_sub(dx));
        let dy = a.y.abs_diff(b.y);
        u64::from(dx).saturating_add(u64::from(dy))
    }
}

/// Compute `width * height` as a tile count, rejecting degenerate sizes.
fn tile_count(width: u32, height: u32) -> Result<usize, WorldError> {
    if width == 0 || height == 0 {
        return Err(WorldError::InvalidDimensions { width, height });
    }
    usize::try_from(width)
        .ok()
        .zip(usize::try_from(height).ok())
        .and_then(|(w, h)| w.checked_mul(h))
        .ok_or(WorldError::InvalidDimensions { width, height })
}

/// Row-major index of an in-range cell.
pub(crate) fn dense_index(width: u32, cell: Cell) -> Option<usize> {
    let width = usize::try_from(width).ok()?;
    let x = usize::try_from(cell.x).ok()?;
    let y = usize::try_from(cell.y).ok()?;
    y.checked_mul(width)?.checked_add(x)
}

/// Inverse of [`dense_index`].
pub(crate) fn cell_at(width: u32, index: usize) -> Option<Cell> {
    let width = usize::try_from(width).ok()?;
    let x = u32::try_from(index.checked_rem(width)?).ok()?;
    let y = u32::try_from(index.checked_div(width)?).ok()?;
    Some(Cell::new(x, y))
}

fn row_major_cells(width: u32, height: u32) -> impl Iterator<Item = Cell> {
    (0..height).flat_map(move |y| (0..width).map(move |x| Cell::new(x, y)))
}

fn parse_layout_char(ch: char) -> Option<TileInfo> {
    match ch {
        '~' => Some(TileInfo::water(0)),
        '#' => Some(TileInfo::land(0)),
        '^' => Some(TileInfo::land(HIGHLAND_MAGNITUDE)),
        _ => {
            let digit = u8::try_from(ch.to_digit(10)?).ok()?;
            Some(TileInfo::water(digit.saturating_mul(DIGIT_DEPTH_STEP)))
        }
    }
}
