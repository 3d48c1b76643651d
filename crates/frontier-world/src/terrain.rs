//! Deterministic world generation.
//!
//! Terrain is produced from seeded value noise so that the same
//! [`TerrainConfig`] always yields the same [`SpatialGrid`]:
//!
//! 1. A coarse lattice of pseudo-random heights is sampled from
//!    `(seed, lattice index)` with `xorshift64`. The lattice wraps
//!    horizontally so the cylinder has no seam.
//! 2. Each tile's height is the bilinear interpolation of its four lattice
//!    corners, in integer arithmetic.
//! 3. The height threshold is the `(100 - land_percent)` percentile: tiles
//!    at or above it become land, with magnitude equal to their scaled
//!    elevation above the threshold.
//! 4. Water magnitude is the distance to the nearest shore, found by a
//!    multi-source breadth-first search over wrapped adjacency and capped at
//!    `max_depth`. Deep water is therefore cheaper to cross than coastline.

use std::collections::VecDeque;

use frontier_types::TileInfo;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::grid::{self, SpatialGrid};

/// Parameters for [`generate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// World seed.
    pub seed: u64,
    /// Share of tiles that become land, in percent (0-100).
    pub land_percent: u8,
    /// Cap on water depth (distance to shore).
    pub max_depth: u8,
    /// Lattice spacing in tiles; larger values give larger continents.
    pub feature_size: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 100,
            seed: 42,
            land_percent: 40,
            max_depth: 30,
            feature_size: 16,
        }
    }
}

/// Generate a grid from `config`.
///
/// # Errors
///
/// Returns [`WorldError::InvalidTerrainConfig`] if `land_percent > 100` or
/// `feature_size == 0`, and the grid's dimension errors for zero sizes.
pub fn generate(config: &TerrainConfig) -> Result<SpatialGrid, WorldError> {
    if config.land_percent > 100 {
        return Err(WorldError::InvalidTerrainConfig(format!(
            "land_percent must be at most 100, got {}",
            config.land_percent
        )));
    }
    if config.feature_size == 0 {
        return Err(WorldError::InvalidTerrainConfig(
            "feature_size must be at least 1".to_owned(),
        ));
    }

    // Validates dimensions before any allocation proportional to them.
    let provisional = SpatialGrid::filled(config.width, config.height, TileInfo::water(0))?;

    let lattice = Lattice::new(config);
    let heights: Vec<u64> = provisional
        .cells()
        .map(|cell| lattice.sample(cell.x, cell.y))
        .collect();

    let threshold = land_threshold(&heights, config.land_percent);
    let peak = heights.iter().copied().max().unwrap_or(0);

    let classified: Vec<TileInfo> = heights
        .iter()
        .map(|&h| match threshold {
            Some(t) if h >= t => TileInfo::land(scale_elevation(h, t, peak)),
            _ => TileInfo::water(0),
        })
        .collect();
    let shaped = SpatialGrid::new(config.width, config.height, classified)?;

    let depths = shore_distances(&shaped, config.max_depth);
    let tiles = shaped
        .tiles()
        .zip(depths)
        .map(|(tile, depth)| {
            if tile.is_land() {
                tile.info()
            } else {
                TileInfo::water(depth)
            }
        })
        .collect();

    let grid = SpatialGrid::new(config.width, config.height, tiles)?;
    tracing::debug!(
        width = config.width,
        height = config.height,
        seed = config.seed,
        land = grid.land_count(),
        "Terrain generated"
    );
    Ok(grid)
}

// ---------------------------------------------------------------------------
// Noise lattice
// ---------------------------------------------------------------------------

/// Coarse grid of random heights, wrapping horizontally.
struct Lattice {
    seed: u64,
    columns: u32,
    spacing: u32,
}

impl Lattice {
    const fn new(config: &TerrainConfig) -> Self {
        Self {
            seed: config.seed,
            columns: config.width.div_ceil(config.feature_size),
            spacing: config.feature_size,
        }
    }

    /// Random height at lattice point `(gx, gy)`, in `[0, 65535]`.
    fn corner(&self, gx: u32, gy: u32) -> u64 {
        let gx = gx.checked_rem(self.columns).unwrap_or(0);
        let key = u64::from(gy)
            .saturating_mul(u64::from(self.columns))
            .saturating_add(u64::from(gx));
        deterministic_random(self.seed, key) & 0xFFFF
    }

    /// Bilinear interpolation of the four corners around tile `(x, y)`.
    fn sample(&self, x: u32, y: u32) -> u64 {
        let s = self.spacing;
        let gx = x.checked_div(s).unwrap_or(0);
        let gy = y.checked_div(s).unwrap_or(0);
        let fx = u64::from(x.checked_rem(s).unwrap_or(0));
        let fy = u64::from(y.checked_rem(s).unwrap_or(0));
        let span = u64::from(s);

        let v00 = self.corner(gx, gy);
        let v10 = self.corner(gx.saturating_add(1), gy);
        let v01 = self.corner(gx, gy.saturating_add(1));
        let v11 = self.corner(gx.saturating_add(1), gy.saturating_add(1));

        let inv_fx = span.saturating_sub(fx);
        let inv_fy = span.saturating_sub(fy);
        let top = v00.saturating_mul(inv_fx).saturating_add(v10.saturating_mul(fx));
        let bottom = v01.saturating_mul(inv_fx).saturating_add(v11.saturating_mul(fx));
        let blended = top.saturating_mul(inv_fy).saturating_add(bottom.saturating_mul(fy));
        blended
            .checked_div(span.saturating_mul(span))
            .unwrap_or(0)
    }
}

/// Height at or above which a tile is land, or `None` for an all-water map.
fn land_threshold(heights: &[u64], land_percent: u8) -> Option<u64> {
    if land_percent == 0 {
        return None;
    }
    let mut sorted = heights.to_vec();
    sorted.sort_unstable();
    let water_share = usize::from(100_u8.saturating_sub(land_percent));
    let water_count = sorted
        .len()
        .saturating_mul(water_share)
        .checked_div(100)
        .unwrap_or(0);
    sorted.get(water_count).copied()
}

/// Map a land height onto `[0, 255]` relative to the threshold and peak.
fn scale_elevation(height: u64, threshold: u64, peak: u64) -> u8 {
    let above = height.saturating_sub(threshold);
    let range = peak.saturating_sub(threshold).saturating_add(1);
    let scaled = above.saturating_mul(255).checked_div(range).unwrap_or(0);
    u8::try_from(scaled).unwrap_or(u8::MAX)
}

/// Distance from every tile to the nearest land tile, capped at `cap`.
///
/// Land tiles get 0. If there is no land at all every tile gets `cap`.
fn shore_distances(grid: &SpatialGrid, cap: u8) -> Vec<u8> {
    let mut distances = vec![cap; grid.len()];
    let mut queue = VecDeque::new();

    for (index, tile) in grid.tiles().enumerate() {
        if tile.is_land()
            && let Some(slot) = distances.get_mut(index)
        {
            *slot = 0;
            queue.push_back(tile.cell());
        }
    }

    while let Some(cell) = queue.pop_front() {
        let Some(current) = grid::dense_index(grid.width(), cell)
            .and_then(|index| distances.get(index).copied())
        else {
            continue;
        };
        if current >= cap {
            continue;
        }
        let next = current.saturating_add(1);

        for neighbor in grid.neighbors(cell).unwrap_or_default() {
            let Some(slot) = grid::dense_index(grid.width(), neighbor)
                .and_then(|index| distances.get_mut(index))
            else {
                continue;
            };
            if *slot <= next {
                continue;
            }
            *slot = next;
            queue.push_back(neighbor);
        }
    }

    distances
}

/// Deterministic pseudo-random number generator using `xorshift64`.
///
/// The same `(seed, key)` pair always produces the same output.
const fn deterministic_random(seed: u64, key: u64) -> u64 {
    // 0x517cc1b727220a95 is a well-known mixing constant.
    let mut state = seed.wrapping_add(key.wrapping_mul(0x517c_c1b7_2722_0a95));

    // xorshift requires a non-zero state.
    if state == 0 {
        state = 0xdead_beef_cafe_babe;
    }

    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;

    state
}
