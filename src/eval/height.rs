// eval/height.rs - populate the coarse grid from terrain elevation
//
// Sample positions are picked on a 512-per-side lattice (the legacy height
// field resolution) and then scaled onto the real field, so a canonical
// 513-sample field is read at exactly the same samples as before.

use crate::eval::coords::{cell_spacing, grid_to_world};
use crate::eval::grid::{CoarseGrid, ValuePoint};
use crate::schema::{HeightField, TerrainContext};

/// Samples per side the lattice assumes.
pub const CANONICAL_HEIGHT_RESOLUTION: u64 = 512;

/// Height-field sample index for coarse index `i` on an R-resolution grid.
#[inline]
fn lattice_index(i: u32, resolution: u32, field_resolution: usize) -> usize {
    let canonical = i as u64 * CANONICAL_HEIGHT_RESOLUTION / resolution.max(1) as u64;
    let last = field_resolution.saturating_sub(1) as u64;
    (canonical * last / CANONICAL_HEIGHT_RESOLUTION) as usize
}

/// Fill an (R+1)×(R+1) grid with scaled heights.
pub fn sample_heights(resolution: u32, ctx: &TerrainContext, heights: &HeightField) -> CoarseGrid {
    let r = resolution.max(1);
    let spacing = cell_spacing(ctx.alpha_resolution, r).max(1);
    CoarseGrid::from_fn(r, |x, y| {
        let row = lattice_index(x, r, heights.resolution);
        let col = lattice_index(y, r, heights.resolution);
        let value = heights.get(row, col) * ctx.height_scale;

        ValuePoint {
            value,
            // same placement as brush grids, whatever the terrain's aspect
            coord: (x * spacing, y * spacing),
            world: grid_to_world(x as i32, y as i32, r, ctx.size, value),
        }
    })
}
