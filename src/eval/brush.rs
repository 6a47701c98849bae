// eval/brush.rs - rasterize brush points onto the coarse grid
//
// Every cell starts at the heatmap's base value. Points are applied in input
// order: the hit cell gets `value × opacity`, neighbours inside the brush get
// the same scaled by a hardness falloff. Each point either adds to what is
// already there or overwrites it, per its own `overwrite` flag.

use crate::eval::coords::{cell_spacing, grid_to_world, world_to_grid};
use crate::eval::grid::{CoarseGrid, ValuePoint};
use crate::schema::{BrushPoint, BrushShape, TerrainContext};

/// Brush parameters after clamping, ready to splat.
#[derive(Debug, Clone, Copy)]
struct Stroke {
    cx: i64,
    cy: i64,
    value: f32,
    opacity: f32,
    hardness: f32,
    /// Neighbour steps outwards; 0 paints only the hit cell.
    radius: i64,
    shape: BrushShape,
    overwrite: bool,
}

impl Stroke {
    fn new(point: &BrushPoint, ctx: &TerrainContext, spacing: u32) -> Self {
        let opacity = point.opacity.clamp(0.0, 100.0) / 100.0;
        let hardness = point.hardness.clamp(0.0, 100.0) / 100.0;

        let (tx, ty) = world_to_grid(point.position, ctx.size, ctx.alpha_resolution);
        let step = spacing as f32;
        let cx = (tx as f32 / step).round_ties_even() as i64;
        let cy = (ty as f32 / step).round_ties_even() as i64;

        let diameter = (point.brush_size / spacing) as i64;

        Self {
            cx,
            cy,
            value: point.value,
            opacity,
            hardness,
            radius: diameter / 2,
            shape: point.shape,
            overwrite: point.overwrite,
        }
    }

    /// Falloff weight for offset (dx, dy), or None outside the brush.
    #[inline]
    fn falloff(&self, dx: i64, dy: i64) -> Option<f32> {
        let soft = 1.0 - self.hardness;
        match self.shape {
            BrushShape::Circular => {
                let r2 = (self.radius * self.radius) as f32;
                let d2 = (dx * dx + dy * dy) as f32;
                (d2 <= r2).then(|| (r2 - d2 * soft) / r2)
            }
            BrushShape::Square => {
                let half = self.radius as f32;
                let steps = dx.abs().max(dy.abs()) as f32;
                Some((half - steps * soft) / half)
            }
        }
    }

    #[inline]
    fn paint(&self, cell: &mut ValuePoint, weight: f32) {
        let contribution = weight * self.value * self.opacity;
        if self.overwrite {
            cell.value = contribution;
        } else {
            cell.value += contribution;
        }
    }
}

/// Base grid: every cell at `base_value`, positioned on the target grid.
fn base_grid(resolution: u32, ctx: &TerrainContext, spacing: u32, base_value: f32) -> CoarseGrid {
    CoarseGrid::from_fn(resolution, |x, y| {
        let coord = (x * spacing, y * spacing);
        ValuePoint {
            value: base_value,
            coord,
            world: grid_to_world(
                coord.0 as i32,
                coord.1 as i32,
                ctx.alpha_resolution,
                ctx.size,
                0.0,
            ),
        }
    })
}

/// Splat `points` onto an (R+1)×(R+1) grid. Positions must already be
/// relative to the heatmap's origin.
pub fn rasterize_points(
    points: &[BrushPoint],
    resolution: u32,
    ctx: &TerrainContext,
    base_value: f32,
) -> CoarseGrid {
    let r = resolution.max(1);
    let spacing = cell_spacing(ctx.alpha_resolution, r).max(1);
    let mut grid = base_grid(r, ctx, spacing, base_value);

    for point in points {
        let stroke = Stroke::new(point, ctx, spacing);
        apply_stroke(&mut grid, &stroke);
    }

    grid
}

fn apply_stroke(grid: &mut CoarseGrid, stroke: &Stroke) {
    // Hit cell: no falloff, accumulation is a plain add.
    if grid.contains(stroke.cx, stroke.cy) {
        let cell = grid.get_mut(stroke.cx as u32, stroke.cy as u32);
        let direct = stroke.value * stroke.opacity;
        cell.value = if stroke.overwrite {
            direct
        } else {
            cell.value + direct
        };
    }

    let r = stroke.radius;
    if r <= 0 {
        return;
    }

    // Only offsets that land on the grid; a huge brush costs at most (R+1)².
    let last = grid.resolution as i64;
    let (dx_lo, dx_hi) = ((-r).max(-stroke.cx), r.min(last - stroke.cx));
    let (dy_lo, dy_hi) = ((-r).max(-stroke.cy), r.min(last - stroke.cy));

    for dx in dx_lo..=dx_hi {
        for dy in dy_lo..=dy_hi {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (nx, ny) = (stroke.cx + dx, stroke.cy + dy);
            if !grid.contains(nx, ny) {
                continue;
            }
            if let Some(weight) = stroke.falloff(dx, dy) {
                stroke.paint(grid.get_mut(nx as u32, ny as u32), weight);
            }
        }
    }
}
