// eval/resample.rs - coarse grid → target sub-rectangle
//
// Rows (x indices) of the requested sub-rectangle are resampled in parallel
// with rayon. Each row first checks the cancellation flag, so an abort takes
// effect at the next row boundary and the whole call returns `Cancelled`.
//
// When the coarse resolution equals the target resolution the grid is copied
// as-is regardless of the configured mode.

use crate::error::{HeatmapError, HeatmapResult};
use crate::eval::coords::cell_spacing;
use crate::eval::grid::{CoarseGrid, ValueMap};
use crate::eval::should_cancel;
use crate::schema::{InterpolationMode, Rect};
use rayon::prelude::*;
use std::sync::atomic::AtomicBool;

/// Resample `grid` onto `rect` of a `target × target` grid.
pub fn resample(
    grid: &CoarseGrid,
    mode: InterpolationMode,
    target: u32,
    rect: Rect,
    cancel: &AtomicBool,
) -> HeatmapResult<ValueMap> {
    if !rect.fits(target) {
        return Err(out_of_bounds(grid, target, rect));
    }
    if grid.resolution == target {
        return copy_direct(grid, target, rect, cancel);
    }
    match mode {
        InterpolationMode::None => Err(HeatmapError::ResolutionMismatch {
            coarse: grid.resolution,
            target,
        }),
        InterpolationMode::NearestNeighbor => nearest_neighbor(grid, target, rect, cancel),
        InterpolationMode::Bilinear => bilinear(grid, target, rect, cancel),
    }
}

/// `result[i, j] = grid[i, j]`. Requires R == target.
pub fn copy_direct(
    grid: &CoarseGrid,
    target: u32,
    rect: Rect,
    cancel: &AtomicBool,
) -> HeatmapResult<ValueMap> {
    if grid.resolution != target {
        return Err(HeatmapError::ResolutionMismatch {
            coarse: grid.resolution,
            target,
        });
    }
    fill_rows(rect, cancel, |i, j| grid.value(i, j))
}

/// Copy the value of the closest coarse cell.
pub fn nearest_neighbor(
    grid: &CoarseGrid,
    target: u32,
    rect: Rect,
    cancel: &AtomicBool,
) -> HeatmapResult<ValueMap> {
    let spacing = spacing_of(grid, target)?;
    let nearest = |t: u32| (t as f32 / spacing).round_ties_even() as u32;

    if rect.area() > 0
        && (nearest(rect.x_end() - 1) > grid.resolution
            || nearest(rect.y_end() - 1) > grid.resolution)
    {
        return Err(out_of_bounds(grid, target, rect));
    }

    fill_rows(rect, cancel, |i, j| grid.value(nearest(i), nearest(j)))
}

/// Bilinear interpolation between the four surrounding coarse cells,
/// weighted by the cells' stored target coordinates.
pub fn bilinear(
    grid: &CoarseGrid,
    target: u32,
    rect: Rect,
    cancel: &AtomicBool,
) -> HeatmapResult<ValueMap> {
    let spacing = spacing_of(grid, target)?;
    let lower = |t: u32| (t as f32 / spacing).floor() as u32;

    // The +1 neighbour of the last row/column must exist.
    if rect.area() > 0
        && (lower(rect.x_end() - 1) + 1 > grid.resolution
            || lower(rect.y_end() - 1) + 1 > grid.resolution)
    {
        return Err(out_of_bounds(grid, target, rect));
    }

    fill_rows(rect, cancel, |i, j| {
        let (x0, y0) = (lower(i), lower(j));
        let q00 = grid.get(x0, y0);
        let q01 = grid.get(x0, y0 + 1);
        let q10 = grid.get(x0 + 1, y0);
        let q11 = grid.get(x0 + 1, y0 + 1);

        let xt = fraction(i, q00.coord.0, q10.coord.0);
        let yt = fraction(j, q00.coord.1, q01.coord.1);

        let r1 = lerp(q00.value, q10.value, xt);
        let r2 = lerp(q01.value, q11.value, xt);
        lerp(r1, r2, yt)
    })
}

/// Position of `t` between `from` and `to`. A zero span yields 0.
#[inline]
fn fraction(t: u32, from: u32, to: u32) -> f32 {
    let span = to as f32 - from as f32;
    if span == 0.0 {
        return 0.0;
    }
    (t as f32 - from as f32) / span
}

/// Linear interpolation with `t` clamped to [0, 1].
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

fn spacing_of(grid: &CoarseGrid, target: u32) -> HeatmapResult<f32> {
    match cell_spacing(target, grid.resolution) {
        0 => Err(HeatmapError::ResolutionMismatch {
            coarse: grid.resolution,
            target,
        }),
        s => Ok(s as f32),
    }
}

fn out_of_bounds(grid: &CoarseGrid, target: u32, rect: Rect) -> HeatmapError {
    HeatmapError::OutOfBounds {
        rect,
        coarse: grid.resolution,
        target,
    }
}

/// Evaluate `sample(i, j)` for every cell of `rect`, one parallel task per row.
fn fill_rows(
    rect: Rect,
    cancel: &AtomicBool,
    sample: impl Fn(u32, u32) -> f32 + Sync,
) -> HeatmapResult<ValueMap> {
    let mut map = ValueMap::zeroed(rect);
    let height = rect.height as usize;
    if height == 0 {
        return Ok(map);
    }

    map.values
        .par_chunks_mut(height)
        .enumerate()
        .try_for_each(|(lx, row)| {
            if should_cancel(cancel) {
                return Err(HeatmapError::Cancelled);
            }
            let i = rect.x + lx as u32;
            for (ly, out) in row.iter_mut().enumerate() {
                *out = sample(i, rect.y + ly as u32);
            }
            Ok(())
        })?;

    Ok(map)
}
