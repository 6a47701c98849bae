// eval/blend.rs - normalized value → per-layer weights
//
// A value is shifted and scaled into layer-index space [-1, N-1]. Below 0 it
// saturates on layer 0, at or above N-1 on the last layer, and in between it
// cross-fades the two layers around it. At most two adjacent layers are
// non-zero and every cell sums to 1.

use crate::error::{HeatmapError, HeatmapResult};
use crate::eval::grid::{ValueMap, WeightMap};
use crate::eval::range::RangePlan;
use crate::eval::should_cancel;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::sync::atomic::AtomicBool;

/// Position of raw value `v` in layer-index space for `layers` layers.
#[inline]
pub fn layer_position(v: f32, plan: &RangePlan, layers: usize) -> f32 {
    let n = layers as f32;
    let upper = plan.pass.upper;
    let lower = plan.pass.lower;

    let mut v = v + plan.zero_offset;
    v += upper / n;
    v /= upper - lower;
    v = v * n - 1.0;

    if v.is_nan() {
        0.0
    } else {
        v
    }
}

/// Write the weights for raw value `v` into `weights` (one slot per layer).
/// Returns false, leaving `weights` untouched, if no layer band matches.
pub fn blend_cell(v: f32, plan: &RangePlan, weights: &mut [f32]) -> bool {
    let n = weights.len();
    if n == 0 {
        return true;
    }
    let pos = layer_position(v, plan, n);
    let last = n - 1;

    if pos < 0.0 {
        weights.fill(0.0);
        weights[0] = 1.0;
        return true;
    }
    if pos >= last as f32 {
        weights.fill(0.0);
        weights[last] = 1.0;
        return true;
    }

    for k in (1..n).rev() {
        let below = (k - 1) as f32;
        if pos < k as f32 && pos >= below {
            let t = pos - below;
            weights.fill(0.0);
            weights[k] = t;
            weights[k - 1] = 1.0 - t;
            return true;
        }
    }

    log::error!("no layer band for value {v} (layer position {pos}, {n} layers)");
    false
}

/// Weights for a single value, mostly for callers inspecting one cell.
pub fn layer_weights(v: f32, plan: &RangePlan, layers: usize) -> SmallVec<[f32; 8]> {
    let mut weights: SmallVec<[f32; 8]> = SmallVec::from_elem(0.0, layers);
    blend_cell(v, plan, &mut weights);
    weights
}

/// Blend every cell of `values` into `out`, which must be sized to
/// `values.rect`. Rows run in parallel and check `cancel` first.
pub fn blend_region(
    values: &ValueMap,
    plan: &RangePlan,
    out: &mut WeightMap,
    cancel: &AtomicBool,
) -> HeatmapResult<()> {
    let rect = values.rect;
    if out.width != rect.width || out.height != rect.height {
        return Err(HeatmapError::OutOfBounds {
            rect,
            coarse: out.width,
            target: out.height,
        });
    }
    if out.layers == 0 || rect.area() == 0 {
        return Ok(());
    }

    let layers = out.layers;
    let row_len = out.row_len();
    let height = rect.height as usize;

    out.data
        .par_chunks_mut(row_len)
        .zip(values.values.par_chunks(height))
        .try_for_each(|(out_row, value_row)| {
            if should_cancel(cancel) {
                return Err(HeatmapError::Cancelled);
            }
            for (cell, &v) in out_row.chunks_mut(layers).zip(value_row) {
                blend_cell(v, plan, cell);
            }
            Ok(())
        })
}
