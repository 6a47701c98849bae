// eval/range.rs - per-pass threshold resolution
//
// A pass works on a private copy of the thresholds: inversion swaps them,
// auto-constrain replaces them with the data's padded extrema. Afterwards
// the configuration gets back its own thresholds, except that an inversion
// swap sticks: an inverted heatmap alternates its stored thresholds on every
// pass.

use crate::eval::grid::CoarseGrid;
use crate::schema::Thresholds;

/// Padding applied inside the observed extrema when auto-constraining.
pub const AUTO_CONSTRAIN_PADDING: f32 = 1.0;

/// Thresholds for one pass plus what the configuration keeps afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangePlan {
    /// Thresholds the blender uses during this pass.
    pub pass: Thresholds,
    /// Shift applied to raw values before normalisation.
    pub zero_offset: f32,
    /// Thresholds to write back into the configuration after the pass.
    pub persisted: Thresholds,
}

/// Offset that moves `lower` onto zero.
#[inline]
pub fn zero_offset(lower: f32) -> f32 {
    if lower < 0.0 {
        lower.abs()
    } else {
        -lower
    }
}

/// Thresholds from the grid's extrema, padded inwards. Inverted ramps put
/// the padded minimum into `upper`.
pub fn auto_constrain(grid: &CoarseGrid, invert: bool) -> Thresholds {
    let (min, max) = grid.extrema();
    let low = min + AUTO_CONSTRAIN_PADDING;
    let high = max - AUTO_CONSTRAIN_PADDING;
    if invert {
        Thresholds::new(high, low)
    } else {
        Thresholds::new(low, high)
    }
}

/// Resolve the thresholds for a pass over `grid`.
pub fn plan(configured: Thresholds, auto: bool, invert: bool, grid: &CoarseGrid) -> RangePlan {
    let mut pass = if invert {
        configured.swapped()
    } else {
        configured
    };
    if auto {
        pass = auto_constrain(grid, invert);
    }

    RangePlan {
        pass,
        zero_offset: zero_offset(pass.lower),
        persisted: if invert {
            configured.swapped()
        } else {
            configured
        },
    }
}
