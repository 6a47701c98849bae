// eval/mod.rs - the heatmap generation engine
//
// Stages, leaves first: coords → height | brush → range → resample → blend.
// `pipeline` strings them together for one sub-rectangle, `chunks` plans and
// drives chunked refreshes, `cache` keeps recent coarse grids.

pub mod blend;
pub mod brush;
pub mod cache;
pub mod chunks;
pub mod coords;
pub mod grid;
pub mod height;
pub mod pipeline;
pub mod range;
pub mod resample;
pub mod splat;

use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation check, done once per row of parallel work.
#[inline]
pub(crate) fn should_cancel(cancel: &AtomicBool) -> bool {
    cancel.load(Ordering::Relaxed)
}
