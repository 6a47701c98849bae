// error.rs - crate-wide error type
//
// Numeric edge cases (NaN, degenerate thresholds) are clamped inline by the
// engine and never surface here. What does surface is configuration that
// cannot be evaluated at all, precondition violations caught before any
// work starts, and cooperative cancellation.

use crate::schema::Rect;

#[derive(thiserror::Error, Debug)]
pub enum HeatmapError {
    #[error("invalid heatmap resolution {0}: must be at least 1")]
    InvalidResolution(u32),

    #[error("interpolation disabled but heatmap resolution {coarse} differs from target {target}")]
    ResolutionMismatch { coarse: u32, target: u32 },

    #[error("sub-rectangle {rect:?} exceeds the interpolable range of a {coarse}x{coarse} heatmap on a {target} target")]
    OutOfBounds { rect: Rect, coarse: u32, target: u32 },

    #[error("layer count changed from {expected} to {actual}")]
    LayerCountMismatch { expected: usize, actual: usize },

    #[error("custom texture source selected but no layers are configured")]
    NoLayers,

    #[error("height-field data source selected but no heights were supplied")]
    MissingHeights,

    #[error("height field of resolution {resolution} holds {len} samples")]
    InvalidHeightField { resolution: usize, len: usize },

    #[error("a job is already running on this controller")]
    JobAlreadyRunning,

    #[error("job cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HeatmapResult<T> = Result<T, HeatmapError>;
