//! Heatmap splat-map generation for terrains.
//!
//! A heatmap turns a scalar field (terrain height, or values painted with
//! brush points) into per-layer blend weights on the terrain's alpha-map
//! grid. The engine lives in [`eval`]; [`jobs`] runs it in the background,
//! [`heatmaps`] holds computed state, [`commands`] wraps it for JSON hosts.

pub mod commands;
pub mod error;
pub mod eval;
pub mod heatmaps;
pub mod jobs;
pub mod schema;

pub use error::{HeatmapError, HeatmapResult};
pub use eval::pipeline::{generate, JobOutput, SourceData};
pub use heatmaps::{CommitOutcome, Heatmap, HeatmapSet, SkipReason};
pub use jobs::{JobController, JobRequest, JobStatus};
