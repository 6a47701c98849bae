// eval/pipeline.rs - one pass of the engine over a target sub-rectangle
//
// coarse grid (height sampler | point rasterizer, optionally cached)
//   → range plan → resample onto the rect → blend into per-layer weights
//
// `run_region` is what a background job executes. `generate` is the
// synchronous full-grid pass that also installs the result on a heatmap.

use crate::error::{HeatmapError, HeatmapResult};
use crate::eval::blend::blend_region;
use crate::eval::brush::rasterize_points;
use crate::eval::cache::{GridCache, GridKey};
use crate::eval::grid::{CoarseGrid, WeightMap};
use crate::eval::height::sample_heights;
use crate::eval::range::{self, RangePlan};
use crate::eval::resample::resample;
use crate::eval::splat;
use crate::heatmaps::{CommitOutcome, Heatmap, SkipReason};
use crate::schema::{
    BrushPoint, DataSource, HeatmapConfig, HeightField, PointProvider, Rect, TerrainContext,
    TerrainProvider, Thresholds,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Input data for a pass, captured up front. Cheap to clone into a job.
#[derive(Debug, Clone)]
pub struct SourceData {
    pub heights: Option<Arc<HeightField>>,
    /// Already filtered by the heatmap's tag, positions in world space.
    pub points: Arc<[BrushPoint]>,
}

impl Default for SourceData {
    fn default() -> Self {
        Self::from_points(Vec::new())
    }
}

impl SourceData {
    pub fn from_heights(heights: HeightField) -> Self {
        Self {
            heights: Some(Arc::new(heights)),
            points: Arc::from(Vec::new()),
        }
    }

    pub fn from_points(points: Vec<BrushPoint>) -> Self {
        Self {
            heights: None,
            points: Arc::from(points),
        }
    }

    /// Read whatever `config`'s data source needs from the providers.
    pub fn capture(
        config: &HeatmapConfig,
        terrain: &(impl TerrainProvider + ?Sized),
        points: &(impl PointProvider + ?Sized),
    ) -> Self {
        match config.data_source {
            DataSource::HeightField => Self::from_heights(terrain.all_heights()),
            DataSource::CustomPoints => Self::from_points(points.points(&config.filter)),
        }
    }
}

/// Result of one pass over `rect`.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub rect: Rect,
    /// `rect.width × rect.height × layer_count`.
    pub weights: WeightMap,
    /// Layer count of the configuration snapshot the pass ran with.
    pub layer_count: usize,
    /// Thresholds the blender used.
    pub pass: Thresholds,
    /// Thresholds to store back on the heatmap.
    pub persisted: Thresholds,
    pub grid: Arc<CoarseGrid>,
}

/// Populate the coarse grid for `config` from `source`.
pub fn build_coarse_grid(
    config: &HeatmapConfig,
    ctx: &TerrainContext,
    source: &SourceData,
) -> HeatmapResult<CoarseGrid> {
    if config.resolution < 1 {
        return Err(HeatmapError::InvalidResolution(config.resolution));
    }
    match config.data_source {
        DataSource::HeightField => {
            let heights = source.heights.as_deref().ok_or(HeatmapError::MissingHeights)?;
            if !heights.is_valid() {
                return Err(HeatmapError::InvalidHeightField {
                    resolution: heights.resolution,
                    len: heights.values.len(),
                });
            }
            Ok(sample_heights(config.resolution, ctx, heights))
        }
        DataSource::CustomPoints => {
            let local: Vec<BrushPoint> = source
                .points
                .iter()
                .map(|p| BrushPoint {
                    position: p.position - ctx.origin,
                    ..p.clone()
                })
                .collect();
            Ok(rasterize_points(&local, config.resolution, ctx, config.base_value))
        }
    }
}

/// Coarse grid for `config`, served from `cache` when one is given.
pub fn coarse_grid(
    config: &HeatmapConfig,
    ctx: &TerrainContext,
    source: &SourceData,
    cache: Option<&GridCache>,
) -> HeatmapResult<Arc<CoarseGrid>> {
    let Some(cache) = cache else {
        return build_coarse_grid(config, ctx, source).map(Arc::new);
    };
    let key = GridKey {
        resolution: config.resolution,
        data_source: config.data_source,
        base_value: config.base_value,
        ctx,
        heights: source.heights.as_deref(),
        points: &source.points,
    }
    .digest();
    cache.get_or_insert_with(key, || build_coarse_grid(config, ctx, source))
}

/// Run every stage for `rect` of the target grid.
pub fn run_region(
    config: &HeatmapConfig,
    ctx: &TerrainContext,
    source: &SourceData,
    rect: Rect,
    cancel: &AtomicBool,
    cache: Option<&GridCache>,
) -> HeatmapResult<JobOutput> {
    let layer_count = splat::layer_count(config);
    if layer_count == 0 {
        return Err(HeatmapError::NoLayers);
    }

    let grid = coarse_grid(config, ctx, source, cache)?;
    let plan: RangePlan = range::plan(
        config.thresholds(),
        config.auto_constrain,
        config.invert,
        &grid,
    );

    let values = resample(&grid, config.interpolation, ctx.alpha_resolution, rect, cancel)?;
    let mut weights = WeightMap::new(rect.width, rect.height, layer_count);
    blend_region(&values, &plan, &mut weights, cancel)?;

    Ok(JobOutput {
        rect,
        weights,
        layer_count,
        pass: plan.pass,
        persisted: plan.persisted,
        grid,
    })
}

/// Regenerate `heatmap` over the whole target grid on the calling thread.
///
/// Prototypes are rebuilt and the weight buffer is replaced. A custom texture
/// source without layers skips the pass and leaves the heatmap as it was.
pub fn generate(
    heatmap: &mut Heatmap,
    ctx: &TerrainContext,
    source: &SourceData,
    cache: Option<&GridCache>,
) -> HeatmapResult<CommitOutcome> {
    let prototypes = match splat::prototypes(&heatmap.config) {
        Ok(p) => p,
        Err(HeatmapError::NoLayers) => {
            log::debug!("'{}': no custom layers, skipping pass", heatmap.config.name);
            return Ok(CommitOutcome::Skipped(SkipReason::NoLayers));
        }
        Err(e) => return Err(e),
    };

    let idle = AtomicBool::new(false);
    let output = run_region(
        &heatmap.config,
        ctx,
        source,
        Rect::full(ctx.alpha_resolution),
        &idle,
        cache,
    )?;
    heatmap.install(prototypes, output);
    Ok(CommitOutcome::Written)
}
