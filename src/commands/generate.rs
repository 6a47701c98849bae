use crate::error::{HeatmapError, HeatmapResult};
use crate::eval::pipeline::{self, SourceData};
use crate::eval::splat::{self, SplatPrototype};
use crate::heatmaps::SkipReason;
use crate::schema::{filter_points, BrushPoint, DataSource, HeatmapConfig, HeightField, Rect, TerrainContext};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Heatmap configuration
    pub config: HeatmapConfig,
    /// Terrain sizing and the heatmap owner's position
    pub terrain: TerrainContext,
    /// Raw height field, required for the height-field data source
    #[serde(default)]
    pub heights: Option<HeightField>,
    /// Brush points; filtered by the configuration's tag
    #[serde(default)]
    pub points: Vec<BrushPoint>,
    /// Sub-rectangle of the target grid; the whole grid when omitted
    #[serde(default)]
    pub region: Option<Rect>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Flattened weights, x-major, `layers` floats per cell
    pub weights: Vec<f32>,
    pub region: Rect,
    pub layers: usize,
    /// Thresholds the blend used
    pub lower_threshold: f32,
    pub upper_threshold: f32,
    /// Thresholds the configuration holds after the pass
    pub config: HeatmapConfig,
    pub prototypes: Vec<SplatPrototype>,
    /// Set when the pass was skipped; `weights` is then empty
    pub skipped: Option<SkipReason>,
}

/// Run one heatmap pass and return its weights.
pub fn generate_heatmap(request: GenerateRequest) -> Result<GenerateResponse, String> {
    run(request).map_err(|e| format!("Heatmap generation failed: {}", e))
}

/// JSON in, JSON out, for hosts that talk strings.
pub fn generate_heatmap_json(request: &str) -> Result<String, String> {
    run_json(request).map_err(|e| e.to_string())
}

fn run_json(request: &str) -> HeatmapResult<String> {
    let request: GenerateRequest = serde_json::from_str(request)?;
    let response = run(request)?;
    Ok(serde_json::to_string(&response)?)
}

fn run(request: GenerateRequest) -> HeatmapResult<GenerateResponse> {
    let GenerateRequest {
        config,
        terrain,
        heights,
        points,
        region,
    } = request;

    let source = match config.data_source {
        DataSource::HeightField => {
            SourceData::from_heights(heights.ok_or(HeatmapError::MissingHeights)?)
        }
        DataSource::CustomPoints => SourceData::from_points(filter_points(&points, &config.filter)),
    };

    let rect = region.unwrap_or_else(|| Rect::full(terrain.alpha_resolution));
    run_pass(config, &terrain, &source, rect)
}

fn run_pass(
    mut config: HeatmapConfig,
    terrain: &TerrainContext,
    source: &SourceData,
    rect: Rect,
) -> HeatmapResult<GenerateResponse> {
    let prototypes = match splat::prototypes(&config) {
        Ok(p) => p,
        Err(HeatmapError::NoLayers) => {
            let t = config.thresholds();
            return Ok(GenerateResponse {
                weights: Vec::new(),
                region: rect,
                layers: 0,
                lower_threshold: t.lower,
                upper_threshold: t.upper,
                config,
                prototypes: Vec::new(),
                skipped: Some(SkipReason::NoLayers),
            });
        }
        Err(e) => return Err(e),
    };

    let idle = AtomicBool::new(false);
    let output = pipeline::run_region(&config, terrain, source, rect, &idle, None)?;
    config.set_thresholds(output.persisted);

    Ok(GenerateResponse {
        weights: output.weights.data,
        region: rect,
        layers: output.layer_count,
        lower_threshold: output.pass.lower,
        upper_threshold: output.pass.upper,
        config,
        prototypes,
        skipped: None,
    })
}
