//! Integration tests for the heatmap engine through its public API.
//!
//! These tests verify:
//!   1. Every target cell's layer weights sum to 1 after a full pass
//!   2. The dominant layer never drops as the input value rises
//!   3. Threshold saturation and the five-layer reference values
//!   4. Resample identity and nearest-neighbour parity at equal resolution
//!   5. Brush overwrite/additivity on the coarse grid
//!   6. Auto-constrain and inversion bookkeeping across passes
//!   7. Job controller abort/restart and stale-write skipping
//!   8. Chunked refresh matches a full synchronous pass, timeouts keep old output
//!   9. JSON command path: parse → generate → serialize, malformed input is an error

use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use terrain_heatmap::commands::{generate_heatmap, generate_heatmap_json, GenerateRequest};
use terrain_heatmap::eval::blend::layer_weights;
use terrain_heatmap::eval::brush::rasterize_points;
use terrain_heatmap::eval::cache::GridCache;
use terrain_heatmap::eval::chunks::{refresh_chunked, ChunkOutcome};
use terrain_heatmap::eval::grid::{CoarseGrid, ValuePoint, WeightMap};
use terrain_heatmap::eval::range::{self, auto_constrain, RangePlan};
use terrain_heatmap::eval::resample::{copy_direct, nearest_neighbor, resample};
use terrain_heatmap::schema::{
    BrushPoint, DataSource, EngineSettings, HeatmapConfig, InterpolationMode, LayerDescriptor,
    Rect, Rgba, StaticTerrain, TerrainContext, TerrainProvider, TextureSource, Thresholds, Vec3,
};
use terrain_heatmap::{
    generate, CommitOutcome, Heatmap, HeatmapSet, JobController, JobRequest, JobStatus,
    SkipReason, SourceData,
};

// ── Helpers ────────────────────────────────────────────────────────

const PATIENCE: Duration = Duration::from_secs(30);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 128×128 world units, 40 high, 64-cell alpha map. Height rises with the
/// row index (world z, grid x) from 0 to 1.
fn terrain() -> StaticTerrain {
    StaticTerrain {
        size: Vec3::new(128.0, 40.0, 128.0),
        alpha_resolution: 64,
        heights: terrain_heatmap::schema::HeightField::from_fn(65, |row, _| row as f32 / 64.0),
    }
}

fn height_config(resolution: u32) -> HeatmapConfig {
    let mut config = HeatmapConfig::named("elevation");
    config.resolution = resolution;
    config.set_thresholds(Thresholds::new(0.0, 40.0));
    config
}

fn full_pass(config: HeatmapConfig) -> Heatmap {
    let terrain = terrain();
    let ctx = TerrainContext::capture(&terrain, Vec3::ZERO);
    let source = SourceData::capture(&config, &terrain, &Vec::<BrushPoint>::new());
    let mut heatmap = Heatmap::new(config);
    let outcome = generate(&mut heatmap, &ctx, &source, None).unwrap();
    assert_eq!(outcome, CommitOutcome::Written);
    heatmap
}

fn assert_sums_to_one(weights: &WeightMap) {
    for x in 0..weights.width {
        for y in 0..weights.height {
            let sum: f32 = weights.cell(x, y).iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "cell ({x},{y}) sums to {sum}");
        }
    }
}

fn dominant(cell: &[f32]) -> usize {
    let mut best = 0;
    for (i, &w) in cell.iter().enumerate() {
        if w > cell[best] {
            best = i;
        }
    }
    best
}

fn uniform_grid(resolution: u32, target: u32, f: impl Fn(u32, u32) -> f32) -> CoarseGrid {
    let s = target / resolution;
    CoarseGrid::from_fn(resolution, |x, y| ValuePoint {
        value: f(x, y),
        coord: (x * s, y * s),
        world: Vec3::ZERO,
    })
}

// ── Weight invariants ──────────────────────────────────────────────

#[test]
fn full_pass_weights_sum_to_one() {
    init_logging();
    for mode in [InterpolationMode::NearestNeighbor, InterpolationMode::Bilinear] {
        let mut config = height_config(16);
        config.interpolation = mode;
        let heatmap = full_pass(config);
        let weights = heatmap.weights().unwrap();
        assert_eq!((weights.width, weights.height, weights.layers), (64, 64, 5));
        assert_sums_to_one(weights);
    }
}

#[test]
fn custom_layers_weights_sum_to_one() {
    init_logging();
    let mut config = height_config(32);
    config.texture_source = TextureSource::Custom;
    config.layers = vec![
        LayerDescriptor::solid(Rgba::BLUE),
        LayerDescriptor::solid(Rgba::GREEN),
        LayerDescriptor::solid(Rgba::RED),
    ];
    let heatmap = full_pass(config);
    let weights = heatmap.weights().unwrap();
    assert_eq!(weights.layers, 3);
    assert_eq!(heatmap.prototypes().len(), 3);
    assert_sums_to_one(weights);
}

#[test]
fn dominant_layer_rises_with_height() {
    init_logging();
    let heatmap = full_pass(height_config(16));
    let weights = heatmap.weights().unwrap();
    for y in [0, 17, 63] {
        let mut previous = 0;
        for x in 0..64 {
            let top = dominant(weights.cell(x, y));
            assert!(top >= previous, "rank dropped at ({x},{y})");
            previous = top;
        }
        assert_eq!(dominant(weights.cell(0, y)), 0);
        assert_eq!(dominant(weights.cell(63, y)), 4);
    }
}

#[test]
fn five_layer_reference_values() {
    let plan = RangePlan {
        pass: Thresholds::new(0.0, 100.0),
        zero_offset: range::zero_offset(0.0),
        persisted: Thresholds::new(0.0, 100.0),
    };
    assert_eq!(layer_weights(0.0, &plan, 5).as_slice(), &[1.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(layer_weights(100.0, &plan, 5).as_slice(), &[0.0, 0.0, 0.0, 0.0, 1.0]);

    let mid = layer_weights(50.0, &plan, 5);
    let nonzero: Vec<usize> = (0..5).filter(|&i| mid[i] > 0.0).collect();
    assert_eq!(nonzero, vec![2, 3]);
    assert!((mid[2] + mid[3] - 1.0).abs() < 1e-6);

    // anything below the lower threshold saturates too
    assert_eq!(layer_weights(-30.0, &plan, 5)[0], 1.0);
    assert_eq!(layer_weights(130.0, &plan, 5)[4], 1.0);
}

// ── Resampling ─────────────────────────────────────────────────────

#[test]
fn explicit_none_is_identity_at_equal_resolution() {
    let grid = uniform_grid(8, 8, |x, y| (x * 31 + y * 7) as f32 * 0.5);
    let idle = AtomicBool::new(false);
    let out = resample(&grid, InterpolationMode::None, 8, Rect::full(8), &idle).unwrap();
    for i in 0..8 {
        for j in 0..8 {
            assert_eq!(out.get(i, j), grid.value(i, j));
        }
    }
}

#[test]
fn nearest_neighbor_matches_identity_for_r4() {
    let grid = uniform_grid(4, 4, |x, y| x as f32 - 3.0 * y as f32);
    let idle = AtomicBool::new(false);
    let nn = nearest_neighbor(&grid, 4, Rect::full(4), &idle).unwrap();
    let id = copy_direct(&grid, 4, Rect::full(4), &idle).unwrap();
    assert_eq!(nn, id);
}

#[test]
fn terrain_aspect_does_not_skew_bilinear_output() {
    init_logging();
    let mut config = height_config(16);
    config.interpolation = InterpolationMode::Bilinear;
    let square = full_pass(config.clone());

    let mut wide = terrain();
    wide.size = Vec3::new(256.0, 40.0, 128.0);
    let ctx = TerrainContext::capture(&wide, Vec3::ZERO);
    let source = SourceData::from_heights(wide.all_heights());
    let mut heatmap = Heatmap::new(config);
    generate(&mut heatmap, &ctx, &source, None).unwrap();

    let coarse = heatmap.coarse_grid().unwrap();
    assert_eq!(coarse.get(16, 16).coord, (64, 64));
    assert_eq!(heatmap.weights(), square.weights());
}

// ── Brush points ───────────────────────────────────────────────────

#[test]
fn single_overwrite_point_sets_one_cell() {
    let ctx = TerrainContext {
        size: Vec3::new(64.0, 10.0, 64.0),
        alpha_resolution: 64,
        height_scale: 10.0,
        origin: Vec3::ZERO,
    };
    let point = BrushPoint {
        position: Vec3::new(20.0, 0.0, 12.0),
        value: 17.0,
        brush_size: 0,
        opacity: 100.0,
        overwrite: true,
        ..BrushPoint::default()
    };
    let grid = rasterize_points(&[point], 16, &ctx, 2.0);

    let touched: Vec<(u32, u32)> = (0..=16)
        .flat_map(|x| (0..=16).map(move |y| (x, y)))
        .filter(|&(x, y)| grid.value(x, y) != 2.0)
        .collect();
    // world z = 12 → grid x 12 / 4 = 3; world x = 20 → grid y 20 / 4 = 5
    assert_eq!(touched, vec![(3, 5)]);
    assert_eq!(grid.value(3, 5), 17.0);
}

#[test]
fn point_heatmap_filters_by_tag() {
    init_logging();
    let terrain = terrain();
    let ctx = TerrainContext::capture(&terrain, Vec3::ZERO);
    let mut config = HeatmapConfig::named("samples");
    config.data_source = DataSource::CustomPoints;
    config.resolution = 16;
    config.filter = "rain".to_string();

    let point = |filter: &str, value: f32| BrushPoint {
        position: Vec3::new(64.0, 0.0, 64.0),
        value,
        brush_size: 0,
        filter: filter.to_string(),
        ..BrushPoint::default()
    };
    let points = vec![point("rain", 100.0), point("wind", -100.0)];
    let source = SourceData::capture(&config, &terrain, &points);
    assert_eq!(source.points.len(), 1);

    let mut heatmap = Heatmap::new(config);
    generate(&mut heatmap, &ctx, &source, None).unwrap();
    let coarse = heatmap.coarse_grid().unwrap();
    assert_eq!(coarse.value(8, 8), 100.0);
    assert_eq!(coarse.extrema(), (0.0, 100.0));
    assert_sums_to_one(heatmap.weights().unwrap());
}

// ── Thresholds ─────────────────────────────────────────────────────

#[test]
fn auto_constrain_pads_known_extrema() {
    let grid = uniform_grid(2, 4, |x, y| match (x, y) {
        (0, 0) => 10.0,
        (2, 2) => 90.0,
        _ => 50.0,
    });
    assert_eq!(auto_constrain(&grid, false), Thresholds::new(11.0, 89.0));
}

#[test]
fn auto_constrain_is_reverted_after_the_pass() {
    init_logging();
    let mut config = height_config(16);
    config.set_thresholds(Thresholds::new(0.0, 100.0));
    config.auto_constrain = true;
    let heatmap = full_pass(config);
    assert_eq!(heatmap.config.thresholds(), Thresholds::new(0.0, 100.0));
    // data spans 0..40, so the top row still reaches the last layer
    assert_eq!(dominant(heatmap.weights().unwrap().cell(63, 0)), 4);
}

#[test]
fn inversion_swap_persists_between_passes() {
    init_logging();
    let mut config = height_config(16);
    config.invert = true;
    let terrain = terrain();
    let ctx = TerrainContext::capture(&terrain, Vec3::ZERO);
    let source = SourceData::from_heights(terrain.all_heights());
    let mut heatmap = Heatmap::new(config);

    generate(&mut heatmap, &ctx, &source, None).unwrap();
    assert_eq!(heatmap.config.thresholds(), Thresholds::new(40.0, 0.0));
    generate(&mut heatmap, &ctx, &source, None).unwrap();
    assert_eq!(heatmap.config.thresholds(), Thresholds::new(0.0, 40.0));
}

#[test]
fn empty_custom_layers_leave_previous_output() {
    init_logging();
    let mut heatmap = full_pass(height_config(16));
    let before = heatmap.weights().cloned();

    heatmap.config.texture_source = TextureSource::Custom;
    let terrain = terrain();
    let ctx = TerrainContext::capture(&terrain, Vec3::ZERO);
    let source = SourceData::from_heights(terrain.all_heights());
    let outcome = generate(&mut heatmap, &ctx, &source, None).unwrap();

    assert_eq!(outcome, CommitOutcome::Skipped(SkipReason::NoLayers));
    assert_eq!(heatmap.weights().cloned(), before);
    assert_eq!(heatmap.prototypes().len(), 5);
}

// ── Jobs ───────────────────────────────────────────────────────────

fn job(config: HeatmapConfig, rect: Rect) -> JobRequest {
    let terrain = terrain();
    JobRequest {
        ctx: TerrainContext::capture(&terrain, Vec3::ZERO),
        source: SourceData::capture(&config, &terrain, &Vec::<BrushPoint>::new()),
        config,
        rect,
        cache: None,
    }
}

#[test]
fn abort_reports_aborted_and_restart_succeeds() {
    init_logging();
    let mut jobs = JobController::new();
    jobs.start(job(height_config(16), Rect::full(64))).unwrap();
    jobs.abort();

    assert_eq!(jobs.status(), JobStatus::Aborted);
    assert_eq!(jobs.poll(), JobStatus::Aborted);
    assert!(jobs.result().is_none());

    jobs.start(job(height_config(16), Rect::new(0, 32, 32, 32)))
        .unwrap();
    assert_eq!(jobs.wait(PATIENCE), JobStatus::Completed);
    let out = jobs.result().unwrap();
    assert_eq!(out.rect, Rect::new(0, 32, 32, 32));
    assert_sums_to_one(&out.weights);
}

#[test]
fn layer_change_during_a_job_skips_the_write() {
    init_logging();
    let mut heatmap = Heatmap::new(height_config(16));
    assert!(heatmap.prepare(64).is_written());

    let mut jobs = JobController::new();
    jobs.start(job(heatmap.config.clone(), Rect::new(0, 0, 32, 32)))
        .unwrap();

    // the user switches to a three-layer custom list mid-flight
    heatmap.config.texture_source = TextureSource::Custom;
    heatmap.push_layer(LayerDescriptor::solid(Rgba::BLUE));
    heatmap.push_layer(LayerDescriptor::solid(Rgba::YELLOW));
    heatmap.push_layer(LayerDescriptor::solid(Rgba::RED));

    assert_eq!(jobs.wait(PATIENCE), JobStatus::Completed);
    let output = jobs.take_result().unwrap();
    assert_eq!(
        heatmap.commit_chunk(&output),
        CommitOutcome::Skipped(SkipReason::LayerCountChanged {
            snapshot: 5,
            current: 3
        })
    );
    assert!(heatmap.weights().unwrap().data.iter().all(|&w| w == 0.0));
}

#[test]
fn chunked_refresh_matches_a_full_pass() {
    init_logging();
    let config = height_config(16);
    let expected = full_pass(config.clone());

    let terrain = terrain();
    let ctx = TerrainContext::capture(&terrain, Vec3::ZERO);
    let source = SourceData::capture(&config, &terrain, &Vec::<BrushPoint>::new());
    let settings = EngineSettings {
        chunk_multiplier: 4,
        job_timeout_ms: PATIENCE.as_millis() as u64,
        ..EngineSettings::default()
    };
    let cache = Arc::new(GridCache::new(settings.cache_capacity));

    let mut heatmap = Heatmap::new(config);
    let mut jobs = JobController::new();
    let report = refresh_chunked(
        &mut jobs,
        &mut heatmap,
        &ctx,
        &source,
        &settings,
        Some(Arc::clone(&cache)),
    )
    .unwrap();

    assert_eq!(report.chunks.len(), 16);
    assert!(report.is_complete(), "{report:?}");
    assert_eq!(cache.len(), 1);
    assert_eq!(heatmap.weights(), expected.weights());
    assert_eq!(heatmap.prototypes(), expected.prototypes());
}

#[test]
fn chunked_refresh_skips_without_layers() {
    let mut config = height_config(16);
    config.texture_source = TextureSource::Custom;
    let terrain = terrain();
    let ctx = TerrainContext::capture(&terrain, Vec3::ZERO);
    let source = SourceData::from_heights(terrain.all_heights());

    let mut heatmap = Heatmap::new(config);
    let report = refresh_chunked(
        &mut JobController::new(),
        &mut heatmap,
        &ctx,
        &source,
        &EngineSettings::default(),
        None,
    )
    .unwrap();
    assert_eq!(report.skipped, Some(SkipReason::NoLayers));
    assert!(report.chunks.is_empty());
    assert!(heatmap.weights().is_none());
}

#[test]
fn timed_out_chunks_keep_previous_output() {
    init_logging();
    let mut big = terrain();
    big.alpha_resolution = 1024;
    let ctx = TerrainContext::capture(&big, Vec3::ZERO);
    let mut config = height_config(64);
    config.interpolation = InterpolationMode::Bilinear;
    let source = SourceData::from_heights(big.all_heights());

    let mut heatmap = Heatmap::new(config);
    generate(&mut heatmap, &ctx, &source, None).unwrap();
    let before = heatmap.weights().cloned();

    // no chunk can finish within a zero timeout
    let settings = EngineSettings {
        chunk_multiplier: 2,
        job_timeout_ms: 0,
        ..EngineSettings::default()
    };
    let mut jobs = JobController::new();
    let report =
        refresh_chunked(&mut jobs, &mut heatmap, &ctx, &source, &settings, None).unwrap();

    assert_eq!(report.chunks.len(), 4);
    assert!(report
        .chunks
        .iter()
        .all(|c| c.outcome == ChunkOutcome::TimedOut));
    assert_eq!(report.committed(), 0);
    assert!(!report.is_complete());
    assert_eq!(jobs.status(), JobStatus::Aborted);
    assert_eq!(heatmap.weights().cloned(), before);
}

#[test]
fn inverted_chunked_refresh_swaps_once() {
    init_logging();
    let mut config = height_config(16);
    config.invert = true;
    let expected = full_pass(config.clone());
    assert_eq!(expected.config.thresholds(), Thresholds::new(40.0, 0.0));

    let terrain = terrain();
    let ctx = TerrainContext::capture(&terrain, Vec3::ZERO);
    let source = SourceData::from_heights(terrain.all_heights());
    let settings = EngineSettings {
        chunk_multiplier: 4,
        job_timeout_ms: PATIENCE.as_millis() as u64,
        ..EngineSettings::default()
    };

    let mut heatmap = Heatmap::new(config);
    let report = refresh_chunked(
        &mut JobController::new(),
        &mut heatmap,
        &ctx,
        &source,
        &settings,
        None,
    )
    .unwrap();

    // 16 commits; alternating per chunk would land back on (0, 40)
    assert_eq!(report.committed(), 16);
    assert_eq!(heatmap.config.thresholds(), Thresholds::new(40.0, 0.0));
    // every chunk blended with the same swapped pass thresholds
    assert_eq!(heatmap.weights(), expected.weights());
}

// ── Heatmap set ────────────────────────────────────────────────────

#[test]
fn heatmap_set_add_select_remove() {
    let mut set = HeatmapSet::new();
    let idx = set.add_with(height_config(8));
    assert!(set.select(idx));
    assert_eq!(set.selected().unwrap().name(), "elevation");

    set.remove_selected();
    assert_eq!(set.len(), 1);
    assert_eq!(set.selected_index(), 0);
    assert_eq!(set.selected().unwrap().name(), "Generated Default Heatmap");
}

// ── JSON command ───────────────────────────────────────────────────

#[test]
fn json_command_round_trip() {
    init_logging();
    let request = json!({
        "config": {
            "resolution": 8,
            "dataSource": "CustomPoints",
            "interpolation": "Bilinear",
            "filter": "heat"
        },
        "terrain": {
            "size": { "x": 32.0, "y": 10.0, "z": 32.0 },
            "alphaResolution": 16,
            "heightScale": 10.0
        },
        "points": [
            { "position": { "x": 16.0, "y": 0.0, "z": 16.0 }, "value": 80.0, "brushSize": 8, "filter": "heat" },
            { "position": { "x": 4.0, "y": 0.0, "z": 4.0 }, "value": 500.0, "filter": "other" }
        ]
    });

    let response = generate_heatmap_json(&request.to_string()).unwrap();
    let value: Value = serde_json::from_str(&response).unwrap();

    assert_eq!(value["layers"], json!(5));
    assert_eq!(value["region"], json!({ "x": 0, "y": 0, "width": 16, "height": 16 }));
    assert_eq!(value["skipped"], Value::Null);
    let weights = value["weights"].as_array().unwrap();
    assert_eq!(weights.len(), 16 * 16 * 5);
    for cell in weights.chunks(5) {
        let sum: f64 = cell.iter().map(|w| w.as_f64().unwrap()).sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }
    assert_eq!(value["prototypes"].as_array().unwrap().len(), 5);
}

#[test]
fn json_command_reports_bad_input() {
    assert!(generate_heatmap_json("{ not json").is_err());

    // height-field source without heights
    let request: GenerateRequest = serde_json::from_value(json!({
        "config": {},
        "terrain": { "size": { "x": 1.0, "y": 1.0, "z": 1.0 }, "alphaResolution": 8, "heightScale": 1.0 }
    }))
    .unwrap();
    let err = generate_heatmap(request).unwrap_err();
    assert!(err.contains("height"), "{err}");
}

#[test]
fn command_region_and_skip() {
    let terrain = terrain();
    let mut config = height_config(16);
    config.interpolation = InterpolationMode::Bilinear;
    let request = GenerateRequest {
        config: config.clone(),
        terrain: TerrainContext::capture(&terrain, Vec3::ZERO),
        heights: Some(terrain.all_heights()),
        points: Vec::new(),
        region: Some(Rect::new(16, 16, 8, 4)),
    };
    let response = generate_heatmap(request).unwrap();
    assert_eq!(response.weights.len(), 8 * 4 * 5);
    assert_eq!(response.config.thresholds(), Thresholds::new(0.0, 40.0));

    config.texture_source = TextureSource::Custom;
    let request = GenerateRequest {
        config,
        terrain: TerrainContext::capture(&terrain, Vec3::ZERO),
        heights: Some(terrain.all_heights()),
        points: Vec::new(),
        region: None,
    };
    let response = generate_heatmap(request).unwrap();
    assert_eq!(response.skipped, Some(SkipReason::NoLayers));
    assert!(response.weights.is_empty());
}

#[test]
fn json_command_rejects_inconsistent_heights() {
    for heights in [
        json!({ "resolution": 513, "values": [] }),
        json!({ "resolution": 0, "values": [] }),
    ] {
        let request = json!({
            "config": { "resolution": 4 },
            "terrain": { "size": { "x": 8.0, "y": 1.0, "z": 8.0 }, "alphaResolution": 8, "heightScale": 1.0 },
            "heights": heights
        });
        let err = generate_heatmap_json(&request.to_string()).unwrap_err();
        assert!(err.contains("height field"), "{err}");
    }
}

#[test]
fn json_command_rejects_wrapping_regions() {
    let request = json!({
        "config": { "resolution": 4 },
        "terrain": { "size": { "x": 8.0, "y": 1.0, "z": 8.0 }, "alphaResolution": 8, "heightScale": 1.0 },
        "heights": { "resolution": 2, "values": [0.0, 0.5, 0.5, 1.0] },
        "region": { "x": u32::MAX, "y": 0, "width": 2, "height": 2 }
    });
    let err = generate_heatmap_json(&request.to_string()).unwrap_err();
    assert!(err.contains("exceeds"), "{err}");
}
