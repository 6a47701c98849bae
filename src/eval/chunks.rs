// eval/chunks.rs - chunked refresh of a heatmap through a job controller
//
// The target grid is tiled into multiplier × multiplier chunks. Each chunk is
// one background job; a chunk that does not finish within the timeout is
// aborted and the refresh moves on. Completed chunks are committed straight
// into the heatmap, so a refresh that loses some chunks still shows the ones
// that landed next to the previous output.
//
// All chunks of one refresh share a single configuration snapshot and, via
// the cache, a single coarse grid.

use crate::error::HeatmapResult;
use crate::eval::cache::GridCache;
use crate::eval::coords::floor_pow2;
use crate::eval::pipeline::SourceData;
use crate::heatmaps::{CommitOutcome, Heatmap, SkipReason};
use crate::jobs::{JobController, JobRequest, JobStatus};
use crate::schema::settings::MAX_CHUNK_MULTIPLIER;
use crate::schema::{EngineSettings, Rect, TerrainContext};
use serde::Serialize;
use std::sync::Arc;

/// Snap `m` down to a power of two in [1, 2048].
pub fn snap_chunk_multiplier(m: u32) -> u32 {
    floor_pow2(m).min(MAX_CHUNK_MULTIPLIER)
}

/// Tile a `target × target` grid into chunks. The multiplier is snapped and
/// capped so chunks are at least one cell wide; the last chunk in each
/// direction absorbs any remainder.
pub fn chunk_rects(target: u32, multiplier: u32) -> Vec<Rect> {
    if target == 0 {
        return Vec::new();
    }
    let m = snap_chunk_multiplier(multiplier).min(floor_pow2(target));
    let side = target / m;
    let span = |i: u32| {
        let start = i * side;
        let len = if i + 1 == m { target - start } else { side };
        (start, len)
    };

    let mut rects = Vec::with_capacity((m * m) as usize);
    for cx in 0..m {
        let (x, width) = span(cx);
        for cy in 0..m {
            let (y, height) = span(cy);
            rects.push(Rect::new(x, y, width, height));
        }
    }
    rects
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChunkOutcome {
    Committed,
    Skipped { reason: SkipReason },
    TimedOut,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkResult {
    pub rect: Rect,
    pub outcome: ChunkOutcome,
}

/// What happened to each chunk of one refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkReport {
    pub chunks: Vec<ChunkResult>,
    /// Set when the whole refresh was skipped before any job started.
    pub skipped: Option<SkipReason>,
}

impl ChunkReport {
    pub fn committed(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.outcome == ChunkOutcome::Committed)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_none() && self.committed() == self.chunks.len()
    }
}

/// Refresh `heatmap` chunk by chunk on `controller`, blocking the caller.
pub fn refresh_chunked(
    controller: &mut JobController,
    heatmap: &mut Heatmap,
    ctx: &TerrainContext,
    source: &SourceData,
    settings: &EngineSettings,
    cache: Option<Arc<GridCache>>,
) -> HeatmapResult<ChunkReport> {
    let target = ctx.alpha_resolution;
    if let CommitOutcome::Skipped(reason) = heatmap.prepare(target) {
        return Ok(ChunkReport {
            chunks: Vec::new(),
            skipped: Some(reason),
        });
    }

    let snapshot = heatmap.config.clone();
    let timeout = settings.job_timeout();
    let mut report = ChunkReport::default();

    for rect in chunk_rects(target, settings.chunk_multiplier) {
        controller.start(JobRequest {
            config: snapshot.clone(),
            ctx: *ctx,
            source: source.clone(),
            rect,
            cache: cache.clone(),
        })?;

        let outcome = match controller.wait(timeout) {
            JobStatus::Completed => match controller.take_result() {
                Some(output) => match heatmap.commit_chunk(&output) {
                    CommitOutcome::Written => ChunkOutcome::Committed,
                    CommitOutcome::Skipped(reason) => ChunkOutcome::Skipped { reason },
                },
                None => ChunkOutcome::Failed {
                    error: "completed job had no output".to_string(),
                },
            },
            JobStatus::Running => {
                log::debug!("chunk {rect:?} exceeded {timeout:?}, aborting");
                controller.abort();
                ChunkOutcome::TimedOut
            }
            JobStatus::Aborted | JobStatus::Idle => ChunkOutcome::Failed {
                error: controller
                    .last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "job aborted".to_string()),
            },
        };
        report.chunks.push(ChunkResult { rect, outcome });
    }

    log::debug!(
        "'{}': refreshed {}/{} chunks",
        heatmap.config.name,
        report.committed(),
        report.chunks.len()
    );
    Ok(report)
}
