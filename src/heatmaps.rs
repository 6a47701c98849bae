// heatmaps.rs - runtime heatmap state and the ordered heatmap set
//
// A `Heatmap` pairs a configuration with what was last computed from it:
// the dense weight buffer, the coarse grid and the splat prototypes the host
// writes into the terrain's layer list.
//
// Writes that no longer match the heatmap (the layer list changed while a
// job was running, the buffer was reallocated) are skipped, not raised. The
// previous output stays visible until a consistent pass lands.

use crate::eval::coords::snap_resolution;
use crate::eval::grid::{CoarseGrid, WeightMap};
use crate::eval::pipeline::JobOutput;
use crate::eval::splat::{self, SplatPrototype};
use crate::schema::{HeatmapConfig, LayerDescriptor, Rect};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Why a write was dropped.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum SkipReason {
    /// Custom texture source with an empty layer list.
    NoLayers,
    /// The layer count changed between the job's snapshot and now.
    LayerCountChanged { snapshot: usize, current: usize },
    /// The stored buffer was allocated for a different layer count.
    BufferLayersMismatch { buffer: usize, current: usize },
    /// No buffer has been allocated yet.
    NoBuffer,
    /// The chunk does not fit inside the stored buffer.
    OutsideBuffer { rect: Rect },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoLayers => write!(f, "no custom layers"),
            SkipReason::LayerCountChanged { snapshot, current } => {
                write!(f, "layer count changed from {snapshot} to {current}")
            }
            SkipReason::BufferLayersMismatch { buffer, current } => {
                write!(f, "buffer holds {buffer} layers, heatmap has {current}")
            }
            SkipReason::NoBuffer => write!(f, "no weight buffer allocated"),
            SkipReason::OutsideBuffer { rect } => write!(f, "chunk {rect:?} outside buffer"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CommitOutcome {
    Written,
    Skipped(SkipReason),
}

impl CommitOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, CommitOutcome::Written)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Heatmap {
    pub config: HeatmapConfig,
    weights: Option<WeightMap>,
    coarse: Option<Arc<CoarseGrid>>,
    prototypes: Vec<SplatPrototype>,
}

impl Heatmap {
    pub fn new(config: HeatmapConfig) -> Self {
        Self {
            config,
            weights: None,
            coarse: None,
            prototypes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Layers the current configuration blends across.
    pub fn layer_count(&self) -> usize {
        splat::layer_count(&self.config)
    }

    pub fn weights(&self) -> Option<&WeightMap> {
        self.weights.as_ref()
    }

    pub fn coarse_grid(&self) -> Option<&CoarseGrid> {
        self.coarse.as_deref()
    }

    pub fn prototypes(&self) -> &[SplatPrototype] {
        &self.prototypes
    }

    /// Set the coarse resolution, snapped to a power of two no larger than
    /// `target`. Returns the value stored.
    pub fn set_resolution(&mut self, requested: u32, target: u32) -> u32 {
        self.config.resolution = snap_resolution(requested, target);
        self.config.resolution
    }

    // ── Layer list ──

    pub fn push_layer(&mut self, layer: LayerDescriptor) {
        self.config.layers.push(layer);
    }

    pub fn replace_layer(&mut self, index: usize, layer: LayerDescriptor) -> bool {
        match self.config.layers.get_mut(index) {
            Some(slot) => {
                *slot = layer;
                true
            }
            None => false,
        }
    }

    pub fn remove_layer(&mut self, index: usize) -> Option<LayerDescriptor> {
        (index < self.config.layers.len()).then(|| self.config.layers.remove(index))
    }

    // ── Output ──

    /// Rebuild prototypes and make sure a `target × target` buffer with the
    /// current layer count exists. An existing buffer of the right shape is
    /// kept so chunks from earlier passes stay visible.
    pub fn prepare(&mut self, target: u32) -> CommitOutcome {
        let Ok(prototypes) = splat::prototypes(&self.config) else {
            return self.skip(SkipReason::NoLayers);
        };
        let layers = prototypes.len();
        self.prototypes = prototypes;

        let fits = self
            .weights
            .as_ref()
            .is_some_and(|w| w.width == target && w.height == target && w.layers == layers);
        if !fits {
            log::debug!(
                "'{}': allocating {target}x{target}x{layers} weight buffer",
                self.config.name
            );
            self.weights = Some(WeightMap::new(target, target, layers));
        }
        CommitOutcome::Written
    }

    /// Write a job's chunk into the weight buffer and store its thresholds.
    pub fn commit_chunk(&mut self, output: &JobOutput) -> CommitOutcome {
        let current = self.layer_count();
        if output.layer_count != current {
            return self.skip(SkipReason::LayerCountChanged {
                snapshot: output.layer_count,
                current,
            });
        }
        let Some(buffer) = self.weights.as_mut() else {
            return self.skip(SkipReason::NoBuffer);
        };
        if buffer.layers != current {
            let buffer = buffer.layers;
            return self.skip(SkipReason::BufferLayersMismatch { buffer, current });
        }
        if !buffer.write_chunk(output.rect.x, output.rect.y, &output.weights) {
            return self.skip(SkipReason::OutsideBuffer { rect: output.rect });
        }

        self.config.set_thresholds(output.persisted);
        self.coarse = Some(Arc::clone(&output.grid));
        CommitOutcome::Written
    }

    /// Replace all computed state with a full-grid pass.
    pub(crate) fn install(&mut self, prototypes: Vec<SplatPrototype>, output: JobOutput) {
        self.prototypes = prototypes;
        self.config.set_thresholds(output.persisted);
        self.coarse = Some(output.grid);
        self.weights = Some(output.weights);
    }

    /// Drop computed state, keeping the configuration.
    pub fn clear_output(&mut self) {
        self.weights = None;
        self.coarse = None;
        self.prototypes.clear();
    }

    fn skip(&self, reason: SkipReason) -> CommitOutcome {
        log::debug!("'{}': skipping write, {reason}", self.config.name);
        CommitOutcome::Skipped(reason)
    }
}

/// Ordered heatmaps with one selected entry.
#[derive(Debug, Clone)]
pub struct HeatmapSet {
    heatmaps: Vec<Heatmap>,
    selected: usize,
}

impl Default for HeatmapSet {
    fn default() -> Self {
        Self::new()
    }
}

impl HeatmapSet {
    /// A set holding one default heatmap.
    pub fn new() -> Self {
        Self {
            heatmaps: vec![Heatmap::default()],
            selected: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heatmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heatmaps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Heatmap> {
        self.heatmaps.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Heatmap> {
        self.heatmaps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Heatmap> {
        self.heatmaps.get_mut(index)
    }

    /// Append a default heatmap, returning its index.
    pub fn add(&mut self) -> usize {
        self.add_with(HeatmapConfig::default())
    }

    pub fn add_with(&mut self, config: HeatmapConfig) -> usize {
        self.heatmaps.push(Heatmap::new(config));
        self.heatmaps.len() - 1
    }

    /// Remove the heatmap at `index`. The selection follows its heatmap when
    /// an earlier entry goes, and clamps to the last entry otherwise.
    pub fn remove(&mut self, index: usize) -> Option<Heatmap> {
        if index >= self.heatmaps.len() {
            return None;
        }
        let removed = self.heatmaps.remove(index);
        if index < self.selected {
            self.selected -= 1;
        } else if self.selected >= self.heatmaps.len() {
            self.selected = self.heatmaps.len().saturating_sub(1);
        }
        Some(removed)
    }

    pub fn remove_selected(&mut self) -> Option<Heatmap> {
        self.remove(self.selected)
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.heatmaps.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Heatmap> {
        self.heatmaps.get(self.selected)
    }

    pub fn selected_mut(&mut self) -> Option<&mut Heatmap> {
        self.heatmaps.get_mut(self.selected)
    }
}
