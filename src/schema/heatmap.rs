use super::layers::LayerDescriptor;
use serde::{Deserialize, Serialize};

/// How the coarse grid is upsampled onto the target grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum InterpolationMode {
    #[default]
    NearestNeighbor,
    Bilinear,
    /// Direct copy. Only valid when the coarse resolution equals the target.
    None,
}

/// Where the scalar field comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DataSource {
    #[default]
    HeightField,
    CustomPoints,
}

/// Which layers represent the data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TextureSource {
    /// Built-in five colour ramp (blue → red).
    #[default]
    DefaultColors,
    /// The heatmap's own `layers` list.
    Custom,
}

/// Lower/upper value thresholds. `upper < lower` encodes an inverted ramp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    pub lower: f32,
    pub upper: f32,
}

impl Thresholds {
    pub const fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }

    pub const fn swapped(self) -> Self {
        Self {
            lower: self.upper,
            upper: self.lower,
        }
    }
}

/// User-facing configuration of a single heatmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeatmapConfig {
    pub name: String,
    /// Coarse grid resolution R. The grid holds (R+1)×(R+1) cells.
    pub resolution: u32,
    pub interpolation: InterpolationMode,
    pub data_source: DataSource,
    pub texture_source: TextureSource,
    pub lower_threshold: f32,
    pub upper_threshold: f32,
    /// Derive thresholds from the data's extrema on every pass.
    pub auto_constrain: bool,
    /// Swap the thresholds before blending.
    pub invert: bool,
    /// Value of coarse cells no brush point touches.
    pub base_value: f32,
    pub layers: Vec<LayerDescriptor>,
    /// Only brush points carrying this tag apply to the heatmap.
    pub filter: String,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self::named("Generated Default Heatmap")
    }
}

impl HeatmapConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            resolution: 64,
            interpolation: InterpolationMode::NearestNeighbor,
            data_source: DataSource::HeightField,
            texture_source: TextureSource::DefaultColors,
            lower_threshold: 0.0,
            upper_threshold: 100.0,
            auto_constrain: false,
            invert: false,
            base_value: 0.0,
            layers: Vec::new(),
            filter: String::new(),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.lower_threshold, self.upper_threshold)
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.lower_threshold = thresholds.lower;
        self.upper_threshold = thresholds.upper;
    }
}
