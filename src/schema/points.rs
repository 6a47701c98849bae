use super::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum BrushShape {
    #[default]
    Circular,
    Square,
}

/// A sparse, user-placed data sample with brush falloff parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BrushPoint {
    /// World position, captured by the point provider.
    pub position: Vec3,
    pub value: f32,
    /// Brush extent in target-grid cells. Zero paints only the hit cell.
    pub brush_size: u32,
    /// 0-100. Higher keeps the falloff flatter towards the rim.
    pub hardness: f32,
    /// 0-100.
    pub opacity: f32,
    /// Replace existing cell values instead of adding to them.
    pub overwrite: bool,
    pub shape: BrushShape,
    pub filter: String,
}

impl Default for BrushPoint {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            value: 0.0,
            brush_size: 10,
            hardness: 0.0,
            opacity: 100.0,
            overwrite: false,
            shape: BrushShape::Circular,
            filter: String::new(),
        }
    }
}

/// Source of brush points for a heatmap. Implementors return points
/// matching `filter` with freshly captured world positions.
pub trait PointProvider {
    fn points(&self, filter: &str) -> Vec<BrushPoint>;
}

impl PointProvider for [BrushPoint] {
    fn points(&self, filter: &str) -> Vec<BrushPoint> {
        filter_points(self, filter)
    }
}

impl PointProvider for Vec<BrushPoint> {
    fn points(&self, filter: &str) -> Vec<BrushPoint> {
        filter_points(self, filter)
    }
}

/// Keep the points whose tag equals `filter`, preserving order.
pub fn filter_points(points: &[BrushPoint], filter: &str) -> Vec<BrushPoint> {
    points
        .iter()
        .filter(|p| p.filter == filter)
        .cloned()
        .collect()
}
