use super::{Rect, Vec3};
use serde::{Deserialize, Serialize};

/// Terrain facts every core call needs. Passed explicitly instead of being
/// looked up from an ambient "active terrain".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TerrainContext {
    /// World-space extent of the terrain.
    pub size: Vec3,
    /// Target (alpha/splat map) grid resolution.
    pub alpha_resolution: u32,
    /// Multiplier applied to raw height samples.
    pub height_scale: f32,
    /// World position of the heatmap owner. Subtracted from brush positions.
    #[serde(default)]
    pub origin: Vec3,
}

impl Default for TerrainContext {
    fn default() -> Self {
        Self {
            size: Vec3::new(512.0, 600.0, 512.0),
            alpha_resolution: 512,
            height_scale: 600.0,
            origin: Vec3::ZERO,
        }
    }
}

impl TerrainContext {
    /// Snapshot the sizing of `provider`, anchored at `origin`.
    pub fn capture(provider: &(impl TerrainProvider + ?Sized), origin: Vec3) -> Self {
        Self {
            size: provider.size(),
            alpha_resolution: provider.alpha_resolution(),
            height_scale: provider.height_scale(),
            origin,
        }
    }
}

/// Square height field, row-major, `resolution × resolution` samples.
/// Rows run along world z, columns along world x.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawHeightField")]
pub struct HeightField {
    pub resolution: usize,
    pub values: Vec<f32>,
}

/// Wire shape of a height field, checked before it becomes one.
#[derive(Deserialize)]
struct RawHeightField {
    resolution: usize,
    values: Vec<f32>,
}

impl TryFrom<RawHeightField> for HeightField {
    type Error = String;

    fn try_from(raw: RawHeightField) -> Result<Self, Self::Error> {
        let (resolution, len) = (raw.resolution, raw.values.len());
        HeightField::new(raw.resolution, raw.values).ok_or_else(|| {
            format!("height field of resolution {resolution} cannot hold {len} samples")
        })
    }
}

impl HeightField {
    pub fn new(resolution: usize, values: Vec<f32>) -> Option<Self> {
        let field = Self { resolution, values };
        field.is_valid().then_some(field)
    }

    /// Non-empty, with exactly `resolution²` samples.
    pub fn is_valid(&self) -> bool {
        self.resolution > 0
            && self
                .resolution
                .checked_mul(self.resolution)
                .is_some_and(|n| n == self.values.len())
    }

    pub fn flat(resolution: usize, height: f32) -> Self {
        Self {
            resolution: resolution.max(1),
            values: vec![height; resolution.max(1) * resolution.max(1)],
        }
    }

    pub fn from_fn(resolution: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let resolution = resolution.max(1);
        let mut values = Vec::with_capacity(resolution * resolution);
        for row in 0..resolution {
            for col in 0..resolution {
                values.push(f(row, col));
            }
        }
        Self { resolution, values }
    }

    /// Sample at (row, col), clamped onto the field. Samples missing from
    /// a field that fails `is_valid` read as 0.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        let last = self.resolution.saturating_sub(1);
        let idx = row.min(last) * self.resolution + col.min(last);
        self.values.get(idx).copied().unwrap_or(0.0)
    }

    /// Copy out a sub-region, clamped onto the field.
    pub fn region(&self, region: Rect) -> HeightField {
        let w = region.width as usize;
        let h = region.height as usize;
        let side = w.max(h).max(1);
        HeightField::from_fn(side, |row, col| {
            self.get(region.x as usize + row, region.y as usize + col)
        })
    }
}

/// Read-only view of the host's terrain geometry.
pub trait TerrainProvider {
    /// Raw heights (before `height_scale`) for `region` of the height field.
    fn heights(&self, region: Rect) -> HeightField;
    /// Samples per side of the full height field.
    fn height_resolution(&self) -> usize;
    fn size(&self) -> Vec3;
    fn alpha_resolution(&self) -> u32;
    fn height_scale(&self) -> f32;

    /// Convenience: the whole height field.
    fn all_heights(&self) -> HeightField {
        let n = self.height_resolution() as u32;
        self.heights(Rect::full(n))
    }
}

/// An in-memory terrain, used by hosts without their own geometry type and
/// by tests.
#[derive(Debug, Clone)]
pub struct StaticTerrain {
    pub size: Vec3,
    pub alpha_resolution: u32,
    pub heights: HeightField,
}

impl TerrainProvider for StaticTerrain {
    fn heights(&self, region: Rect) -> HeightField {
        if region == Rect::full(self.heights.resolution as u32) {
            return self.heights.clone();
        }
        self.heights.region(region)
    }

    fn height_resolution(&self) -> usize {
        self.heights.resolution
    }

    fn size(&self) -> Vec3 {
        self.size
    }

    fn alpha_resolution(&self) -> u32 {
        self.alpha_resolution
    }

    fn height_scale(&self) -> f32 {
        self.size.y
    }
}
