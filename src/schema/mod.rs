pub mod heatmap;
pub mod layers;
pub mod points;
pub mod settings;
pub mod terrain;

pub use heatmap::{DataSource, HeatmapConfig, InterpolationMode, TextureSource, Thresholds};
pub use layers::{LayerDescriptor, LayerSource, TextureHandle};
pub use points::{filter_points, BrushPoint, BrushShape, PointProvider};
pub use settings::EngineSettings;
pub use terrain::{HeightField, StaticTerrain, TerrainContext, TerrainProvider};

use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// A 3D world-space vector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// An axis-aligned sub-rectangle of the target grid, in target cells.
///
/// `x` runs along the first target index, `y` along the second.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole `resolution × resolution` target grid.
    pub const fn full(resolution: u32) -> Self {
        Self::new(0, 0, resolution, resolution)
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Exclusive end along x, saturating at `u32::MAX`.
    pub fn x_end(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive end along y, saturating at `u32::MAX`.
    pub fn y_end(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// True when the rectangle lies inside a `width × height` area.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let x_ok = self.x.checked_add(self.width).is_some_and(|end| end <= width);
        let y_ok = self.y.checked_add(self.height).is_some_and(|end| end <= height);
        x_ok && y_ok
    }

    /// True when the rectangle lies inside a `resolution × resolution` grid.
    pub fn fits(&self, resolution: u32) -> bool {
        self.fits_within(resolution, resolution)
    }
}

/// Linear RGBA colour, components in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "default_alpha")]
    pub a: f32,
}

fn default_alpha() -> f32 {
    1.0
}

impl Rgba {
    pub const RED: Rgba = Rgba::opaque(1.0, 0.0, 0.0);
    pub const YELLOW: Rgba = Rgba::opaque(1.0, 0.92, 0.016);
    pub const GREEN: Rgba = Rgba::opaque(0.0, 1.0, 0.0);
    pub const CYAN: Rgba = Rgba::opaque(0.0, 1.0, 1.0);
    pub const BLUE: Rgba = Rgba::opaque(0.0, 0.0, 1.0);

    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// 8-bit sRGB-agnostic quantisation, used for flat swatches.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}
