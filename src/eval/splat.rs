// eval/splat.rs - layer descriptors → engine splat prototypes
//
// The engine side only needs a texture per layer plus its tiling and surface
// parameters. Solid colours become small flat swatches; image textures pass
// their handle through untouched.

use crate::error::{HeatmapError, HeatmapResult};
use crate::schema::{HeatmapConfig, LayerDescriptor, LayerSource, Rgba, TextureHandle, TextureSource};
use serde::Serialize;

/// Side of the swatches generated for the built-in palette.
pub const DEFAULT_SWATCH_SIZE: u32 = 4;
/// Side of the swatches generated for custom solid-colour layers.
pub const CUSTOM_SWATCH_SIZE: u32 = 1;
pub const DEFAULT_TILE_SIZE: [f32; 2] = [10.0, 10.0];

/// Built-in ramp, lowest value first.
pub const DEFAULT_PALETTE: [Rgba; 5] = [Rgba::BLUE, Rgba::CYAN, Rgba::GREEN, Rgba::YELLOW, Rgba::RED];

/// A flat-colour RGBA8 image.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Swatch {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width × height × 4` bytes.
    pub pixels: Vec<u8>,
}

impl Swatch {
    pub fn flat(color: Rgba, width: u32, height: u32) -> Self {
        let texel = color.to_rgba8();
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&texel);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[o],
            self.pixels[o + 1],
            self.pixels[o + 2],
            self.pixels[o + 3],
        ])
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SplatTexture {
    Swatch(Swatch),
    Image { texture: TextureHandle },
}

/// What the host writes into the terrain's layer list, one per heatmap layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SplatPrototype {
    pub texture: SplatTexture,
    pub tile_size: [f32; 2],
    pub tile_offset: [f32; 2],
    pub metallic: f32,
    pub smoothness: f32,
    pub normal_map: Option<TextureHandle>,
}

/// The five-colour ramp used when no custom layers are selected.
pub fn default_prototypes() -> Vec<SplatPrototype> {
    DEFAULT_PALETTE
        .iter()
        .map(|&color| SplatPrototype {
            texture: SplatTexture::Swatch(Swatch::flat(color, DEFAULT_SWATCH_SIZE, DEFAULT_SWATCH_SIZE)),
            tile_size: DEFAULT_TILE_SIZE,
            tile_offset: [0.0, 0.0],
            metallic: 0.0,
            smoothness: 0.0,
            normal_map: None,
        })
        .collect()
}

pub fn custom_prototype(layer: &LayerDescriptor) -> SplatPrototype {
    let texture = match &layer.source {
        LayerSource::SolidColor { color } => {
            SplatTexture::Swatch(Swatch::flat(*color, CUSTOM_SWATCH_SIZE, CUSTOM_SWATCH_SIZE))
        }
        LayerSource::ImageTexture { texture } => SplatTexture::Image {
            texture: texture.clone(),
        },
    };
    SplatPrototype {
        texture,
        tile_size: layer.tile_size,
        tile_offset: layer.tile_offset,
        metallic: layer.metallic,
        smoothness: layer.smoothness,
        normal_map: layer.normal_map.clone(),
    }
}

/// Prototypes for `config`, in value-rank order. A custom source with no
/// layers is an error; the caller keeps its previous output.
pub fn prototypes(config: &HeatmapConfig) -> HeatmapResult<Vec<SplatPrototype>> {
    match config.texture_source {
        TextureSource::DefaultColors => Ok(default_prototypes()),
        TextureSource::Custom => {
            if config.layers.is_empty() {
                return Err(HeatmapError::NoLayers);
            }
            Ok(config.layers.iter().map(custom_prototype).collect())
        }
    }
}

/// Number of layers `config` blends across.
pub fn layer_count(config: &HeatmapConfig) -> usize {
    match config.texture_source {
        TextureSource::DefaultColors => DEFAULT_PALETTE.len(),
        TextureSource::Custom => config.layers.len(),
    }
}
