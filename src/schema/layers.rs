use super::Rgba;
use serde::{Deserialize, Serialize};

/// Opaque reference to a texture owned by the host's asset provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TextureHandle(pub String);

impl TextureHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// What a layer draws with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayerSource {
    SolidColor { color: Rgba },
    ImageTexture { texture: TextureHandle },
}

/// One visual layer of a heatmap. Index in the heatmap's list is the
/// layer's value rank: index 0 receives the lowest values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    pub source: LayerSource,
    #[serde(default = "default_tile_size")]
    pub tile_size: [f32; 2],
    #[serde(default)]
    pub tile_offset: [f32; 2],
    #[serde(default)]
    pub metallic: f32,
    #[serde(default)]
    pub smoothness: f32,
    #[serde(default)]
    pub normal_map: Option<TextureHandle>,
}

fn default_tile_size() -> [f32; 2] {
    [10.0, 10.0]
}

impl LayerDescriptor {
    pub fn solid(color: Rgba) -> Self {
        Self::with_source(LayerSource::SolidColor { color })
    }

    pub fn texture(texture: TextureHandle) -> Self {
        Self::with_source(LayerSource::ImageTexture { texture })
    }

    fn with_source(source: LayerSource) -> Self {
        Self {
            source,
            tile_size: default_tile_size(),
            tile_offset: [0.0, 0.0],
            metallic: 0.0,
            smoothness: 0.0,
            normal_map: None,
        }
    }
}
