use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use image::{Rgb32FImage, RgbaImage};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    EnvironmentMap,
    Texture,
    Model,
    Audio,
}

impl AssetKind {
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::EnvironmentMap => "environment_map",
            AssetKind::Texture => "texture",
            AssetKind::Model => "model",
            AssetKind::Audio => "audio",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fetch request. `path` is relative to the asset root and always uses `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRequest {
    pub kind: AssetKind,
    pub path: String,
}

impl AssetRequest {
    pub fn new(kind: AssetKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
    #[error("failed to decode {kind} asset {path}: {message}")]
    Decode {
        kind: AssetKind,
        path: String,
        message: String,
    },
    #[error("loader backend disconnected before {path} completed")]
    Disconnected { path: String },
    #[error("loader worker panicked while loading {path}")]
    WorkerPanicked { path: String },
}

impl LoadFailure {
    pub fn path(&self) -> &str {
        match self {
            LoadFailure::Read { path, .. }
            | LoadFailure::Decode { path, .. }
            | LoadFailure::Disconnected { path }
            | LoadFailure::WorkerPanicked { path } => path,
        }
    }
}

pub type LoadResult = Result<Resource, LoadFailure>;

#[derive(Debug)]
pub enum Resource {
    EnvironmentMap(EnvironmentMap),
    Texture(TextureImage),
    Model(ModelAsset),
    Audio(AudioClip),
}

impl Resource {
    pub fn kind(&self) -> AssetKind {
        match self {
            Resource::EnvironmentMap(_) => AssetKind::EnvironmentMap,
            Resource::Texture(_) => AssetKind::Texture,
            Resource::Model(_) => AssetKind::Model,
            Resource::Audio(_) => AssetKind::Audio,
        }
    }

    /// Minimal well-formed resource of `kind`, for scripted and headless loading.
    pub fn placeholder(kind: AssetKind) -> Resource {
        match kind {
            AssetKind::EnvironmentMap => Resource::EnvironmentMap(EnvironmentMap {
                image: Arc::new(Rgb32FImage::new(1, 1)),
            }),
            AssetKind::Texture => Resource::Texture(TextureImage {
                image: Arc::new(RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]))),
            }),
            AssetKind::Model => Resource::Model(ModelAsset {
                meshes: vec![MeshNode {
                    name: "mesh_0".to_string(),
                }],
                bounds: Some(Bounds3 {
                    min: Vec3::splat(-0.5),
                    max: Vec3::splat(0.5),
                }),
            }),
            AssetKind::Audio => Resource::Audio(AudioClip {
                channels: 1,
                sample_rate: 44_100,
                bytes: Arc::from(Vec::new()),
            }),
        }
    }

    pub fn into_environment_map(self) -> Option<EnvironmentMap> {
        match self {
            Resource::EnvironmentMap(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_texture(self) -> Option<TextureImage> {
        match self {
            Resource::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<ModelAsset> {
        match self {
            Resource::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_audio(self) -> Option<AudioClip> {
        match self {
            Resource::Audio(clip) => Some(clip),
            _ => None,
        }
    }
}

/// Equirectangular HDR radiance map.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub image: Arc<Rgb32FImage>,
}

impl EnvironmentMap {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Average radiance, clamped to displayable range.
    pub fn mean_color(&self) -> [u8; 4] {
        let pixel_count = f64::from(self.image.width()) * f64::from(self.image.height());
        if pixel_count == 0.0 {
            return [0, 0, 0, 255];
        }
        let mut sums = [0f64; 3];
        for pixel in self.image.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0.iter()) {
                *sum += f64::from(*channel);
            }
        }
        let to_byte = |sum: f64| ((sum / pixel_count).clamp(0.0, 1.0) * 255.0).round() as u8;
        [to_byte(sums[0]), to_byte(sums[1]), to_byte(sums[2]), 255]
    }
}

#[derive(Debug, Clone)]
pub struct TextureImage {
    pub image: Arc<RgbaImage>,
}

impl TextureImage {
    pub fn mean_color(&self) -> [u8; 4] {
        let pixel_count = u64::from(self.image.width()) * u64::from(self.image.height());
        if pixel_count == 0 {
            return [0, 0, 0, 255];
        }
        let mut sums = [0u64; 3];
        for pixel in self.image.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0.iter()) {
                *sum += u64::from(*channel);
            }
        }
        [
            (sums[0] / pixel_count) as u8,
            (sums[1] / pixel_count) as u8,
            (sums[2] / pixel_count) as u8,
            255,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds3 {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn radius(&self) -> f32 {
        (self.max - self.min).length() * 0.5
    }

    pub fn union(self, other: Bounds3) -> Bounds3 {
        Bounds3 {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// A named mesh sub-object of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshNode {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub meshes: Vec<MeshNode>,
    pub bounds: Option<Bounds3>,
}

impl ModelAsset {
    pub fn rename_meshes(&mut self, name: &str) {
        for mesh in &mut self.meshes {
            mesh.name = name.to_string();
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioClip {
    pub channels: u16,
    pub sample_rate: u32,
    pub bytes: Arc<[u8]>,
}
