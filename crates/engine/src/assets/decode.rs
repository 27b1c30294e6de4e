use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use image::ImageFormat;
use serde::Deserialize;

use super::types::{
    AssetKind, AssetRequest, AudioClip, Bounds3, EnvironmentMap, LoadFailure, LoadResult,
    MeshNode, ModelAsset, Resource, TextureImage,
};

/// Reads `request.path` under `asset_root` and parses it according to its kind.
/// Runs on loader worker threads.
pub fn fetch_and_decode(asset_root: &Path, request: &AssetRequest) -> LoadResult {
    let path = resolve_asset_path(asset_root, &request.path)?;
    let bytes = fs::read(&path).map_err(|error| LoadFailure::Read {
        path: request.path.clone(),
        message: error.to_string(),
    })?;
    decode_bytes(request, &bytes)
}

pub(crate) fn decode_bytes(request: &AssetRequest, bytes: &[u8]) -> LoadResult {
    let decode_error = |message: String| LoadFailure::Decode {
        kind: request.kind,
        path: request.path.clone(),
        message,
    };

    match request.kind {
        AssetKind::EnvironmentMap => {
            let image = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)
                .map_err(|error| decode_error(error.to_string()))?;
            Ok(Resource::EnvironmentMap(EnvironmentMap {
                image: Arc::new(image.to_rgb32f()),
            }))
        }
        AssetKind::Texture => {
            let image =
                image::load_from_memory(bytes).map_err(|error| decode_error(error.to_string()))?;
            Ok(Resource::Texture(TextureImage {
                image: Arc::new(image.to_rgba8()),
            }))
        }
        AssetKind::Model => decode_gltf(bytes)
            .map(Resource::Model)
            .map_err(decode_error),
        AssetKind::Audio => decode_wav_header(bytes)
            .map(Resource::Audio)
            .map_err(decode_error),
    }
}

fn resolve_asset_path(asset_root: &Path, relative: &str) -> Result<PathBuf, LoadFailure> {
    let relative_path = Path::new(relative);
    let escapes_root = relative_path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes_root || relative.is_empty() {
        return Err(LoadFailure::Read {
            path: relative.to_string(),
            message: "asset path must be relative and stay under the asset root".to_string(),
        });
    }
    Ok(asset_root.join(relative_path))
}

#[derive(Debug, Default, Deserialize)]
struct GltfDocument {
    #[serde(default)]
    nodes: Vec<GltfNode>,
    #[serde(default)]
    meshes: Vec<GltfMesh>,
    #[serde(default)]
    accessors: Vec<GltfAccessor>,
}

#[derive(Debug, Default, Deserialize)]
struct GltfNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mesh: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct GltfMesh {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    primitives: Vec<GltfPrimitive>,
}

#[derive(Debug, Default, Deserialize)]
struct GltfPrimitive {
    #[serde(default)]
    attributes: HashMap<String, usize>,
}

#[derive(Debug, Default, Deserialize)]
struct GltfAccessor {
    #[serde(default)]
    min: Option<Vec<f32>>,
    #[serde(default)]
    max: Option<Vec<f32>>,
}

// Node transforms are ignored; bounds are the union of POSITION accessor extents.
fn decode_gltf(bytes: &[u8]) -> Result<ModelAsset, String> {
    let document: GltfDocument =
        serde_json::from_slice(bytes).map_err(|error| format!("invalid glTF JSON: {error}"))?;

    let mut mesh_indices = Vec::<(usize, Option<&str>)>::new();
    for node in &document.nodes {
        if let Some(mesh_index) = node.mesh {
            mesh_indices.push((mesh_index, node.name.as_deref()));
        }
    }
    if mesh_indices.is_empty() {
        mesh_indices.extend((0..document.meshes.len()).map(|index| (index, None)));
    }

    let mut meshes = Vec::with_capacity(mesh_indices.len());
    let mut bounds: Option<Bounds3> = None;
    for (mesh_index, node_name) in mesh_indices {
        let mesh = document
            .meshes
            .get(mesh_index)
            .ok_or_else(|| format!("node references missing mesh {mesh_index}"))?;
        let name = node_name
            .map(str::to_string)
            .or_else(|| mesh.name.clone())
            .unwrap_or_else(|| format!("mesh_{mesh_index}"));
        meshes.push(MeshNode { name });

        for primitive in &mesh.primitives {
            let Some(accessor_index) = primitive.attributes.get("POSITION") else {
                continue;
            };
            let Some(extent) = document
                .accessors
                .get(*accessor_index)
                .and_then(accessor_extent)
            else {
                continue;
            };
            bounds = Some(match bounds {
                Some(existing) => existing.union(extent),
                None => extent,
            });
        }
    }

    Ok(ModelAsset { meshes, bounds })
}

fn accessor_extent(accessor: &GltfAccessor) -> Option<Bounds3> {
    let min = accessor.min.as_deref()?;
    let max = accessor.max.as_deref()?;
    if min.len() < 3 || max.len() < 3 {
        return None;
    }
    Some(Bounds3 {
        min: Vec3::new(min[0], min[1], min[2]),
        max: Vec3::new(max[0], max[1], max[2]),
    })
}

fn decode_wav_header(bytes: &[u8]) -> Result<AudioClip, String> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err("missing RIFF/WAVE header".to_string());
    }

    let mut offset = 12usize;
    while offset + 8 <= bytes.len() {
        let chunk_id = &bytes[offset..offset + 4];
        let chunk_len = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let body = offset + 8;
        if chunk_id == b"fmt " {
            if chunk_len < 8 || body + 8 > bytes.len() {
                return Err("truncated fmt chunk".to_string());
            }
            let channels = u16::from_le_bytes([bytes[body + 2], bytes[body + 3]]);
            let sample_rate = u32::from_le_bytes([
                bytes[body + 4],
                bytes[body + 5],
                bytes[body + 6],
                bytes[body + 7],
            ]);
            if channels == 0 || sample_rate == 0 {
                return Err("fmt chunk declares zero channels or sample rate".to_string());
            }
            return Ok(AudioClip {
                channels,
                sample_rate,
                bytes: Arc::from(bytes),
            });
        }
        // RIFF chunks are padded to even length.
        offset = body.saturating_add(chunk_len + (chunk_len & 1));
    }

    Err("no fmt chunk found".to_string())
}
