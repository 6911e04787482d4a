//! Binary glTF 2.0 (GLB) export.
//!
//! Builds the scene JSON and the packed vertex/index buffer by hand and
//! wraps them in the GLB container: a 12-byte header followed by a
//! space-padded JSON chunk and a zero-padded BIN chunk, both 4-byte
//! aligned.
//!
//! Texture baking goes through the [`RenderContext`](super::RenderContext)
//! seam. The pipeline detaches the bake before export (the viewer applies
//! imagery separately), so the usual call passes no texture; the embed path
//! is still fully implemented for callers that want self-contained scenes.

use serde_json::json;

use super::{ExportError, RenderContext};
use crate::mesh::Mesh;

/// GLB magic number, "glTF".
const GLB_MAGIC: u32 = 0x4654_6C67;

/// JSON chunk type, "JSON".
const CHUNK_JSON: u32 = 0x4E4F_534A;

/// Binary chunk type, "BIN\0".
const CHUNK_BIN: u32 = 0x004E_4942;

/// glTF component types.
const COMPONENT_F32: u32 = 5126;
const COMPONENT_U32: u32 = 5125;

/// glTF buffer-view targets.
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// An RGBA texture to embed in the exported scene.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA pixels, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// Exports a mesh as a binary glTF scene.
///
/// # Errors
///
/// Fails when the scene JSON cannot be serialized or, with a texture, when
/// the render context rejects the image.
pub fn export_glb(
    mesh: &Mesh,
    texture: Option<&TextureImage>,
    ctx: &impl RenderContext,
) -> Result<Vec<u8>, ExportError> {
    let mut bin = Vec::new();
    let mut views = Vec::new();

    let position_view = push_view(&mut bin, &mut views, &f32_bytes(&mesh.positions), Some(TARGET_ARRAY_BUFFER));
    let normal_view = push_view(&mut bin, &mut views, &f32_bytes(&mesh.normals), Some(TARGET_ARRAY_BUFFER));
    let uv_view = push_view(&mut bin, &mut views, &f32_bytes(&mesh.uvs), Some(TARGET_ARRAY_BUFFER));
    let index_view = push_view(&mut bin, &mut views, &u32_bytes(&mesh.indices), Some(TARGET_ELEMENT_ARRAY_BUFFER));

    let (position_min, position_max) = component_extrema(&mesh.positions);

    let mut material = json!({
        "pbrMetallicRoughness": {
            "baseColorFactor": mesh.base_color,
            "metallicFactor": 0.0,
            "roughnessFactor": 1.0,
        },
        "doubleSided": true,
    });

    let mut images = Vec::new();
    let mut textures = Vec::new();
    let mut samplers = Vec::new();

    if let Some(texture) = texture {
        let png = ctx.encode_png(texture.width, texture.height, &texture.rgba)?;
        let image_view = push_view(&mut bin, &mut views, &png, None);

        images.push(json!({ "bufferView": image_view, "mimeType": "image/png" }));
        samplers.push(json!({ "magFilter": 9729, "minFilter": 9729 }));
        textures.push(json!({ "source": 0, "sampler": 0 }));
        material["pbrMetallicRoughness"]["baseColorTexture"] = json!({ "index": 0 });
    }

    let mut root = json!({
        "asset": { "version": "2.0", "generator": "terraforge" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [ { "mesh": 0, "name": "terrain" } ],
        "meshes": [ {
            "primitives": [ {
                "attributes": {
                    "POSITION": 0,
                    "NORMAL": 1,
                    "TEXCOORD_0": 2,
                },
                "indices": 3,
                "material": 0,
            } ],
        } ],
        "accessors": [
            {
                "bufferView": position_view,
                "componentType": COMPONENT_F32,
                "count": mesh.vertex_count(),
                "type": "VEC3",
                "min": position_min,
                "max": position_max,
            },
            {
                "bufferView": normal_view,
                "componentType": COMPONENT_F32,
                "count": mesh.vertex_count(),
                "type": "VEC3",
            },
            {
                "bufferView": uv_view,
                "componentType": COMPONENT_F32,
                "count": mesh.vertex_count(),
                "type": "VEC2",
            },
            {
                "bufferView": index_view,
                "componentType": COMPONENT_U32,
                "count": mesh.indices.len(),
                "type": "SCALAR",
            },
        ],
        "bufferViews": views,
        "buffers": [ { "byteLength": bin.len() } ],
        "materials": [ material ],
    });

    if !images.is_empty() {
        root["images"] = json!(images);
        root["samplers"] = json!(samplers);
        root["textures"] = json!(textures);
    }

    let mut json_bytes = serde_json::to_vec(&root)?;
    pad_to_4(&mut json_bytes, b' ');
    pad_to_4(&mut bin, 0);

    let total_len = 12 + 8 + json_bytes.len() + 8 + bin.len();

    let mut glb = Vec::with_capacity(total_len);
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_len as u32).to_le_bytes());

    glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(&json_bytes);

    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    glb.extend_from_slice(&bin);

    Ok(glb)
}

/// Appends data to the binary buffer and records its buffer view.
///
/// Returns the view index. Offsets stay 4-byte aligned because every vertex
/// payload is f32/u32 and PNG payloads are padded before the next push.
fn push_view(
    bin: &mut Vec<u8>,
    views: &mut Vec<serde_json::Value>,
    data: &[u8],
    target: Option<u32>,
) -> usize {
    pad_to_4(bin, 0);
    let offset = bin.len();
    bin.extend_from_slice(data);

    let mut view = json!({
        "buffer": 0,
        "byteOffset": offset,
        "byteLength": data.len(),
    });
    if let Some(target) = target {
        view["target"] = json!(target);
    }

    views.push(view);
    views.len() - 1
}

fn pad_to_4(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

/// Little-endian serialization; glTF buffers are LE regardless of host.
fn f32_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn u32_bytes(values: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Per-component minima and maxima of a VEC3 array.
fn component_extrema(values: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let mut min = vec![f32::INFINITY; 3];
    let mut max = vec![f32::NEG_INFINITY; 3];

    for vertex in values.chunks_exact(3) {
        for i in 0..3 {
            min[i] = min[i].min(vertex[i]);
            max[i] = max[i].max(vertex[i]);
        }
    }

    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshScale;
    use crate::export::HeadlessContext;
    use crate::mesh::build_mesh;

    fn small_mesh() -> Mesh {
        let elevation = vec![10.0, 12.0, 11.0, 14.0, 13.0, 10.5, 12.5, 11.5, 10.2];
        build_mesh(&elevation, 3, 3, MeshScale::default(), None, None).unwrap()
    }

    fn parse_json_chunk(glb: &[u8]) -> serde_json::Value {
        let json_len = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;
        assert_eq!(u32::from_le_bytes(glb[16..20].try_into().unwrap()), CHUNK_JSON);
        serde_json::from_slice(&glb[20..20 + json_len]).unwrap()
    }

    #[test]
    fn test_glb_header() {
        let glb = export_glb(&small_mesh(), None, &HeadlessContext::new()).unwrap();

        assert_eq!(u32::from_le_bytes(glb[0..4].try_into().unwrap()), GLB_MAGIC);
        assert_eq!(u32::from_le_bytes(glb[4..8].try_into().unwrap()), 2);
        assert_eq!(
            u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize,
            glb.len()
        );
    }

    #[test]
    fn test_glb_json_chunk_is_valid_gltf() {
        let mesh = small_mesh();
        let glb = export_glb(&mesh, None, &HeadlessContext::new()).unwrap();
        let root = parse_json_chunk(&glb);

        assert_eq!(root["asset"]["version"], "2.0");
        assert_eq!(root["accessors"][0]["count"], mesh.vertex_count());
        assert_eq!(root["accessors"][3]["count"], mesh.indices.len());
        assert!(root["materials"][0]["doubleSided"].as_bool().unwrap());
        assert!(root.get("images").is_none());
    }

    #[test]
    fn test_glb_chunks_are_aligned() {
        let glb = export_glb(&small_mesh(), None, &HeadlessContext::new()).unwrap();
        let json_len = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;

        assert_eq!(json_len % 4, 0);
        let bin_header = 20 + json_len;
        let bin_len = u32::from_le_bytes(glb[bin_header..bin_header + 4].try_into().unwrap());
        assert_eq!(
            u32::from_le_bytes(glb[bin_header + 4..bin_header + 8].try_into().unwrap()),
            CHUNK_BIN
        );
        assert_eq!(bin_len % 4, 0);
        assert_eq!(bin_header + 8 + bin_len as usize, glb.len());
    }

    #[test]
    fn test_glb_embeds_texture_through_render_context() {
        let texture = TextureImage {
            width: 2,
            height: 2,
            rgba: vec![128u8; 16],
        };
        let glb = export_glb(&small_mesh(), Some(&texture), &HeadlessContext::new()).unwrap();
        let root = parse_json_chunk(&glb);

        assert_eq!(root["images"][0]["mimeType"], "image/png");
        assert_eq!(
            root["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"]["index"],
            0
        );
    }

    #[test]
    fn test_position_extrema_cover_all_vertices() {
        let mesh = small_mesh();
        let glb = export_glb(&mesh, None, &HeadlessContext::new()).unwrap();
        let root = parse_json_chunk(&glb);

        let min_y = root["accessors"][0]["min"][1].as_f64().unwrap();
        let max_y = root["accessors"][0]["max"][1].as_f64().unwrap();
        assert!(min_y.abs() < 1e-6, "baseline-normalized min should be 0");
        assert!(max_y > 0.0);
    }
}
