//! Heightmap-to-mesh synthesis.
//!
//! Converts a dense elevation grid into a regular triangle mesh: baseline
//! normalization so the lowest valid sample sits at height 0, a centered
//! Y-up vertex grid with full-extent texture coordinates, optional polygon
//! masking, and area-weighted vertex normals recomputed from the final
//! positions.

use ::geo::{Contains, Point};
use thiserror::Error;
use tracing::debug;

use crate::config::MeshScale;
use crate::geo::{to_geo_polygon, BoundingBox, Coordinate};

/// Placeholder surface color (untextured): soft green, RGBA.
pub const BASE_COLOR: [f32; 4] = [0.533, 0.8, 0.533, 1.0];

/// Errors raised during mesh synthesis.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Grid length does not match the declared dimensions.
    #[error("elevation grid length {len} does not match {width}x{height}")]
    DimensionMismatch { len: usize, width: u32, height: u32 },

    /// A mesh needs at least a 2x2 grid to form one cell.
    #[error("grid {width}x{height} is too small to mesh")]
    GridTooSmall { width: u32, height: u32 },
}

/// An indexed triangle mesh over a regular grid.
///
/// `positions`, `normals`, and `uvs` are parallel per-vertex arrays
/// (3, 3, and 2 components respectively); `indices` holds CCW triangles,
/// two per grid cell.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
    /// Vertex-grid width the mesh was built from.
    pub grid_width: u32,
    /// Vertex-grid height the mesh was built from.
    pub grid_height: u32,
    /// Placeholder material color; textures travel separately.
    pub base_color: [f32; 4],
}

impl Mesh {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Builds a terrain mesh from a row-major elevation grid.
///
/// Elevations are baseline-normalized: the minimum non-zero, non-NaN sample
/// is subtracted from every valid sample before scaling, so the lowest valid
/// point maps to height 0 and large absolute offsets do not leave the mesh
/// floating. Invalid samples (zero, NaN) stay at 0.
///
/// When `polygon` and `bbox` are both given, vertices whose geographic
/// position falls outside the polygon are flattened to 0, producing a skirt
/// around the selected shape. This can introduce visible discontinuities at
/// the polygon edge, which is why the pipeline leaves it off by default.
///
/// # Errors
///
/// Fails when the grid length disagrees with the dimensions or the grid is
/// smaller than 2x2.
pub fn build_mesh(
    elevation: &[f32],
    width: u32,
    height: u32,
    scale: MeshScale,
    polygon: Option<&[Coordinate]>,
    bbox: Option<&BoundingBox>,
) -> Result<Mesh, MeshError> {
    if width < 2 || height < 2 {
        return Err(MeshError::GridTooSmall { width, height });
    }
    if elevation.len() != (width as usize) * (height as usize) {
        return Err(MeshError::DimensionMismatch {
            len: elevation.len(),
            width,
            height,
        });
    }

    let baseline = elevation
        .iter()
        .copied()
        .filter(|v| *v != 0.0 && !v.is_nan())
        .fold(f32::INFINITY, f32::min);
    let baseline = if baseline.is_finite() { baseline } else { 0.0 };

    let mask = polygon
        .filter(|p| p.len() >= 3)
        .zip(bbox)
        .map(|(polygon, bbox)| (to_geo_polygon(polygon), *bbox));

    let vertex_count = (width as usize) * (height as usize);
    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut uvs = Vec::with_capacity(vertex_count * 2);
    let mut masked_out = 0usize;

    for gy in 0..height {
        let ynorm = gy as f32 / (height - 1) as f32;
        for gx in 0..width {
            let xnorm = gx as f32 / (width - 1) as f32;
            let sample = elevation[(gy * width + gx) as usize];

            let mut y = if sample != 0.0 && !sample.is_nan() {
                (sample - baseline) * scale.z as f32
            } else {
                0.0
            };

            if let Some((ref poly, ref bbox)) = mask {
                let lng = bbox.min_lng + xnorm as f64 * bbox.width_deg();
                let lat = bbox.min_lat + ynorm as f64 * bbox.height_deg();
                if !poly.contains(&Point::new(lng, lat)) {
                    y = 0.0;
                    masked_out += 1;
                }
            }

            // Centered grid, X east, Z south, Y up.
            let x = (xnorm - 0.5) * width as f32 * scale.x as f32;
            let z = (0.5 - ynorm) * height as f32 * scale.y as f32;
            positions.extend_from_slice(&[x, y, z]);
            uvs.extend_from_slice(&[xnorm, 1.0 - ynorm]);
        }
    }

    if mask.is_some() {
        debug!(
            masked_out,
            total = vertex_count,
            "applied polygon mask to vertex grid"
        );
    }

    let mut indices = Vec::with_capacity(((width - 1) as usize) * ((height - 1) as usize) * 6);
    for gy in 0..height - 1 {
        for gx in 0..width - 1 {
            let i0 = gy * width + gx;
            let i1 = i0 + 1;
            let i2 = i0 + width;
            let i3 = i2 + 1;

            // Two CCW triangles per cell, viewed from +Y.
            indices.extend_from_slice(&[i0, i1, i2]);
            indices.extend_from_slice(&[i1, i3, i2]);
        }
    }

    let normals = compute_vertex_normals(&positions, &indices);

    Ok(Mesh {
        positions,
        normals,
        uvs,
        indices,
        grid_width: width,
        grid_height: height,
        base_color: BASE_COLOR,
    })
}

/// Area-weighted vertex normals from face normals.
///
/// Unnormalized cross products are accumulated per vertex (the magnitude is
/// twice the face area, giving the area weighting) and normalized at the
/// end. Degenerate vertices default to +Y.
fn compute_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize * 3, tri[1] as usize * 3, tri[2] as usize * 3);

        let u = [
            positions[b] - positions[a],
            positions[b + 1] - positions[a + 1],
            positions[b + 2] - positions[a + 2],
        ];
        let v = [
            positions[c] - positions[a],
            positions[c + 1] - positions[a + 1],
            positions[c + 2] - positions[a + 2],
        ];

        let face = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];

        for &vertex in tri {
            let base = vertex as usize * 3;
            normals[base] += face[0];
            normals[base + 1] += face[1];
            normals[base + 2] += face[2];
        }
    }

    for normal in normals.chunks_exact_mut(3) {
        let len = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if len > 1e-10 {
            normal[0] /= len;
            normal[1] /= len;
            normal[2] /= len;
        } else {
            normal[0] = 0.0;
            normal[1] = 1.0;
            normal[2] = 0.0;
        }
    }

    normals
}
