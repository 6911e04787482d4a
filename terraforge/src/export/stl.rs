//! ASCII STL export.
//!
//! Emits the classic text solid format: a `solid terrain` header, one
//! `facet normal` / `outer loop` / three `vertex` block per triangle, and an
//! `endsolid terrain` trailer. Facet normals are recomputed from the
//! triangle's vertices rather than copied from vertex normals, since STL
//! facets are flat.

use crate::mesh::Mesh;

/// Exports a mesh as an ASCII STL solid.
///
/// `include_base` requests walls and a bottom cap to make the solid
/// manifold for 3D printing. That enhancement is not implemented yet; the
/// flag is accepted so callers do not need to change when it lands, and the
/// surface is exported either way.
pub fn export_stl(mesh: &Mesh, include_base: bool) -> String {
    // TODO: implement the base skirt and bottom cap behind `include_base`
    // so prints are manifold without post-processing.
    let _ = include_base;

    // Each facet block is ~200 bytes of text.
    let mut stl = String::with_capacity(mesh.triangle_count() * 200 + 32);
    stl.push_str("solid terrain\n");

    for tri in mesh.indices.chunks_exact(3) {
        let a = vertex(mesh, tri[0]);
        let b = vertex(mesh, tri[1]);
        let c = vertex(mesh, tri[2]);
        let n = face_normal(a, b, c);

        stl.push_str(&format!("  facet normal {} {} {}\n", n[0], n[1], n[2]));
        stl.push_str("    outer loop\n");
        for v in [a, b, c] {
            stl.push_str(&format!("      vertex {} {} {}\n", v[0], v[1], v[2]));
        }
        stl.push_str("    endloop\n");
        stl.push_str("  endfacet\n");
    }

    stl.push_str("endsolid terrain\n");
    stl
}

fn vertex(mesh: &Mesh, index: u32) -> [f32; 3] {
    let base = index as usize * 3;
    [
        mesh.positions[base],
        mesh.positions[base + 1],
        mesh.positions[base + 2],
    ]
}

/// Unit normal of a triangle, defaulting to +Y for degenerate faces.
fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];

    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];

    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 1e-10 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 1.0, 0.0]
    }
}
