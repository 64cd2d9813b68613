//! Conversion between the halfedge mesh and flat triangle buffers.

use std::collections::HashMap;

use glam::Vec3;

use crate::{
    config::{BridgeConfig, Weld},
    element::{Handle, VH},
    error::Error,
    flat::FlatMesh,
    math::Aabb,
    mesh::QMesh,
};

fn weld_key(weld: Weld, index: usize, p: Vec3) -> [i64; 3] {
    match weld {
        Weld::Index => [index as i64, 0, 0],
        Weld::Exact => p.to_array().map(|x| {
            // Treat negative zero as zero.
            let x = if x == 0.0 { 0.0f32 } else { x };
            x.to_bits() as i64
        }),
        Weld::Epsilon(tol) => p.to_array().map(|x| (x / tol).round() as i64),
    }
}

/// Build a halfedge mesh from a flat triangle buffer with the default
/// configuration, welding corners with bit identical positions.
pub fn decompile(flat: &FlatMesh) -> Result<QMesh, Error> {
    decompile_with(flat, &BridgeConfig::default())
}

/// Build a halfedge mesh from a flat triangle buffer.
///
/// Corners are grouped into vertices according to `config.weld`. Triangles
/// that collapse because two of their corners weld together are skipped.
/// Meshes with an edge shared by more than two triangles, or by two triangles
/// with the same orientation, are rejected with [`Error::NonManifoldEdge`].
/// Buffer vertices not used by any triangle are dropped.
pub fn decompile_with(flat: &FlatMesh, config: &BridgeConfig) -> Result<QMesh, Error> {
    flat.validate()?;
    if let Weld::Epsilon(tol) = config.weld {
        if !(tol > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "weld tolerance must be positive, got {tol}"
            )));
        }
    }
    let nverts = flat.num_vertices();
    let mut used = vec![false; nverts];
    for i in &flat.indices {
        used[*i as usize] = true;
    }
    let mut mesh = QMesh::with_capacity(nverts, flat.num_triangles());
    let mut welded: HashMap<[i64; 3], VH> = HashMap::with_capacity(nverts);
    let mut vmap: Vec<Option<VH>> = vec![None; nverts];
    for (i, slot) in vmap.iter_mut().enumerate() {
        if !used[i] {
            continue;
        }
        let p = flat.position(i);
        let v = *welded
            .entry(weld_key(config.weld, i, p))
            .or_insert_with(|| mesh.add_vertex(p));
        *slot = Some(v);
    }
    let mut skipped = 0usize;
    for (ti, tri) in flat.triangles().enumerate() {
        let mut verts = [VH::from(0); 3];
        for (dst, src) in verts.iter_mut().zip(tri) {
            *dst = vmap[src as usize].ok_or_else(|| {
                Error::InvalidBuffer(format!("triangle {ti} uses an unmapped vertex"))
            })?;
        }
        let [a, b, c] = verts;
        if a == b || b == c || c == a {
            tracing::debug!("Skipping degenerate triangle {ti}: {a}, {b}, {c}");
            skipped += 1;
            continue;
        }
        mesh.add_face(&verts)?;
    }
    tracing::debug!(
        "Decompiled {} triangles into {} vertices and {} faces, skipped {skipped}",
        flat.num_triangles(),
        mesh.num_vertices(),
        mesh.num_faces()
    );
    Ok(mesh)
}

/// Flatten a halfedge mesh into an indexed triangle buffer.
///
/// Faces with more than three vertices are triangulated by ear clipping.
/// Only vertices used by a face are emitted, in increasing handle order.
/// Vertex normals are area weighted averages of the face normals, and the
/// bounds are recomputed. The halfedge mesh carries no texture coordinates, so
/// `uvs` is `None`.
pub fn compile(mesh: &QMesh) -> FlatMesh {
    let nslots = mesh
        .vertices()
        .map(|v| v.index() as usize + 1)
        .max()
        .unwrap_or(0);
    let mut remap: Vec<Option<u32>> = vec![None; nslots];
    let mut positions = Vec::with_capacity(mesh.num_vertices() * 3);
    let mut count = 0u32;
    for v in mesh.vertices().filter(|v| !mesh.is_isolated_vertex(*v)) {
        remap[v.index() as usize] = Some(count);
        positions.extend_from_slice(&mesh.point(v).to_array());
        count += 1;
    }
    let mut normals = vec![Vec3::ZERO; count as usize];
    let mut indices = Vec::with_capacity(mesh.num_faces() * 3);
    for f in mesh.faces() {
        let n = mesh.face_area_normal(f);
        for v in mesh.face_vertices(f) {
            if let Some(i) = remap[v.index() as usize] {
                normals[i as usize] += n;
            }
        }
        for tri in mesh.triangulated_face_vertices(f) {
            indices.extend(tri.iter().filter_map(|v| remap[v.index() as usize]));
        }
    }
    let mut flat = FlatMesh {
        normals: Some(
            normals
                .into_iter()
                .flat_map(|n| n.normalize_or_zero().to_array())
                .collect(),
        ),
        ..FlatMesh::new(positions, indices)
    };
    flat.bounds = Aabb::from_points(flat.points());
    tracing::debug!(
        "Compiled {} faces into {} triangles",
        mesh.num_faces(),
        flat.num_triangles()
    );
    flat
}

#[cfg(test)]
mod test {
    use super::{compile, decompile, decompile_with};
    use crate::{
        config::{BridgeConfig, Weld},
        error::Error,
        flat::FlatMesh,
        macros::assert_f32_eq,
        mesh::QMesh,
    };
    use glam::{Vec3, vec3};

    /// Cube as a triangle soup, every triangle with its own corners.
    fn cube_soup() -> FlatMesh {
        let cube = FlatMesh::cube(Vec3::ZERO, 1.0);
        let points: Vec<Vec3> = cube
            .indices
            .iter()
            .map(|i| cube.position(*i as usize))
            .collect();
        FlatMesh::from_points(&points, (0..36).collect())
    }

    #[test]
    fn t_decompile_cube() {
        let mesh = decompile(&FlatMesh::cube(Vec3::ZERO, 1.0)).expect("Cannot decompile");
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_faces(), 12);
        assert_eq!(mesh.num_edges(), 18);
        assert!(mesh.edges().iter().all(|e| mesh.is_boundary_edge(e.key) == Ok(false)));
        mesh.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_weld_modes() {
        let soup = cube_soup();
        let exact = decompile(&soup).expect("Cannot decompile");
        assert_eq!(exact.num_vertices(), 8);
        exact.check_topology().expect("Topological errors found");
        let by_index = decompile_with(&soup, &BridgeConfig::default().with_weld(Weld::Index))
            .expect("Cannot decompile");
        assert_eq!(by_index.num_vertices(), 36);
        assert_eq!(by_index.num_faces(), 12);
        // Nudge one corner, only the epsilon weld merges it back.
        let mut noisy = soup.clone();
        let p = noisy.position(0);
        noisy.set_position(0, p + vec3(1e-6, 0.0, 0.0));
        let eps = decompile_with(&noisy, &BridgeConfig::default().with_weld(Weld::Epsilon(1e-3)))
            .expect("Cannot decompile");
        assert_eq!(eps.num_vertices(), 8);
        assert!(
            decompile_with(&soup, &BridgeConfig::default().with_weld(Weld::Epsilon(0.0))).is_err()
        );
    }

    #[test]
    fn t_reject_non_manifold() {
        // Three triangles sharing the edge 0-1.
        let flat = FlatMesh::from_points(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(0.5, 1.0, 0.0),
                vec3(0.5, -1.0, 0.0),
                vec3(0.5, 0.0, 1.0),
            ],
            vec![0, 1, 2, 1, 0, 3, 0, 1, 4],
        );
        assert_eq!(
            decompile(&flat).map(|_| ()),
            Err(Error::NonManifoldEdge(0.into(), 1.into()))
        );
    }

    #[test]
    fn t_skip_degenerate_triangles() {
        let flat = FlatMesh::from_points(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(0.0, 1.0, 0.0),
                vec3(1.0, 0.0, 0.0),
            ],
            vec![0, 1, 2, 0, 1, 3],
        );
        let mesh = decompile(&flat).expect("Cannot decompile");
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_vertices(), 3);
    }

    #[test]
    fn t_round_trip_preserves_triangles() {
        let flat = FlatMesh::cube(vec3(1.0, 2.0, 3.0), 2.0);
        let back = compile(&decompile(&flat).expect("Cannot decompile"));
        assert_eq!(back.num_triangles(), flat.num_triangles());
        assert_eq!(back.num_vertices(), flat.num_vertices());
        assert_eq!(back.bounds, flat.bounds);
        back.validate().expect("Invalid buffer");
    }

    #[test]
    fn t_compile_quad_box() {
        let mut qbox = QMesh::unit_box().expect("Cannot create box");
        let extra = qbox.add_vertex(vec3(5.0, 5.0, 5.0));
        let flat = compile(&qbox);
        assert!(qbox.is_isolated_vertex(extra));
        assert_eq!(flat.num_vertices(), 8);
        assert_eq!(flat.num_triangles(), 12);
        assert!(flat.uvs.is_none());
        for i in 0..flat.num_vertices() {
            let n = flat.normal(i).expect("Missing normals");
            assert_f32_eq!(n.length(), 1.0, 1e-6);
            // Corner normals point away from the box center.
            assert!(n.dot(flat.position(i) - Vec3::splat(0.5)) > 0.0);
        }
        assert_eq!(flat.bounds.expect("Missing bounds").max, Vec3::ONE);
    }
}
