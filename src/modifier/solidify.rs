use std::collections::HashMap;

use crate::{error::Error, flat::FlatMesh};

/// Position key for grouping buffer vertices that share a location.
fn position_key(mesh: &FlatMesh, i: u32) -> [u32; 3] {
    mesh.position(i as usize).to_array().map(f32::to_bits)
}

/// Directed edges of triangles whose undirected edge, by position, is used by
/// exactly one triangle.
fn boundary_edges(mesh: &FlatMesh) -> Vec<(u32, u32)> {
    let mut ids: HashMap<[u32; 3], u32> = HashMap::new();
    let id: Vec<u32> = (0..mesh.num_vertices() as u32)
        .map(|i| {
            let next = ids.len() as u32;
            *ids.entry(position_key(mesh, i)).or_insert(next)
        })
        .collect();
    let mut uses: HashMap<(u32, u32), (usize, (u32, u32))> = HashMap::new();
    let mut order = Vec::new();
    for [a, b, c] in mesh.triangles() {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            let (iu, iv) = (id[u as usize], id[v as usize]);
            if iu == iv {
                continue;
            }
            let key = (iu.min(iv), iu.max(iv));
            uses.entry(key)
                .and_modify(|e| e.0 += 1)
                .or_insert_with(|| {
                    order.push(key);
                    (1, (u, v))
                });
        }
    }
    order
        .into_iter()
        .filter_map(|key| match uses.get(&key) {
            Some((1, edge)) => Some(*edge),
            _ => None,
        })
        .collect()
}

/// Offset a copy of the surface along the vertex normals by
/// `thickness + offset`, and close the gap between the two surfaces along the
/// open boundary.
///
/// The surface that ends up on the inside of the shell is flipped so that the
/// result faces outward.
pub(super) fn solidify(mesh: &FlatMesh, thickness: f32, offset: f32) -> Result<FlatMesh, Error> {
    let delta = thickness + offset;
    if !delta.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "solidify thickness {thickness} with offset {offset}"
        )));
    }
    let mut src = mesh.clone();
    if src.normals.is_none() {
        src.compute_normals();
    }
    let n = src.num_vertices() as u32;
    let mut shell = src.clone();
    for i in 0..shell.num_vertices() {
        let p = src.position(i) + src.normal(i).unwrap_or_default() * delta;
        shell.set_position(i, p);
    }
    let rim = boundary_edges(&src);
    let outward = delta > 0.0;
    if outward {
        src.flip();
    } else {
        shell.flip();
    }
    let mut out = src;
    out.append(&shell);
    for (a, b) in rim {
        let quad = if outward {
            [a, b, b + n, a + n]
        } else {
            [b, a, a + n, b + n]
        };
        out.indices
            .extend_from_slice(&[quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
    }
    tracing::debug!(
        "Solidified {} triangles with {} rim triangles",
        mesh.num_triangles(),
        out.num_triangles() - 2 * mesh.num_triangles()
    );
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::{boundary_edges, solidify};
    use crate::{flat::FlatMesh, macros::assert_f32_eq};
    use glam::{Vec3, vec3};

    fn quad() -> FlatMesh {
        FlatMesh::from_points(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn t_boundary_edges() {
        assert_eq!(boundary_edges(&quad()).len(), 4);
        assert!(boundary_edges(&FlatMesh::cube(Vec3::ZERO, 1.0)).is_empty());
        // Split corners are still matched by position.
        let split = FlatMesh::from_points(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 3, 4, 5],
        );
        assert_eq!(boundary_edges(&split).len(), 4);
    }

    #[test]
    fn t_solidify_open_quad() {
        let out = solidify(&quad(), 0.1, 0.0).expect("Cannot solidify");
        assert_eq!(out.num_vertices(), 8);
        // Two surfaces and a rim of four quads.
        assert_eq!(out.num_triangles(), 2 + 2 + 8);
        // A closed slab facing outward.
        assert_f32_eq!(out.signed_volume(), 0.1, 1e-5);
        out.validate().expect("Invalid output");
    }

    #[test]
    fn t_solidify_inward() {
        let out = solidify(&quad(), 0.1, -0.3).expect("Cannot solidify");
        assert_f32_eq!(out.position(4).z, -0.2, 1e-6);
        assert_f32_eq!(out.signed_volume(), 0.2, 1e-5);
    }

    #[test]
    fn t_solidify_closed_mesh_has_no_rim() {
        let cube = FlatMesh::cube(Vec3::ZERO, 2.0);
        let out = solidify(&cube, 0.1, 0.0).expect("Cannot solidify");
        assert_eq!(out.num_vertices(), 16);
        assert_eq!(out.num_triangles(), 24);
        // The outer shell grows and the flipped inner surface subtracts.
        let shell = out.signed_volume();
        assert!(shell > 0.0 && shell < 8.0);
        assert!(solidify(&cube, f32::INFINITY, 0.0).is_err());
    }
}
