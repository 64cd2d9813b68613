use crate::{error::Error, flat::FlatMesh};

use super::Axis;

/// Append a reflected copy of the mesh with reversed winding.
///
/// Without welding the vertex and triangle counts double. With a positive
/// `merge_threshold`, vertices within that distance of the plane are snapped
/// onto it and shared with their mirror images, and mirrored triangles lying
/// entirely on the plane are dropped.
pub(super) fn mirror(
    mesh: &FlatMesh,
    axis: Axis,
    offset: f32,
    merge_threshold: f32,
) -> Result<FlatMesh, Error> {
    if !offset.is_finite() || !(merge_threshold >= 0.0) {
        return Err(Error::InvalidParameter(format!(
            "mirror offset {offset} with merge threshold {merge_threshold}"
        )));
    }
    let k = axis.index();
    let n = mesh.num_vertices();
    let mut out = mesh.clone();
    // Index of the mirror image of each original vertex.
    let mut image = Vec::with_capacity(n);
    let mut welded = vec![false; n];
    for i in 0..n {
        let mut p = mesh.position(i);
        if merge_threshold > 0.0 && (p[k] - offset).abs() <= merge_threshold {
            p[k] = offset;
            out.set_position(i, p);
            welded[i] = true;
            image.push(i as u32);
            continue;
        }
        image.push(out.num_vertices() as u32);
        p[k] = 2.0 * offset - p[k];
        out.positions.extend_from_slice(&p.to_array());
        if let (Some(normals), Some(mut nrm)) = (out.normals.as_mut(), mesh.normal(i)) {
            nrm[k] = -nrm[k];
            normals.extend_from_slice(&nrm.to_array());
        }
        if let (Some(uvs), Some(uv)) = (out.uvs.as_mut(), mesh.uv(i)) {
            uvs.extend_from_slice(&uv.to_array());
        }
    }
    let mut dropped = 0usize;
    for [a, b, c] in mesh.triangles() {
        if [a, b, c].iter().all(|v| welded[*v as usize]) {
            dropped += 1;
            continue;
        }
        out.indices
            .extend([a, c, b].map(|v| image[v as usize]));
    }
    let nwelded = welded.iter().filter(|w| **w).count();
    if nwelded > 0 {
        tracing::debug!(
            "Mirror welded {nwelded} vertices on the plane and dropped {dropped} triangles"
        );
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::mirror;
    use crate::{flat::FlatMesh, macros::assert_f32_eq, macros::assert_vec_eq, modifier::Axis};
    use glam::{Vec3, vec3};

    #[test]
    fn t_mirror_doubles_counts() {
        let cube = FlatMesh::cube(vec3(1.0, 0.0, 0.0), 1.0);
        let out = mirror(&cube, Axis::X, 0.0, 0.0).expect("Cannot mirror");
        assert_eq!(out.num_vertices(), 16);
        assert_eq!(out.num_triangles(), 24);
        for i in 0..8 {
            let (p, q) = (out.position(i), out.position(i + 8));
            assert_vec_eq!(q, vec3(-p.x, p.y, p.z));
        }
        // Reversed winding keeps the mirrored copy facing outward.
        assert_f32_eq!(out.signed_volume(), 2.0, 1e-5);
        out.validate().expect("Invalid output");
    }

    #[test]
    fn t_mirror_offset_plane() {
        let cube = FlatMesh::cube(Vec3::ZERO, 1.0);
        let out = mirror(&cube, Axis::Y, 1.0, 0.0).expect("Cannot mirror");
        let min = (8..16)
            .map(|i| out.position(i).y)
            .fold(f32::INFINITY, f32::min);
        assert_f32_eq!(min, 1.5, 1e-6);
    }

    #[test]
    fn t_mirror_welds_on_plane() {
        // Open quad touching the plane x = 0 along one edge.
        let quad = FlatMesh::from_points(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(1.0, 1.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        );
        let unwelded = mirror(&quad, Axis::X, 0.0, 0.0).expect("Cannot mirror");
        assert_eq!(unwelded.num_vertices(), 8);
        let out = mirror(&quad, Axis::X, 0.0, 1e-3).expect("Cannot mirror");
        assert_eq!(out.num_vertices(), 6);
        assert_eq!(out.num_triangles(), 4);
        out.validate().expect("Invalid output");
        // Welded corners are shared by both halves.
        let uses = |v: u32| out.indices.iter().filter(|i| **i == v).count();
        assert_eq!(uses(0), 4);
        assert_eq!(uses(3), 2);
    }

    #[test]
    fn t_mirror_drops_triangles_on_plane() {
        let tri = FlatMesh::from_points(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(0.0, 1.0, 0.0),
                vec3(0.0005, 0.0, 1.0),
            ],
            vec![0, 1, 2],
        );
        let out = mirror(&tri, Axis::X, 0.0, 1e-3).expect("Cannot mirror");
        assert_eq!(out.num_vertices(), 3);
        assert_eq!(out.num_triangles(), 1);
        assert_f32_eq!(out.position(2).x, 0.0);
        assert!(mirror(&tri, Axis::X, f32::NAN, 0.0).is_err());
        assert!(mirror(&tri, Axis::X, 0.0, -1.0).is_err());
    }
}
