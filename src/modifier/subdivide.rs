use std::collections::HashMap;

use glam::Vec3;

use crate::flat::FlatMesh;

/// Weight of the vertex itself and of each of its `valence` neighbours for an
/// interior vertex.
fn loop_weights(valence: usize) -> (f32, f32) {
    const THREE_OVER_EIGHT: f64 = 3.0 / 8.0;
    let n = valence as f64;
    let alpha = THREE_OVER_EIGHT
        + f64::powi(THREE_OVER_EIGHT + 0.25 * f64::cos(std::f64::consts::TAU / n), 2);
    (alpha as f32, ((1.0 - alpha) / n) as f32)
}

struct Edge {
    ends: (u32, u32),
    /// The vertices opposite to this edge in the triangles using it.
    opposite: Vec<u32>,
}

impl Edge {
    fn is_boundary(&self) -> bool {
        self.opposite.len() != 2
    }
}

/// One level of Loop subdivision on the index topology of the buffer.
fn subdivide_once(mesh: &FlatMesh) -> FlatMesh {
    let nverts = mesh.num_vertices();
    let mut lookup: HashMap<(u32, u32), usize> = HashMap::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut tri_edges: Vec<[usize; 3]> = Vec::with_capacity(mesh.num_triangles());
    for [a, b, c] in mesh.triangles() {
        let mut ids = [0usize; 3];
        for (k, (u, v, w)) in [(a, b, c), (b, c, a), (c, a, b)].into_iter().enumerate() {
            let key = (u.min(v), u.max(v));
            let e = *lookup.entry(key).or_insert_with(|| {
                edges.push(Edge {
                    ends: key,
                    opposite: Vec::with_capacity(2),
                });
                edges.len() - 1
            });
            edges[e].opposite.push(w);
            ids[k] = e;
        }
        tri_edges.push(ids);
    }
    let mut neighbours: Vec<Vec<u32>> = vec![Vec::new(); nverts];
    let mut boundary: Vec<Vec<u32>> = vec![Vec::new(); nverts];
    for e in &edges {
        let (a, b) = e.ends;
        neighbours[a as usize].push(b);
        neighbours[b as usize].push(a);
        if e.is_boundary() {
            boundary[a as usize].push(b);
            boundary[b as usize].push(a);
        }
    }
    let pos = |i: u32| mesh.position(i as usize);
    let mut points: Vec<Vec3> = (0..nverts)
        .map(|v| {
            let p = mesh.position(v);
            match (boundary[v].as_slice(), neighbours[v].len()) {
                (_, 0) => p,
                ([q, r], _) => (p * 6.0 + pos(*q) + pos(*r)) / 8.0,
                // Corners and non-manifold vertices stay in place.
                ([_, ..], _) => p,
                ([], n) => {
                    let (alpha, beta) = loop_weights(n);
                    p * alpha + neighbours[v].iter().map(|q| pos(*q)).sum::<Vec3>() * beta
                }
            }
        })
        .collect();
    points.extend(edges.iter().map(|e| {
        let (a, b) = (pos(e.ends.0), pos(e.ends.1));
        if e.is_boundary() {
            (a + b) * 0.5
        } else {
            (a + b) * (3.0 / 8.0) + (pos(e.opposite[0]) + pos(e.opposite[1])) * (1.0 / 8.0)
        }
    }));
    let uvs = mesh.uvs.as_ref().map(|_| {
        let uv = |i: u32| mesh.uv(i as usize).unwrap_or_default();
        (0..nverts as u32)
            .map(uv)
            .chain(edges.iter().map(|e| (uv(e.ends.0) + uv(e.ends.1)) * 0.5))
            .flat_map(|uv| uv.to_array())
            .collect()
    });
    let mut indices = Vec::with_capacity(mesh.indices.len() * 4);
    for ([a, b, c], [ab, bc, ca]) in mesh.triangles().zip(tri_edges) {
        let [ab, bc, ca] = [ab, bc, ca].map(|e| (nverts + e) as u32);
        indices.extend_from_slice(&[a, ab, ca, ab, b, bc, ca, bc, c, ab, bc, ca]);
    }
    let mut out = FlatMesh::from_points(&points, indices);
    out.uvs = uvs;
    out
}

/// Loop subdivision applied `levels` times. Every level splits each triangle
/// into four and smooths the vertices.
pub(super) fn subdivide(mesh: &FlatMesh, levels: usize) -> FlatMesh {
    let mut out = mesh.clone();
    for _ in 0..levels {
        out = subdivide_once(&out);
    }
    tracing::debug!(
        "Subdivided {} into {} triangles over {levels} levels",
        mesh.num_triangles(),
        out.num_triangles()
    );
    out
}

#[cfg(test)]
mod test {
    use super::{loop_weights, subdivide};
    use crate::{flat::FlatMesh, macros::assert_f32_eq};
    use approx::assert_abs_diff_eq;
    use glam::{Vec3, vec2, vec3};

    #[test]
    fn t_loop_weights() {
        let (alpha, beta) = loop_weights(6);
        assert_f32_eq!(alpha, 0.625, 1e-6);
        assert_f32_eq!(beta, 0.0625, 1e-6);
        for n in 3..12 {
            let (alpha, beta) = loop_weights(n);
            assert_f32_eq!(alpha + beta * n as f32, 1.0, 1e-6);
        }
    }

    #[test]
    fn t_subdivide_cube() {
        let cube = FlatMesh::cube(Vec3::ZERO, 2.0);
        let once = subdivide(&cube, 1);
        // 8 corners and 18 edges.
        assert_eq!(once.num_vertices(), 26);
        assert_eq!(once.num_triangles(), 48);
        let twice = subdivide(&cube, 2);
        assert_eq!(twice.num_vertices(), 26 + 72);
        assert_eq!(twice.num_triangles(), 192);
        twice.validate().expect("Invalid output");
        // Smoothing shrinks the cube but keeps it closed and outward facing.
        let volume = twice.signed_volume();
        assert!(volume > 0.0 && volume < 8.0);
        assert!(twice.points().all(|p| p.abs().max_element() < 1.0));
    }

    #[test]
    fn t_subdivide_flat_triangle() {
        let mut tri = FlatMesh::from_points(
            &[
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 0.0, 0.0),
                vec3(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
        );
        tri.uvs = Some(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        let out = subdivide(&tri, 1);
        assert_eq!(out.num_vertices(), 6);
        assert_eq!(out.num_triangles(), 4);
        assert!(out.points().all(|p| p.z == 0.0));
        // Boundary edge points are midpoints, and their uvs are averaged.
        assert_abs_diff_eq!(out.position(3), vec3(0.5, 0.0, 0.0), epsilon = 1e-5);
        let uv = out.uv(3).expect("Missing uvs");
        assert_abs_diff_eq!(uv, vec2(0.5, 0.0), epsilon = 1e-5);
        // Boundary corners blend with their two boundary neighbours.
        assert_abs_diff_eq!(out.position(0), vec3(0.125, 0.125, 0.0), epsilon = 1e-5);
        // All four triangles keep the orientation of the original.
        for i in 0..4 {
            assert!(out.triangle_area_normal(i).z > 0.0);
        }
        out.validate().expect("Invalid output");
    }

    #[test]
    fn t_zero_levels() {
        let cube = FlatMesh::cube(Vec3::ZERO, 1.0);
        assert_eq!(subdivide(&cube, 0), cube);
    }
}
