use glam::{Vec2, Vec3};

use crate::{
    element::{FH, VH},
    error::Error,
    math,
    mesh::QMesh,
};

fn cross2(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Whether `p` lies inside or on the border of the counter-clockwise triangle
/// `abc`. A point on a corner does not count.
fn inside_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    if p == a || p == b || p == c {
        return false;
    }
    cross2(b - a, p - a) >= 0.0 && cross2(c - b, p - b) >= 0.0 && cross2(a - c, p - c) >= 0.0
}

fn fan(idx: &[usize], out: &mut Vec<[usize; 3]>) {
    for i in 1..idx.len().saturating_sub(1) {
        out.push([idx[0], idx[i], idx[i + 1]]);
    }
}

/// Triangulate a simple polygon by ear clipping in its dominant plane.
///
/// Returns triangles as indices into `points`, wound the same way as the
/// polygon. If no ear can be found, for example on a self intersecting
/// polygon, the remaining part is fan triangulated.
pub fn triangulate_polygon(points: &[Vec3]) -> Vec<[usize; 3]> {
    let n = points.len();
    let mut out = Vec::with_capacity(n.saturating_sub(2));
    if n < 3 {
        return out;
    }
    let mut idx: Vec<usize> = (0..n).collect();
    if n == 3 {
        out.push([0, 1, 2]);
        return out;
    }
    let normal = math::newell_normal(points);
    if normal.length_squared() == 0.0 {
        fan(&idx, &mut out);
        return out;
    }
    let axis = math::dominant_axis(normal);
    let flip = normal[axis] < 0.0;
    let flat: Vec<Vec2> = points.iter().map(|p| math::project(*p, axis, flip)).collect();
    // Area scaled tolerance for convexity.
    let eps = {
        let size = flat
            .iter()
            .fold(Vec2::ZERO, |m, p| m.max(p.abs()))
            .max_element()
            .max(f32::MIN_POSITIVE);
        size * size * 1e-7
    };
    while idx.len() > 3 {
        let m = idx.len();
        let ear = (0..m).find(|&i| {
            let (ia, ib, ic) = (idx[(i + m - 1) % m], idx[i], idx[(i + 1) % m]);
            let (a, b, c) = (flat[ia], flat[ib], flat[ic]);
            if cross2(b - a, c - b) <= eps {
                return false;
            }
            idx.iter()
                .filter(|&&j| j != ia && j != ib && j != ic)
                .all(|&j| !inside_triangle(flat[j], a, b, c))
        });
        match ear {
            Some(i) => {
                out.push([idx[(i + m - 1) % m], idx[i], idx[(i + 1) % m]]);
                idx.remove(i);
            }
            None => {
                tracing::debug!("Ear clipping stuck with {m} vertices left, falling back to a fan");
                fan(&idx, &mut out);
                return out;
            }
        }
    }
    out.push([idx[0], idx[1], idx[2]]);
    out
}

impl QMesh {
    /// Triangles covering the face, as vertex triplets wound like the face.
    pub fn triangulated_face_vertices(&self, f: FH) -> Vec<[VH; 3]> {
        let verts = self.face_vertices(f);
        let points: Vec<Vec3> = verts.iter().map(|v| self.point(*v)).collect();
        triangulate_polygon(&points)
            .into_iter()
            .map(|[a, b, c]| [verts[a], verts[b], verts[c]])
            .collect()
    }

    pub fn triangulated_vertices(&self) -> Vec<[VH; 3]> {
        self.faces()
            .flat_map(|f| self.triangulated_face_vertices(f))
            .collect()
    }

    /// Split every face with more than three vertices into triangles. The
    /// first triangle of each face keeps the face handle.
    pub fn triangulate(&mut self) -> Result<(), Error> {
        self.transact(|mesh| {
            let faces: Vec<FH> = mesh.faces().filter(|f| mesh.face_valence(*f) > 3).collect();
            for f in faces {
                let tris = mesh.triangulated_face_vertices(f);
                mesh.topol.remove_face(f)?;
                let mut tris = tris.into_iter();
                if let Some(first) = tris.next() {
                    mesh.topol.add_face_at(Some(f), &first)?;
                }
                for tri in tris {
                    mesh.topol.add_face(&tri)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use super::triangulate_polygon;
    use crate::{macros::assert_f32_eq, math, mesh::QMesh};
    use glam::{Vec3, vec3};

    fn tri_area_sum(points: &[Vec3], tris: &[[usize; 3]]) -> f32 {
        tris.iter()
            .map(|[a, b, c]| math::polygon_area(&[points[*a], points[*b], points[*c]]))
            .sum()
    }

    #[test]
    fn t_concave_polygon() {
        /*
         * 4-------3
         * |      /
         * |     2
         * |      \
         * 0-------1
         */
        let points = [
            vec3(0.0, 0.0, 0.0),
            vec3(2.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.0),
            vec3(2.0, 2.0, 0.0),
            vec3(0.0, 2.0, 0.0),
        ];
        let tris = triangulate_polygon(&points);
        assert_eq!(tris.len(), 3);
        assert_f32_eq!(
            tri_area_sum(&points, &tris),
            math::polygon_area(&points),
            1e-5
        );
        // Every triangle keeps the winding of the polygon.
        for [a, b, c] in &tris {
            let n = math::newell_normal(&[points[*a], points[*b], points[*c]]);
            assert!(n.z > 0.0);
        }
    }

    #[test]
    fn t_collinear_corners() {
        // A triangle with extra corners in the middle of two of its edges.
        let points = [
            vec3(0.0, -0.5, -0.5),
            vec3(0.0, -0.5, 0.0),
            vec3(0.0, -0.5, 0.5),
            vec3(0.0, 0.0, 0.5),
            vec3(0.0, 0.5, 0.5),
        ];
        let tris = triangulate_polygon(&points);
        assert_eq!(tris.len(), 3);
        for [a, b, c] in &tris {
            assert!(math::polygon_area(&[points[*a], points[*b], points[*c]]) > 0.01);
        }
        assert_f32_eq!(tri_area_sum(&points, &tris), 0.5, 1e-6);
    }

    #[test]
    fn t_polygon_facing_down() {
        let points = [
            vec3(0.0, 0.0, 1.0),
            vec3(0.0, 1.0, 1.0),
            vec3(1.0, 1.0, 1.0),
            vec3(1.0, 0.0, 1.0),
        ];
        let tris = triangulate_polygon(&points);
        assert_eq!(tris.len(), 2);
        for [a, b, c] in &tris {
            assert!(math::newell_normal(&[points[*a], points[*b], points[*c]]).z < 0.0);
        }
    }

    #[test]
    fn t_box_triangulation() {
        let mut qbox = QMesh::unit_box().expect("Cannot create box");
        assert_eq!(qbox.triangulated_vertices().len(), 12);
        qbox.triangulate().expect("Cannot triangulate");
        assert_eq!(qbox.num_faces(), 12);
        assert_eq!(qbox.num_edges(), 18);
        assert!(qbox.faces().all(|f| qbox.face_valence(f) == 3));
        assert_f32_eq!(qbox.volume(), 1.0, 1e-6);
        qbox.check_topology().expect("Topological errors found");
    }
}
