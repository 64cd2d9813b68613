use glam::{Vec2, Vec3};

use crate::{
    config::KNIFE_PLANE_TOLERANCE,
    element::{FH, VH},
    error::Error,
    math,
    mesh::QMesh,
};

fn cross2(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let t = if ab.length_squared() > 0.0 {
        ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance(a + ab * t)
}

/// Crossing number test, counting points within `tol` of the boundary as
/// inside.
fn inside_polygon(p: Vec2, poly: &[Vec2], tol: f32) -> bool {
    let n = poly.len();
    if (0..n).any(|i| segment_distance(p, poly[i], poly[(i + 1) % n]) <= tol) {
        return true;
    }
    let mut inside = false;
    for i in 0..n {
        let (a, b) = (poly[i], poly[(i + 1) % n]);
        if (a.y > p.y) != (b.y > p.y) && p.x < a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x) {
            inside = !inside;
        }
    }
    inside
}

/// Where a cut line crosses the boundary of the face.
#[derive(Clone, Copy)]
struct Hit {
    /// Parameter along the cut line.
    s: f32,
    /// Index of the boundary edge, from vertex `edge` to `edge + 1`.
    edge: usize,
    /// Parameter along the boundary edge.
    u: f32,
}

/// One end of the cut after snapping.
#[derive(Clone, Copy, PartialEq)]
enum End {
    Vertex(usize),
    Edge(usize, Vec3),
}

impl QMesh {
    /// Cut a face in two along the line through `p1` and `p2`.
    ///
    /// Both points must lie on the face, either inside or on its boundary.
    /// The chord is extended in both directions until it meets the boundary.
    /// Chord ends close to an existing vertex reuse it, otherwise the boundary
    /// edge is split, in the neighbouring face as well. The first returned
    /// face keeps the handle of the cut face.
    ///
    /// Fails with [`Error::DegenerateCut`] if the points coincide or the cut
    /// runs along the boundary, and with [`Error::PointOutsideFace`] if a
    /// point is off the face.
    pub fn split_face(&mut self, f: FH, p1: Vec3, p2: Vec3) -> Result<[FH; 2], Error> {
        if !self.is_valid_face(f) {
            return Err(Error::InvalidFace(f));
        }
        let verts = self.face_vertices(f);
        let pts = self.face_points(f);
        let n = pts.len();
        let normal = math::newell_normal(&pts);
        if normal.length_squared() == 0.0 {
            return Err(Error::DegenerateFace(format!("{f} has no area")));
        }
        let normal = normal.normalize();
        let size = (0..n)
            .map(|i| pts[i].distance(pts[(i + 1) % n]))
            .fold(0.0f32, f32::max);
        let tol = KNIFE_PLANE_TOLERANCE * size;
        if p1.distance(p2) <= tol {
            return Err(Error::DegenerateCut);
        }
        if [p1, p2]
            .iter()
            .any(|p| normal.dot(*p - pts[0]).abs() > tol)
        {
            return Err(Error::PointOutsideFace);
        }
        let axis = math::dominant_axis(normal);
        let flip = normal[axis] < 0.0;
        let poly: Vec<Vec2> = pts.iter().map(|p| math::project(*p, axis, flip)).collect();
        let (q1, q2) = (
            math::project(p1, axis, flip),
            math::project(p2, axis, flip),
        );
        // Projection shrinks distances by at most the cosine with the axis.
        let tol2 = tol * normal[axis].abs();
        if !inside_polygon(q1, &poly, tol2) || !inside_polygon(q2, &poly, tol2) {
            return Err(Error::PointOutsideFace);
        }
        let dir = q2 - q1;
        let stol = tol2 / dir.length();
        let hits: Vec<Hit> = (0..n)
            .filter_map(|i| {
                let (a, b) = (poly[i], poly[(i + 1) % n]);
                let e = b - a;
                let denom = cross2(dir, e);
                if denom.abs() <= f32::EPSILON * dir.length() * e.length() {
                    // Parallel to the edge.
                    return None;
                }
                let s = cross2(a - q1, e) / denom;
                let u = cross2(a - q1, dir) / denom;
                (-1e-4..=1.0 + 1e-4).contains(&u).then_some(Hit {
                    s,
                    edge: i,
                    u: u.clamp(0.0, 1.0),
                })
            })
            .collect();
        if hits.iter().any(|h| h.s > stol && h.s < 1.0 - stol) {
            // The segment between the points leaves the face.
            return Err(Error::PointOutsideFace);
        }
        let before = hits
            .iter()
            .filter(|h| h.s <= stol)
            .max_by(|a, b| a.s.total_cmp(&b.s));
        let after = hits
            .iter()
            .filter(|h| h.s >= 1.0 - stol)
            .min_by(|a, b| a.s.total_cmp(&b.s));
        let (Some(before), Some(after)) = (before, after) else {
            return Err(Error::DegenerateCut);
        };
        let snap = |hit: &Hit| -> End {
            let (i, j) = (hit.edge, (hit.edge + 1) % n);
            let p = pts[i].lerp(pts[j], hit.u);
            if p.distance(pts[i]) <= tol {
                End::Vertex(i)
            } else if p.distance(pts[j]) <= tol {
                End::Vertex(j)
            } else {
                End::Edge(i, p)
            }
        };
        let (e1, e2) = (snap(before), snap(after));
        let adjacent = |i: usize, j: usize| (i + 1) % n == j || (j + 1) % n == i;
        let degenerate = match (e1, e2) {
            (End::Vertex(i), End::Vertex(j)) => i == j || adjacent(i, j),
            (End::Edge(i, _), End::Edge(j, _)) => i == j,
            (End::Vertex(v), End::Edge(e, _)) | (End::Edge(e, _), End::Vertex(v)) => {
                v == e || v == (e + 1) % n
            }
        };
        if degenerate {
            return Err(Error::DegenerateCut);
        }
        self.transact(|mesh| {
            let mut resolve = |end: End| -> Result<VH, Error> {
                match end {
                    End::Vertex(i) => Ok(verts[i]),
                    End::Edge(i, p) => {
                        let v = mesh.add_vertex(p);
                        mesh.insert_in_edge(verts[i], verts[(i + 1) % n], v)?;
                        Ok(v)
                    }
                }
            };
            let c1 = resolve(e1)?;
            let c2 = resolve(e2)?;
            let cycle = mesh.face_vertices(f);
            let m = cycle.len();
            let i1 = cycle
                .iter()
                .position(|v| *v == c1)
                .ok_or(Error::InvalidVertex(c1))?;
            let i2 = cycle
                .iter()
                .position(|v| *v == c2)
                .ok_or(Error::InvalidVertex(c2))?;
            let first: Vec<VH> = (0..m)
                .map(|k| cycle[(i1 + k) % m])
                .take((i2 + m - i1) % m + 1)
                .collect();
            let second: Vec<VH> = (0..m)
                .map(|k| cycle[(i2 + k) % m])
                .take((i1 + m - i2) % m + 1)
                .collect();
            mesh.topol.replace_face(f, &first)?;
            let other = mesh.topol.add_face(&second)?;
            tracing::debug!("Split {f} into {} and {} vertices", first.len(), second.len());
            Ok([f, other])
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{element::FH, error::Error, macros::assert_f32_eq, mesh::QMesh};
    use glam::vec3;

    #[test]
    fn t_split_interior_points() {
        let mut grid = QMesh::quad_grid(1, 1, 1.0).expect("Cannot create grid");
        let [a, b] = grid
            .split_face(0.into(), vec3(0.5, 0.2, 0.0), vec3(0.5, 0.8, 0.0))
            .expect("Cannot split face");
        assert_eq!(a, FH::from(0));
        assert_eq!(grid.num_faces(), 2);
        assert_eq!(grid.num_vertices(), 6);
        assert_eq!(grid.face_valence(a), 4);
        assert_eq!(grid.face_valence(b), 4);
        assert_f32_eq!(grid.face_area(a), 0.5, 1e-6);
        assert_f32_eq!(grid.face_area(b), 0.5, 1e-6);
        grid.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_split_diagonal() {
        let mut grid = QMesh::quad_grid(1, 1, 1.0).expect("Cannot create grid");
        let [a, b] = grid
            .split_face(0.into(), vec3(0.0, 0.0, 0.0), vec3(1.0, 1.0, 0.0))
            .expect("Cannot split face");
        assert_eq!(grid.num_vertices(), 4);
        assert_eq!(grid.face_valence(a), 3);
        assert_eq!(grid.face_valence(b), 3);
        grid.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_split_updates_neighbours() {
        let mut qbox = QMesh::unit_box().expect("Cannot create box");
        // Across the top face, through the middle of two opposite edges.
        qbox.split_face(5.into(), vec3(0.5, 0.0, 1.0), vec3(0.5, 1.0, 1.0))
            .expect("Cannot split face");
        assert_eq!(qbox.num_faces(), 7);
        assert_eq!(qbox.num_vertices(), 10);
        assert_eq!(qbox.face_valence(1.into()), 5);
        assert_eq!(qbox.face_valence(3.into()), 5);
        assert_f32_eq!(qbox.volume(), 1.0, 1e-5);
        assert!(qbox
            .edges()
            .iter()
            .all(|e| !qbox.is_boundary_edge(e.key).unwrap()));
        qbox.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_split_errors() {
        let mut grid = QMesh::quad_grid(1, 1, 1.0).expect("Cannot create grid");
        let p = vec3(0.5, 0.5, 0.0);
        assert_eq!(
            grid.split_face(0.into(), p, p),
            Err(Error::DegenerateCut)
        );
        assert_eq!(
            grid.split_face(0.into(), p, vec3(3.0, 0.5, 0.0)),
            Err(Error::PointOutsideFace)
        );
        assert_eq!(
            grid.split_face(0.into(), p, vec3(0.5, 0.5, 1.0)),
            Err(Error::PointOutsideFace)
        );
        // Along an existing edge.
        assert_eq!(
            grid.split_face(0.into(), vec3(0.2, 0.0, 0.0), vec3(0.7, 0.0, 0.0)),
            Err(Error::DegenerateCut)
        );
        assert_eq!(grid.num_faces(), 1);
        assert_eq!(grid.num_vertices(), 4);
        grid.check_topology().expect("Topological errors found");
    }
}
