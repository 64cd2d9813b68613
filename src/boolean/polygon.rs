use glam::DVec3;

use super::plane::{BACK, COPLANAR, FRONT, Plane, SPANNING};

/// Convex polygon carrying its supporting plane.
#[derive(Debug, Clone)]
pub(super) struct Polygon {
    pub(super) vertices: Vec<DVec3>,
    pub(super) plane: Plane,
}

/// Destination lists for [`Polygon::split`].
#[derive(Default)]
pub(super) struct Split {
    pub(super) coplanar_front: Vec<Polygon>,
    pub(super) coplanar_back: Vec<Polygon>,
    pub(super) front: Vec<Polygon>,
    pub(super) back: Vec<Polygon>,
}

impl Polygon {
    pub(super) fn new(vertices: Vec<DVec3>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(vertices[0], vertices[1], vertices[2])?;
        Some(Polygon { vertices, plane })
    }

    pub(super) fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    /// Sort this polygon into `out` relative to `plane`. Polygons spanning the
    /// plane are cut in two.
    pub(super) fn split(self, plane: &Plane, out: &mut Split) {
        let sides: Vec<u8> = self.vertices.iter().map(|v| plane.side(*v)).collect();
        let kind = sides.iter().fold(COPLANAR, |acc, s| acc | s);
        match kind {
            COPLANAR => {
                if plane.normal.dot(self.plane.normal) > 0.0 {
                    out.coplanar_front.push(self);
                } else {
                    out.coplanar_back.push(self);
                }
            }
            FRONT => out.front.push(self),
            BACK => out.back.push(self),
            _ => {
                debug_assert_eq!(kind, SPANNING);
                let n = self.vertices.len();
                let mut front = Vec::with_capacity(n + 1);
                let mut back = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (si, sj) = (sides[i], sides[j]);
                    let (vi, vj) = (self.vertices[i], self.vertices[j]);
                    if si != BACK {
                        front.push(vi);
                    }
                    if si != FRONT {
                        back.push(vi);
                    }
                    if si | sj == SPANNING {
                        let t = (plane.w - plane.normal.dot(vi)) / plane.normal.dot(vj - vi);
                        let v = vi.lerp(vj, t);
                        front.push(v);
                        back.push(v);
                    }
                }
                // Pieces keep the plane of the original polygon.
                if front.len() >= 3 {
                    out.front.push(Polygon {
                        vertices: front,
                        plane: self.plane,
                    });
                }
                if back.len() >= 3 {
                    out.back.push(Polygon {
                        vertices: back,
                        plane: self.plane,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Polygon, Split};
    use crate::boolean::plane::Plane;
    use glam::DVec3;

    fn triangle(z: [f64; 3]) -> Polygon {
        Polygon::new(vec![
            DVec3::new(0.0, 0.0, z[0]),
            DVec3::new(1.0, 0.0, z[1]),
            DVec3::new(0.0, 1.0, z[2]),
        ])
        .expect("Degenerate polygon")
    }

    fn xy_plane() -> Plane {
        Plane::from_points(DVec3::ZERO, DVec3::X, DVec3::Y).expect("Degenerate plane")
    }

    #[test]
    fn t_split_spanning() {
        let mut out = Split::default();
        triangle([-1.0, -1.0, 1.0]).split(&xy_plane(), &mut out);
        assert_eq!(out.front.len(), 1);
        assert_eq!(out.back.len(), 1);
        assert_eq!(out.front[0].vertices.len(), 3);
        assert_eq!(out.back[0].vertices.len(), 4);
        for v in out.front[0].vertices.iter().chain(out.back[0].vertices.iter()) {
            assert!(v.z.abs() <= 1.0);
        }
    }

    #[test]
    fn t_split_coplanar() {
        let mut out = Split::default();
        triangle([0.0; 3]).split(&xy_plane(), &mut out);
        let mut flipped = triangle([0.0; 3]);
        flipped.flip();
        flipped.split(&xy_plane(), &mut out);
        assert_eq!(out.coplanar_front.len(), 1);
        assert_eq!(out.coplanar_back.len(), 1);
        assert!(out.front.is_empty() && out.back.is_empty());
    }
}
