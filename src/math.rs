use glam::Vec3;

use crate::{element::FH, element::VH, iterator, mesh::QMesh};

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    /// Box enclosing all the points, or `None` if there are no points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Aabb::new(first, first), |b, p| b.including(p)))
    }

    pub fn including(self, p: Vec3) -> Self {
        Aabb {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Whether the boxes overlap with a volume, after growing both by `tol`.
    /// Boxes that only touch along a face do not overlap unless `tol` is
    /// positive.
    pub fn overlaps(&self, other: &Aabb, tol: f32) -> bool {
        (self.min - tol).cmplt(other.max + tol).all() && (other.min - tol).cmplt(self.max + tol).all()
    }
}

/// Normal of a polygon by Newell's method, not normalized. The length is twice
/// the area of the polygon, so summing these gives area weighted averages.
pub fn newell_normal(points: &[Vec3]) -> Vec3 {
    let n = points.len();
    if n < 3 {
        return Vec3::ZERO;
    }
    (0..n).fold(Vec3::ZERO, |total, i| {
        let pc = points[i];
        let pn = points[(i + 1) % n];
        let (a, b) = (pc - pn, pc + pn);
        total + Vec3::new(a.y * b.z, a.z * b.x, a.x * b.y)
    })
}

pub fn polygon_area(points: &[Vec3]) -> f32 {
    newell_normal(points).length() * 0.5
}

pub fn centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    points.iter().copied().sum::<Vec3>() / points.len() as f32
}

/// Index of the axis along which `n` is largest. Projecting a polygon along
/// this axis loses the least precision.
pub(crate) fn dominant_axis(n: Vec3) -> usize {
    let a = n.abs();
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

/// Project onto the plane orthogonal to `axis`, keeping the winding seen from
/// the positive side of the axis.
pub(crate) fn project(p: Vec3, axis: usize, flip: bool) -> glam::Vec2 {
    let v = match axis {
        0 => glam::Vec2::new(p.y, p.z),
        1 => glam::Vec2::new(p.z, p.x),
        _ => glam::Vec2::new(p.x, p.y),
    };
    if flip { glam::Vec2::new(v.x, -v.y) } else { v }
}

impl QMesh {
    /// Face normal by Newell's method. Degenerate faces have a zero normal.
    pub fn face_normal(&self, f: FH) -> Vec3 {
        self.face_area_normal(f).normalize_or_zero()
    }

    /// Unnormalized face normal whose length is twice the area.
    pub fn face_area_normal(&self, f: FH) -> Vec3 {
        newell_normal(&self.face_points(f))
    }

    pub fn face_area(&self, f: FH) -> f32 {
        self.face_area_normal(f).length() * 0.5
    }

    pub fn face_centroid(&self, f: FH) -> Vec3 {
        let (total, count) = iterator::fv_ccw_iter(&self.topol, f)
            .fold((Vec3::ZERO, 0usize), |(total, count), v| {
                (total + self.topol.point(v), count + 1)
            });
        if count == 0 {
            Vec3::ZERO
        } else {
            total / count as f32
        }
    }

    /// Area weighted average of the normals of the faces around the vertex.
    pub fn vertex_normal(&self, v: VH) -> Vec3 {
        self.topol
            .faces_using_vertex(v)
            .into_iter()
            .map(|f| self.face_area_normal(f))
            .sum::<Vec3>()
            .normalize_or_zero()
    }

    pub fn edge_length(&self, a: VH, b: VH) -> f32 {
        (self.point(a) - self.point(b)).length()
    }

    pub fn area(&self) -> f32 {
        self.faces().map(|f| self.face_area(f)).sum()
    }

    /// Signed volume enclosed by the faces. Only meaningful for closed meshes.
    pub fn volume(&self) -> f32 {
        self.faces()
            .map(|f| {
                let pts = self.face_points(f);
                (1..pts.len() - 1)
                    .map(|i| pts[0].dot(pts[i].cross(pts[i + 1])))
                    .sum::<f32>()
            })
            .sum::<f32>()
            / 6.0
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices().map(|v| self.point(v)))
    }
}

#[cfg(test)]
mod test {
    use super::{Aabb, centroid, newell_normal, polygon_area};
    use crate::{macros::assert_f32_eq, mesh::QMesh};
    use glam::{Vec3, vec3};

    #[test]
    fn t_newell_normal_of_square() {
        let pts = [
            vec3(0.0, 0.0, 0.0),
            vec3(2.0, 0.0, 0.0),
            vec3(2.0, 2.0, 0.0),
            vec3(0.0, 2.0, 0.0),
        ];
        assert_eq!(newell_normal(&pts), vec3(0.0, 0.0, 8.0));
        assert_f32_eq!(polygon_area(&pts), 4.0);
        assert_eq!(centroid(&pts), vec3(1.0, 1.0, 0.0));
    }

    #[test]
    fn t_box_area_volume() {
        let qbox = QMesh::quad_box(Vec3::ZERO, vec3(1.0, 2.0, 3.0)).expect("Cannot create box");
        assert_f32_eq!(qbox.area(), 22.0, 1e-5);
        assert_f32_eq!(qbox.volume(), 6.0, 1e-5);
        for f in qbox.faces() {
            assert_f32_eq!(qbox.face_normal(f).length(), 1.0, 1e-6);
        }
        let bounds = qbox.bounds().expect("Empty mesh");
        assert_eq!(bounds.max, vec3(1.0, 2.0, 3.0));
    }

    #[test]
    fn t_aabb_overlap() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(vec3(0.5, 0.5, 0.5), vec3(2.0, 2.0, 2.0));
        let c = Aabb::new(vec3(5.0, 0.0, 0.0), vec3(6.0, 1.0, 1.0));
        let d = Aabb::new(vec3(1.0, 0.0, 0.0), vec3(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b, 0.0));
        assert!(!a.overlaps(&c, 0.0));
        assert!(!a.overlaps(&d, 0.0));
        assert!(a.overlaps(&d, 1e-6));
        assert_eq!(a.union(&c).max, vec3(6.0, 1.0, 1.0));
    }
}
