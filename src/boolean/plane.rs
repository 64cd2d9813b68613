use glam::DVec3;

use crate::config::BSP_EPSILON;

/// Side of a plane a point or polygon lies on. The values combine with `|`
/// into `SPANNING`.
pub(super) const COPLANAR: u8 = 0;
pub(super) const FRONT: u8 = 1;
pub(super) const BACK: u8 = 2;
pub(super) const SPANNING: u8 = 3;

/// Oriented plane `normal . p = w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Plane {
    pub(super) normal: DVec3,
    pub(super) w: f64,
}

impl Plane {
    /// Plane through three points wound counter-clockwise when seen from the
    /// front. `None` if the points are collinear.
    pub(super) fn from_points(a: DVec3, b: DVec3, c: DVec3) -> Option<Self> {
        let normal = (b - a).cross(c - a);
        let len = normal.length();
        if !(len > BSP_EPSILON * BSP_EPSILON) {
            return None;
        }
        let normal = normal / len;
        Some(Plane {
            normal,
            w: normal.dot(a),
        })
    }

    pub(super) fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    pub(super) fn signed_distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p) - self.w
    }

    pub(super) fn side(&self, p: DVec3) -> u8 {
        let d = self.signed_distance(p);
        if d < -BSP_EPSILON {
            BACK
        } else if d > BSP_EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }
}

#[cfg(test)]
mod test {
    use super::{BACK, COPLANAR, FRONT, Plane};
    use glam::DVec3;

    #[test]
    fn t_plane_from_points() {
        let plane = Plane::from_points(DVec3::ZERO, DVec3::X, DVec3::Y).expect("Degenerate plane");
        assert_eq!(plane.normal, DVec3::Z);
        assert_eq!(plane.side(DVec3::new(0.3, 0.3, 1.0)), FRONT);
        assert_eq!(plane.side(DVec3::new(0.3, 0.3, -1.0)), BACK);
        assert_eq!(plane.side(DVec3::new(5.0, -2.0, 1e-7)), COPLANAR);
        assert!(Plane::from_points(DVec3::ZERO, DVec3::X, DVec3::X * 2.0).is_none());
    }

    #[test]
    fn t_flip() {
        let mut plane = Plane::from_points(DVec3::Z, DVec3::Z + DVec3::X, DVec3::Z + DVec3::Y)
            .expect("Degenerate plane");
        assert_eq!(plane.w, 1.0);
        plane.flip();
        assert_eq!(plane.w, -1.0);
        assert_eq!(plane.side(DVec3::ZERO), FRONT);
    }
}
