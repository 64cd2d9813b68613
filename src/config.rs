//! Numeric tolerances and configuration for the bridge and boolean operations.
//!
//! Tolerances that are internal to an algorithm are plain constants. The two
//! user facing knobs, [`BridgeConfig`] and [`BooleanConfig`], come with presets
//! and `with_*` builders.
//!
//! ```
//! use qmesh::{BooleanConfig, BridgeConfig, Weld};
//!
//! let config = BooleanConfig::precise().with_weld_tolerance(1e-7);
//! let bridge = BridgeConfig::default().with_weld(Weld::Epsilon(1e-4));
//! ```

/// General purpose geometric tolerance.
pub const EPSILON: f32 = 1e-6;

/// Plane thickness used when classifying points against BSP planes.
pub const BSP_EPSILON: f64 = 1e-5;

/// Upper bound on the number of steps taken while walking an edge loop. This
/// only guards against malformed topology.
pub const EDGE_LOOP_LIMIT: usize = 1 << 20;

/// Maximum slide of a bevel, as a fraction of the shortest edge at the beveled
/// vertices.
pub const BEVEL_MAX_SLIDE: f32 = 0.5;

/// Angular tolerance used to detect a full turn in `spin`.
pub const FULL_TURN_TOLERANCE: f32 = 1e-4;

/// Relative tolerance used by the knife to decide whether a point lies on the
/// plane of a face, scaled by the size of the face.
pub const KNIFE_PLANE_TOLERANCE: f32 = 1e-3;

/// How triangle corners are grouped into vertices when decompiling a flat
/// buffer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Weld {
    /// Corners with bit identical positions share a vertex.
    #[default]
    Exact,
    /// Corners share a vertex only if they share a buffer index.
    Index,
    /// Corners whose positions quantize to the same cell of this size share a
    /// vertex.
    Epsilon(f32),
}

/// Configuration of [`crate::decompile_with`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BridgeConfig {
    pub weld: Weld,
}

impl BridgeConfig {
    pub fn with_weld(mut self, weld: Weld) -> Self {
        self.weld = weld;
        self
    }
}

/// Configuration of the boolean orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BooleanConfig {
    /// Vertices of the kernel output closer than this are merged.
    pub weld_tolerance: f64,
    /// Bounding boxes closer than this count as overlapping.
    pub overlap_tolerance: f32,
    /// Triangles with an area below this are dropped from the kernel output.
    pub min_triangle_area: f64,
    /// Neighbouring faces of the result whose normals differ by less than
    /// this angle, in radians, are merged. Zero keeps the triangles.
    pub coplanar_angle: f32,
}

impl Default for BooleanConfig {
    fn default() -> Self {
        BooleanConfig {
            weld_tolerance: 1e-5,
            overlap_tolerance: 1e-6,
            min_triangle_area: 1e-12,
            coplanar_angle: 1e-3,
        }
    }
}

impl BooleanConfig {
    /// Tight tolerances for exact, modelled geometry.
    pub fn precise() -> Self {
        BooleanConfig {
            weld_tolerance: 1e-8,
            overlap_tolerance: 0.0,
            min_triangle_area: 1e-16,
            coplanar_angle: 5e-4,
        }
    }

    /// Loose tolerances for noisy or imported geometry.
    pub fn loose() -> Self {
        BooleanConfig {
            weld_tolerance: 1e-3,
            overlap_tolerance: 1e-4,
            min_triangle_area: 1e-9,
            coplanar_angle: 1e-2,
        }
    }

    pub fn with_weld_tolerance(mut self, tol: f64) -> Self {
        self.weld_tolerance = tol;
        self
    }

    pub fn with_overlap_tolerance(mut self, tol: f32) -> Self {
        self.overlap_tolerance = tol;
        self
    }

    pub fn with_min_triangle_area(mut self, area: f64) -> Self {
        self.min_triangle_area = area;
        self
    }

    pub fn with_coplanar_angle(mut self, angle: f32) -> Self {
        self.coplanar_angle = angle;
        self
    }
}

#[cfg(test)]
mod test {
    use super::{BooleanConfig, BridgeConfig, Weld};

    #[test]
    fn t_presets_are_ordered() {
        let precise = BooleanConfig::precise();
        let default = BooleanConfig::default();
        let loose = BooleanConfig::loose();
        assert!(precise.weld_tolerance < default.weld_tolerance);
        assert!(default.weld_tolerance < loose.weld_tolerance);
        assert!(precise.coplanar_angle < default.coplanar_angle);
        assert!(default.coplanar_angle < loose.coplanar_angle);
    }

    #[test]
    fn t_builders() {
        let config = BooleanConfig::default().with_weld_tolerance(0.5);
        assert_eq!(config.weld_tolerance, 0.5);
        let bridge = BridgeConfig::default().with_weld(Weld::Index);
        assert_eq!(bridge.weld, Weld::Index);
        assert_eq!(BridgeConfig::default().weld, Weld::Exact);
    }
}
