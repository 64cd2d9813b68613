use std::fmt::Display;

use glam::DVec3;

use super::{bsp, polygon::Polygon};
use crate::{error::Error, flat::FlatMesh};

/// The three boolean operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BooleanOp {
    Union,
    /// First operand minus the second.
    Subtract,
    Intersect,
}

impl Display for BooleanOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BooleanOp::Union => "union",
            BooleanOp::Subtract => "minus",
            BooleanOp::Intersect => "intersect",
        })
    }
}

/// Geometry kernel that evaluates a boolean operation on two closed triangle
/// meshes given in the same coordinate system.
///
/// The output may be a triangle soup with repeated or degenerate triangles;
/// the orchestrator welds and cleans it. An empty output means the result has
/// no volume.
pub trait CsgKernel {
    fn evaluate(&self, op: BooleanOp, a: &FlatMesh, b: &FlatMesh) -> Result<FlatMesh, Error>;
}

/// CSG kernel built on binary space partitioning trees, computing in double
/// precision. Works on any closed, consistently oriented input.
#[derive(Debug, Clone, Copy, Default)]
pub struct BspKernel;

fn to_polygons(mesh: &FlatMesh) -> Vec<Polygon> {
    mesh.triangles()
        .filter_map(|tri| Polygon::new(tri.map(|i| mesh.position(i as usize).as_dvec3()).to_vec()))
        .collect()
}

fn to_flat(polygons: &[Polygon]) -> FlatMesh {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for poly in polygons {
        let base = (positions.len() / 3) as u32;
        positions.extend(
            poly.vertices
                .iter()
                .flat_map(|v: &DVec3| v.as_vec3().to_array()),
        );
        // Polygons from the tree are convex.
        for i in 1..poly.vertices.len() as u32 - 1 {
            indices.extend_from_slice(&[base, base + i, base + i + 1]);
        }
    }
    FlatMesh::new(positions, indices)
}

impl CsgKernel for BspKernel {
    fn evaluate(&self, op: BooleanOp, a: &FlatMesh, b: &FlatMesh) -> Result<FlatMesh, Error> {
        let (pa, pb) = (to_polygons(a), to_polygons(b));
        if pa.is_empty() {
            return Err(Error::EmptyMesh("first operand has no valid triangles".into()));
        }
        if pb.is_empty() {
            return Err(Error::EmptyMesh("second operand has no valid triangles".into()));
        }
        let (na, nb) = (pa.len(), pb.len());
        let out = match op {
            BooleanOp::Union => bsp::union(pa, pb),
            BooleanOp::Subtract => bsp::subtract(pa, pb),
            BooleanOp::Intersect => bsp::intersect(pa, pb),
        };
        tracing::debug!("BSP {op} of {na} and {nb} polygons produced {}", out.len());
        Ok(to_flat(&out))
    }
}

#[cfg(test)]
mod test {
    use super::{BooleanOp, BspKernel, CsgKernel};
    use crate::flat::FlatMesh;
    use glam::{Vec3, vec3};

    #[test]
    fn t_op_names() {
        assert_eq!(BooleanOp::Union.to_string(), "union");
        assert_eq!(BooleanOp::Subtract.to_string(), "minus");
        assert_eq!(BooleanOp::Intersect.to_string(), "intersect");
    }

    #[test]
    fn t_kernel_intersect_bounds() {
        let a = FlatMesh::cube(Vec3::splat(0.5), 1.0);
        let b = FlatMesh::cube(Vec3::splat(1.0), 1.0);
        let mut out = BspKernel
            .evaluate(BooleanOp::Intersect, &a, &b)
            .expect("Kernel failed");
        let bounds = out.compute_bounds().expect("Empty result");
        assert!(bounds.min.abs_diff_eq(Vec3::splat(0.5), 1e-5));
        assert!(bounds.max.abs_diff_eq(Vec3::splat(1.0), 1e-5));
    }

    #[test]
    fn t_kernel_subtract_disjoint() {
        let a = FlatMesh::cube(Vec3::ZERO, 1.0);
        let b = FlatMesh::cube(vec3(3.0, 3.0, 3.0), 1.0);
        let out = BspKernel
            .evaluate(BooleanOp::Subtract, &a, &b)
            .expect("Kernel failed");
        assert_eq!(out.num_triangles(), 12);
    }
}
