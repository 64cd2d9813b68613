//! Boolean operations on flat triangle meshes.
//!
//! The orchestrator validates the operands, applies their world transforms,
//! takes shortcuts for operands whose bounds do not overlap, hands the rest to
//! a [`CsgKernel`], and turns the kernel output back into a clean, editable
//! [`QMesh`]. The cleanup welds the kernel output and splits edges at
//! T-junctions so the result is closed wherever the operands were. Coplanar
//! triangles are then merged back into polygons.
//!
//! ```
//! use glam::{Mat4, Vec3};
//! use qmesh::{BooleanOperand, FlatMesh, perform_union};
//!
//! let a = FlatMesh::cube(Vec3::ZERO, 1.0);
//! let b = FlatMesh::cube(Vec3::splat(0.5), 1.0);
//! let result = perform_union(
//!     &BooleanOperand::new("a", &a),
//!     &BooleanOperand::new("b", &b).with_transform(Mat4::IDENTITY),
//! )
//! .unwrap();
//! assert_eq!(result.name, "a_union_b");
//! ```

mod bsp;
mod kernel;
mod plane;
mod polygon;
mod weld;

use glam::Mat4;

use crate::{bridge, config::BooleanConfig, error::Error, flat::FlatMesh, mesh::QMesh};

pub use kernel::{BooleanOp, BspKernel, CsgKernel};

/// One side of a boolean operation: a named mesh and its world transform.
#[derive(Debug, Clone, Copy)]
pub struct BooleanOperand<'a> {
    pub name: &'a str,
    pub mesh: Option<&'a FlatMesh>,
    pub transform: Mat4,
}

impl<'a> BooleanOperand<'a> {
    pub fn new(name: &'a str, mesh: &'a FlatMesh) -> Self {
        BooleanOperand {
            name,
            mesh: Some(mesh),
            transform: Mat4::IDENTITY,
        }
    }

    /// An operand whose geometry is missing.
    pub fn missing(name: &'a str) -> Self {
        BooleanOperand {
            name,
            mesh: None,
            transform: Mat4::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }
}

/// Outcome of [`validate_mesh_for_boolean`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Result of a boolean operation: the cleaned flat buffer and the equivalent
/// halfedge mesh.
#[derive(Debug, Clone)]
pub struct BooleanResult {
    pub name: String,
    pub mesh: FlatMesh,
    pub qmesh: QMesh,
}

fn check_operand(mesh: Option<&FlatMesh>) -> Result<&FlatMesh, Error> {
    let mesh = mesh.ok_or(Error::MissingGeometry)?;
    if mesh.num_vertices() == 0 {
        return Err(Error::EmptyMesh("mesh has no vertices".into()));
    }
    if mesh.num_triangles() == 0 {
        return Err(Error::EmptyMesh("mesh has no triangles".into()));
    }
    mesh.validate()?;
    Ok(mesh)
}

/// Check whether a mesh can take part in a boolean operation.
pub fn validate_mesh_for_boolean(mesh: Option<&FlatMesh>) -> Validation {
    match check_operand(mesh) {
        Ok(_) => Validation {
            valid: true,
            reason: None,
        },
        Err(e) => Validation {
            valid: false,
            reason: Some(e.to_string()),
        },
    }
}

/// Runs boolean operations with a kernel and a configuration.
#[derive(Debug, Clone, Default)]
pub struct BooleanEngine<K: CsgKernel = BspKernel> {
    kernel: K,
    config: BooleanConfig,
}

impl BooleanEngine<BspKernel> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: CsgKernel> BooleanEngine<K> {
    pub fn with_kernel(kernel: K, config: BooleanConfig) -> Self {
        BooleanEngine { kernel, config }
    }

    pub fn with_config(mut self, config: BooleanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BooleanConfig {
        &self.config
    }

    pub fn union(&self, a: &BooleanOperand, b: &BooleanOperand) -> Result<BooleanResult, Error> {
        self.evaluate(BooleanOp::Union, a, b)
    }

    pub fn subtract(&self, a: &BooleanOperand, b: &BooleanOperand) -> Result<BooleanResult, Error> {
        self.evaluate(BooleanOp::Subtract, a, b)
    }

    pub fn intersect(
        &self,
        a: &BooleanOperand,
        b: &BooleanOperand,
    ) -> Result<BooleanResult, Error> {
        self.evaluate(BooleanOp::Intersect, a, b)
    }

    pub fn evaluate(
        &self,
        op: BooleanOp,
        a: &BooleanOperand,
        b: &BooleanOperand,
    ) -> Result<BooleanResult, Error> {
        let name = format!("{}_{op}_{}", a.name, b.name);
        let ta = check_operand(a.mesh)?.transformed(&a.transform);
        let tb = check_operand(b.mesh)?.transformed(&b.transform);
        let overlap = match (ta.bounds, tb.bounds) {
            (Some(ba), Some(bb)) => ba.overlaps(&bb, self.config.overlap_tolerance),
            _ => false,
        };
        let raw = if overlap {
            let raw = self.kernel.evaluate(op, &ta, &tb)?;
            if raw.num_triangles() == 0 {
                return Err(match op {
                    BooleanOp::Intersect => Error::NoIntersection,
                    _ => Error::EmptyMesh(format!("{name} has no volume")),
                });
            }
            raw
        } else {
            match op {
                BooleanOp::Union => {
                    tracing::info!("{name}: bounds do not overlap, combining the operands");
                    let mut combined = ta;
                    combined.append(&tb);
                    combined
                }
                BooleanOp::Subtract => {
                    tracing::info!("{name}: bounds do not overlap, keeping the first operand");
                    ta
                }
                BooleanOp::Intersect => {
                    tracing::info!("{name}: bounds do not overlap");
                    return Err(Error::NoIntersection);
                }
            }
        };
        let mut mesh = weld::clean(
            &raw,
            self.config.weld_tolerance,
            self.config.min_triangle_area,
        );
        if mesh.num_triangles() == 0 {
            return Err(match op {
                BooleanOp::Intersect => Error::NoIntersection,
                _ => Error::EmptyMesh(format!("{name} has no volume")),
            });
        }
        mesh.compute_normals();
        mesh.compute_bounds();
        let mut qmesh = bridge::decompile(&mesh)?;
        if self.config.coplanar_angle > 0.0 {
            qmesh.dissolve_coplanar(self.config.coplanar_angle);
            mesh = bridge::compile(&qmesh);
        }
        tracing::debug!(
            "{name}: {} vertices and {} triangles",
            mesh.num_vertices(),
            mesh.num_triangles()
        );
        Ok(BooleanResult { name, mesh, qmesh })
    }
}

/// Union of the operands with the default engine.
pub fn perform_union(a: &BooleanOperand, b: &BooleanOperand) -> Result<BooleanResult, Error> {
    BooleanEngine::new().union(a, b)
}

/// The first operand minus the second, with the default engine.
pub fn perform_subtract(a: &BooleanOperand, b: &BooleanOperand) -> Result<BooleanResult, Error> {
    BooleanEngine::new().subtract(a, b)
}

/// Intersection of the operands with the default engine. Fails with
/// [`Error::NoIntersection`] if the result is empty.
pub fn perform_intersect(a: &BooleanOperand, b: &BooleanOperand) -> Result<BooleanResult, Error> {
    BooleanEngine::new().intersect(a, b)
}
