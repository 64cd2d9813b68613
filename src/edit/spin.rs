use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::{
    config::FULL_TURN_TOLERANCE,
    element::{FH, VH},
    error::Error,
    mesh::QMesh,
};

/// Parameters of [`QMesh::spin`].
///
/// ```
/// use glam::Vec3;
/// use qmesh::Spin;
///
/// let spin = Spin::new(Vec3::Z, std::f32::consts::PI, 8).with_pivot(Vec3::X);
/// assert_eq!(spin.steps, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spin {
    pub axis: Vec3,
    /// Total angle in radians.
    pub angle: f32,
    pub steps: usize,
    pub pivot: Vec3,
    /// Only matters for a full turn. If set, the selected faces are kept as a
    /// cap at the end of the turn instead of welding the last ring to the
    /// first.
    pub cap: bool,
}

impl Spin {
    pub fn new(axis: Vec3, angle: f32, steps: usize) -> Self {
        Spin {
            axis,
            angle,
            steps,
            pivot: Vec3::ZERO,
            cap: false,
        }
    }

    pub fn with_pivot(mut self, pivot: Vec3) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_cap(mut self, cap: bool) -> Self {
        self.cap = cap;
        self
    }

    fn is_full_turn(&self) -> bool {
        (self.angle.abs() - std::f32::consts::TAU).abs() <= FULL_TURN_TOLERANCE
    }

    fn rotate(&self, p: Vec3, step: usize) -> Vec3 {
        let angle = self.angle * step as f32 / self.steps as f32;
        Quat::from_axis_angle(self.axis, angle) * (p - self.pivot) + self.pivot
    }
}

impl QMesh {
    /// Rotational extrusion of a region of faces.
    ///
    /// The boundary of the region is copied `steps` times, each copy rotated
    /// further around the axis through the pivot, and consecutive rings are
    /// bridged with quads. The selected faces move to the last ring, keeping
    /// their handles. A full turn without a cap welds the last ring to the
    /// first and removes the selected faces instead. Returns the bridging
    /// faces.
    pub fn spin(&mut self, faces: &[FH], spin: Spin) -> Result<Vec<FH>, Error> {
        if spin.steps == 0 {
            return Err(Error::InvalidParameter("spin needs at least one step".into()));
        }
        if !spin.angle.is_finite() || !spin.pivot.is_finite() {
            return Err(Error::InvalidParameter(format!("spin {spin:?}")));
        }
        let axis = spin.axis.normalize_or_zero();
        if axis == Vec3::ZERO || !axis.is_finite() {
            return Err(Error::InvalidParameter("spin axis has no direction".into()));
        }
        let spin = Spin { axis, ..spin };
        let weld = spin.is_full_turn() && !spin.cap;
        let faces = self.selected_faces(faces)?;
        if faces.is_empty() {
            return Ok(Vec::new());
        }
        let region = self.region(faces);
        self.transact(|mesh| {
            // rings[k] maps a boundary vertex to its copy in ring k.
            let mut rings: Vec<HashMap<VH, VH>> = Vec::with_capacity(spin.steps + 1);
            rings.push(region.boundary_verts.iter().map(|v| (*v, *v)).collect());
            for k in 1..=spin.steps {
                let ring = if weld && k == spin.steps {
                    rings[0].clone()
                } else {
                    region
                        .boundary_verts
                        .iter()
                        .map(|v| {
                            let p = spin.rotate(mesh.point(*v), k);
                            (*v, mesh.add_vertex(p))
                        })
                        .collect()
                };
                rings.push(ring);
            }
            let loops: Vec<Vec<VH>> = region
                .faces
                .iter()
                .map(|f| {
                    mesh.face_vertices(*f)
                        .into_iter()
                        .map(|v| rings[spin.steps].get(&v).copied().unwrap_or(v))
                        .collect()
                })
                .collect();
            for f in &region.faces {
                mesh.topol.remove_face(*f)?;
            }
            if weld {
                for v in &region.interior_verts {
                    mesh.topol.remove_vertex(*v)?;
                }
            } else {
                for v in &region.interior_verts {
                    let p = spin.rotate(mesh.point(*v), spin.steps);
                    mesh.topol.set_point(*v, p);
                }
                for (f, verts) in region.faces.iter().zip(loops.iter()) {
                    mesh.topol.add_face_at(Some(*f), verts)?;
                }
            }
            let mut walls = Vec::with_capacity(region.boundary.len() * spin.steps);
            for k in 0..spin.steps {
                let (from, to) = (&rings[k], &rings[k + 1]);
                for &(a, b) in &region.boundary {
                    walls.push(mesh.add_wall((from[&a], from[&b]), (to[&a], to[&b]))?);
                }
            }
            tracing::debug!(
                "Spun {} faces in {} steps{}, added {} faces",
                region.faces.len(),
                spin.steps,
                if weld { " and closed the turn" } else { "" },
                walls.len()
            );
            Ok(walls)
        })
    }
}
