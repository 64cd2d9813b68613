use std::collections::HashMap;

use glam::Vec3;

use crate::{
    element::{FH, VH},
    error::Error,
    mesh::QMesh,
};

impl QMesh {
    /// Extrude a region of faces along its average normal.
    ///
    /// The vertices on the boundary of the region are duplicated and the
    /// selected faces move with the copies, keeping their handles. Vertices
    /// inside the region move in place. Side walls are only created along the
    /// boundary of the region, so edges shared by two selected faces get no
    /// wall. Returns the side wall faces.
    pub fn extrude_faces(&mut self, faces: &[FH], distance: f32) -> Result<Vec<FH>, Error> {
        if !distance.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "extrusion distance {distance}"
            )));
        }
        let faces = self.selected_faces(faces)?;
        if faces.is_empty() {
            return Ok(Vec::new());
        }
        let normal = faces
            .iter()
            .map(|f| self.face_area_normal(*f))
            .sum::<Vec3>()
            .normalize_or_zero();
        if normal == Vec3::ZERO {
            return Err(Error::DegenerateFace(
                "extruded region has no area".into(),
            ));
        }
        let offset = normal * distance;
        let region = self.region(faces);
        self.transact(|mesh| {
            let copies: HashMap<VH, VH> = region
                .boundary_verts
                .iter()
                .map(|v| (*v, mesh.duplicate_vertex(*v, offset)))
                .collect();
            for v in &region.interior_verts {
                let p = mesh.point(*v) + offset;
                mesh.topol.set_point(*v, p);
            }
            let loops: Vec<Vec<VH>> = region
                .faces
                .iter()
                .map(|f| {
                    mesh.face_vertices(*f)
                        .into_iter()
                        .map(|v| copies.get(&v).copied().unwrap_or(v))
                        .collect()
                })
                .collect();
            for f in &region.faces {
                mesh.topol.remove_face(*f)?;
            }
            for (f, verts) in region.faces.iter().zip(loops.iter()) {
                mesh.topol.add_face_at(Some(*f), verts)?;
            }
            let walls = region
                .boundary
                .iter()
                .map(|&(a, b)| mesh.add_wall((a, b), (copies[&a], copies[&b])))
                .collect::<Result<Vec<_>, Error>>()?;
            tracing::debug!(
                "Extruded {} faces, added {} vertices and {} side faces",
                region.faces.len(),
                copies.len(),
                walls.len()
            );
            Ok(walls)
        })
    }
}
