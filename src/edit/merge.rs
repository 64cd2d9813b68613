use std::collections::HashSet;

use glam::Vec3;

use crate::{element::VH, error::Error, mesh::QMesh};

/// Split a closed vertex loop that may visit the same vertex more than once
/// into simple loops. Loops with fewer than three vertices are dropped.
fn simple_cycles(verts: &[VH]) -> Vec<Vec<VH>> {
    let mut out = Vec::new();
    let mut path: Vec<VH> = Vec::with_capacity(verts.len());
    for &v in verts {
        match path.iter().position(|x| *x == v) {
            Some(j) => {
                let cycle: Vec<VH> = path.drain(j..).collect();
                path.push(v);
                if cycle.len() >= 3 {
                    out.push(cycle);
                }
            }
            None => path.push(v),
        }
    }
    if path.len() >= 3 {
        out.push(path);
    }
    out
}

impl QMesh {
    /// Merge the given vertices into one, placed at their average position.
    ///
    /// The first vertex survives and the others are removed, so the vertex
    /// count drops by one less than the number of distinct vertices. Faces
    /// that collapse to fewer than three vertices are removed, and faces that
    /// pinch at the merged vertex are split into simple faces.
    pub fn merge_vertices(&mut self, verts: &[VH]) -> Result<VH, Error> {
        let mut unique = Vec::with_capacity(verts.len());
        let mut seen = HashSet::with_capacity(verts.len());
        for &v in verts {
            if !self.is_valid_vertex(v) {
                return Err(Error::InvalidVertex(v));
            }
            if seen.insert(v) {
                unique.push(v);
            }
        }
        if unique.len() < 2 {
            return Err(Error::InsufficientVertices(unique.len()));
        }
        let survivor = unique[0];
        let center = unique.iter().map(|v| self.point(*v)).sum::<Vec3>() / unique.len() as f32;
        self.transact(|mesh| {
            let mut faces: Vec<_> = unique
                .iter()
                .flat_map(|v| mesh.topol.faces_using_vertex(*v))
                .collect();
            faces.sort();
            faces.dedup();
            let loops: Vec<_> = faces
                .iter()
                .map(|f| {
                    let remapped: Vec<VH> = mesh
                        .face_vertices(*f)
                        .into_iter()
                        .map(|v| if seen.contains(&v) { survivor } else { v })
                        .collect();
                    (*f, remapped)
                })
                .collect();
            for f in &faces {
                mesh.topol.remove_face(*f)?;
            }
            let mut removed = 0usize;
            let mut split = 0usize;
            for (f, verts) in loops {
                let cycles = simple_cycles(&verts);
                if cycles.is_empty() {
                    removed += 1;
                }
                split += cycles.len().saturating_sub(1);
                let mut slot = Some(f);
                for cycle in cycles {
                    mesh.topol.add_face_at(slot.take(), &cycle)?;
                }
            }
            for v in &unique[1..] {
                mesh.topol.remove_vertex(*v)?;
            }
            mesh.topol.set_point(survivor, center);
            tracing::debug!(
                "Merged {} vertices into {survivor}, removed {removed} and split {split} faces",
                unique.len()
            );
            Ok(survivor)
        })
    }
}
