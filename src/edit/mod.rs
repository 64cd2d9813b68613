//! Topology editing operations.
//!
//! Every operation runs inside a transaction on the mesh. If it fails, the
//! mesh is restored to the state it was in before the call. Batch operations
//! skip bad items with a warning. [`QMesh::dissolve_edges`] runs each item in
//! its own transaction, while [`QMesh::bevel_edges`] checks every edge first
//! and bevels the rest together.

mod bevel;
mod dissolve;
mod extrude;
mod inset;
mod knife;
mod loop_cut;
mod merge;
mod spin;

use std::collections::HashSet;

use glam::Vec3;

use crate::{
    element::{EdgeKey, FH, VH},
    error::Error,
    mesh::QMesh,
};

pub use loop_cut::LoopCut;
pub use spin::Spin;

/// A set of selected faces, split into the parts extrusion needs.
pub(crate) struct Region {
    pub(crate) faces: Vec<FH>,
    /// Directed edges of the region's faces whose opposite side is not in the
    /// region.
    pub(crate) boundary: Vec<(VH, VH)>,
    /// Vertices on the boundary of the region, in order of first use.
    pub(crate) boundary_verts: Vec<VH>,
    /// Vertices used only by faces of the region.
    pub(crate) interior_verts: Vec<VH>,
}

impl QMesh {
    /// Validate a face selection and remove duplicates, keeping the order.
    pub(crate) fn selected_faces(&self, faces: &[FH]) -> Result<Vec<FH>, Error> {
        let mut seen = HashSet::with_capacity(faces.len());
        let mut out = Vec::with_capacity(faces.len());
        for &f in faces {
            if !self.is_valid_face(f) {
                return Err(Error::InvalidFace(f));
            }
            if seen.insert(f) {
                out.push(f);
            }
        }
        Ok(out)
    }

    pub(crate) fn region(&self, faces: Vec<FH>) -> Region {
        let selected: HashSet<FH> = faces.iter().copied().collect();
        let mut boundary = Vec::new();
        let mut boundary_set = HashSet::new();
        let mut boundary_verts = Vec::new();
        for &f in &faces {
            for h in self.face_halfedges(f) {
                let inside = self
                    .twin_halfedge(h)
                    .is_some_and(|t| selected.contains(&self.halfedge_face(t)));
                if inside {
                    continue;
                }
                let (a, b) = (self.from_vertex(h), self.to_vertex(h));
                boundary.push((a, b));
                for v in [a, b] {
                    if boundary_set.insert(v) {
                        boundary_verts.push(v);
                    }
                }
            }
        }
        let mut interior_verts = Vec::new();
        let mut interior_set = HashSet::new();
        for &f in &faces {
            for v in self.face_vertices(f) {
                if !boundary_set.contains(&v) && interior_set.insert(v) {
                    interior_verts.push(v);
                }
            }
        }
        Region {
            faces,
            boundary,
            boundary_verts,
            interior_verts,
        }
    }

    /// Insert `v` into the loop of `f` between the consecutive vertices `a`
    /// and `b`.
    pub(crate) fn insert_between(&mut self, f: FH, a: VH, b: VH, v: VH) -> Result<(), Error> {
        let mut verts = self.face_vertices(f);
        let n = verts.len();
        let i = (0..n)
            .find(|i| verts[*i] == a && verts[(i + 1) % n] == b)
            .ok_or(Error::EdgeNotFound(EdgeKey::new(a, b)))?;
        verts.insert(i + 1, v);
        self.topol.replace_face(f, &verts)
    }

    /// Insert `v` into the edge between `a` and `b`, in the faces on both
    /// sides of it.
    pub(crate) fn insert_in_edge(&mut self, a: VH, b: VH, v: VH) -> Result<(), Error> {
        let mut found = false;
        for (x, y) in [(a, b), (b, a)] {
            if let Some(h) = self.find_halfedge(x, y) {
                let f = self.halfedge_face(h);
                self.insert_between(f, x, y, v)?;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(Error::EdgeNotFound(EdgeKey::new(a, b)))
        }
    }

    /// Split an edge by inserting a new vertex at parameter `t` from its
    /// start (the endpoint with the smaller id) to its end. Both faces
    /// adjacent to the edge gain the new vertex.
    pub fn split_edge(&mut self, key: EdgeKey, t: f32) -> Result<VH, Error> {
        if !t.is_finite() {
            return Err(Error::InvalidParameter(format!("edge parameter {t}")));
        }
        let (a, b) = key.vertices();
        if self.edge_halfedge(key).is_none() {
            return Err(Error::EdgeNotFound(key));
        }
        self.transact(|mesh| {
            let v = mesh.add_vertex(mesh.point(a).lerp(mesh.point(b), t));
            mesh.insert_in_edge(a, b, v)?;
            Ok(v)
        })
    }

    /// Add the quad connecting the directed edge `a -> b` to its copy
    /// `a2 -> b2`.
    pub(crate) fn add_wall(&mut self, (a, b): (VH, VH), (a2, b2): (VH, VH)) -> Result<FH, Error> {
        self.topol.add_face(&[a, b, b2, a2])
    }

    pub(crate) fn duplicate_vertex(&mut self, v: VH, offset: Vec3) -> VH {
        let p = self.point(v) + offset;
        self.add_vertex(p)
    }
}
