use crate::{
    element::{EdgeKey, FH, VH},
    error::Error,
    iterator,
    mesh::QMesh,
};

impl QMesh {
    fn dissolve_edge(&mut self, key: EdgeKey) -> Result<FH, Error> {
        let h = self.edge_halfedge(key).ok_or(Error::EdgeNotFound(key))?;
        let t = self
            .twin_halfedge(h)
            .ok_or(Error::BoundaryEdgeNotDissolvable(key))?;
        let (f1, f2) = (self.halfedge_face(h), self.halfedge_face(t));
        if f1 == f2 {
            return Err(Error::DegenerateFace(format!(
                "{f1} lies on both sides of {key}"
            )));
        }
        // Walk f1 from the end of h back to its start, then f2 from the start
        // of h back to its end, skipping the shared endpoints the second time.
        let mut verts: Vec<VH> = iterator::loop_ccw_iter(&self.topol, h)
            .map(|x| self.to_vertex(x))
            .collect();
        verts.extend(
            iterator::loop_ccw_iter(&self.topol, t)
                .skip(1)
                .map(|x| self.to_vertex(x))
                .filter(|v| !key.contains(*v)),
        );
        self.transact(|mesh| {
            mesh.topol.remove_face(f1)?;
            mesh.topol.remove_face(f2)?;
            mesh.topol.add_face_at(Some(f1), &verts)?;
            Ok(f1)
        })
    }

    /// Remove each edge and merge the two faces on either side of it into one
    /// face, which keeps the handle of the face of the edge's first halfedge.
    ///
    /// Edges that cannot be dissolved, such as edges on the boundary or edges
    /// that no longer exist, are skipped with a warning and the rest of the
    /// batch carries on. Returns the merged faces that still exist at the
    /// end.
    pub fn dissolve_edges(&mut self, keys: &[EdgeKey]) -> Vec<FH> {
        let mut merged = Vec::with_capacity(keys.len());
        for &key in keys {
            match self.dissolve_edge(key) {
                Ok(f) => merged.push(f),
                Err(e) => tracing::warn!("Skipping edge {key}: {e}"),
            }
        }
        let done = merged.len();
        let mut seen = std::collections::HashSet::with_capacity(merged.len());
        merged.retain(|f| self.is_valid_face(*f) && seen.insert(*f));
        tracing::debug!(
            "Dissolved {done} of {} edges into {} faces",
            keys.len(),
            merged.len()
        );
        merged
    }

    /// Remove an interior vertex with two edges. If the edges continue each
    /// other in a straight line they are joined into one edge. Otherwise the
    /// two faces around the vertex are merged, provided they are coplanar.
    fn dissolve_two_edge_vertex(&mut self, v: VH, cos: f32) -> Result<(), Error> {
        let hs = self.outgoing_halfedges(v);
        let [h0, h1] = hs[..] else {
            return Err(Error::InvalidParameter(format!("{v} does not have two edges")));
        };
        if self.twin_halfedge(h0).is_none() || self.twin_halfedge(h1).is_none() {
            return Err(Error::InvalidParameter(format!("{v} lies on the boundary")));
        }
        let (n0, n1) = (self.to_vertex(h0), self.to_vertex(h1));
        let p = self.point(v);
        let (d0, d1) = (
            (self.point(n0) - p).normalize_or_zero(),
            (self.point(n1) - p).normalize_or_zero(),
        );
        let faces = [self.halfedge_face(h0), self.halfedge_face(h1)];
        if -d0.dot(d1) >= cos {
            let loops: Vec<Vec<VH>> = faces
                .iter()
                .map(|f| {
                    let mut verts = self.face_vertices(*f);
                    verts.retain(|x| *x != v);
                    verts
                })
                .collect();
            return self.transact(|mesh| {
                for f in faces {
                    mesh.topol.remove_face(f)?;
                }
                for (f, verts) in faces.iter().zip(loops.iter()) {
                    mesh.topol.add_face_at(Some(*f), verts)?;
                }
                mesh.topol.remove_vertex(v)
            });
        }
        let [fa, fb] = faces;
        if fa == fb || self.face_normal(fa).dot(self.face_normal(fb)) < cos {
            return Err(Error::InvalidParameter(format!("{v} is a corner")));
        }
        // The first face runs n1, v, n0 and the second n0, v, n1.
        let mut verts: Vec<VH> = iterator::loop_ccw_iter(&self.topol, h0)
            .map(|x| self.to_vertex(x))
            .filter(|x| *x != v)
            .collect();
        verts.extend(
            iterator::loop_ccw_iter(&self.topol, h1)
                .map(|x| self.to_vertex(x))
                .filter(|x| *x != v && *x != n0 && *x != n1),
        );
        self.transact(|mesh| {
            mesh.topol.remove_face(fa)?;
            mesh.topol.remove_face(fb)?;
            mesh.topol.add_face_at(Some(fa), &verts)?;
            mesh.topol.remove_vertex(v)
        })
    }

    /// Merge neighbouring faces that lie in one plane, then remove the
    /// vertices left in the middle of straight edges or between two of the
    /// merged faces. Two faces count as
    /// coplanar if the angle between their normals, in radians, is below
    /// `angle`.
    ///
    /// Faces are only merged when the result is a simple loop, so a face
    /// never wraps around another. Returns the number of faces and vertices
    /// removed.
    pub fn dissolve_coplanar(&mut self, angle: f32) -> (usize, usize) {
        let cos = angle.cos();
        let (nfaces, nverts) = (self.num_faces(), self.num_vertices());
        loop {
            let mut changed = false;
            for info in self.edges() {
                let Some(h) = self.edge_halfedge(info.key) else {
                    continue;
                };
                let Some(t) = self.twin_halfedge(h) else {
                    continue;
                };
                let (f1, f2) = (self.halfedge_face(h), self.halfedge_face(t));
                if f1 == f2 || self.face_normal(f1).dot(self.face_normal(f2)) < cos {
                    continue;
                }
                match self.dissolve_edge(info.key) {
                    Ok(_) => changed = true,
                    Err(e) => tracing::trace!("Keeping edge {}: {e}", info.key),
                }
            }
            let verts: Vec<VH> = self.vertices().collect();
            for v in verts {
                if self.vertex_valence(v) == 2 && self.dissolve_two_edge_vertex(v, cos).is_ok() {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        let removed = (nfaces - self.num_faces(), nverts - self.num_vertices());
        tracing::debug!(
            "Dissolved {} coplanar faces and {} straight vertices",
            removed.0,
            removed.1
        );
        removed
    }
}
