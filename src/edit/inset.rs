use crate::{
    element::{FH, VH},
    error::Error,
    mesh::QMesh,
};

impl QMesh {
    /// Inset each face individually towards its centroid.
    ///
    /// Every vertex of a face is copied and moved towards the face centroid by
    /// the fraction `amount`, clamped to `[0, 1]`: at 0 the copies stay in
    /// place and at 1 they all sit on the centroid. Faces that share a vertex
    /// get separate copies of it. The face keeps its handle and becomes the
    /// inner face; a ring of quads connects it to the original boundary.
    /// Returns the ring faces.
    pub fn inset_faces(&mut self, faces: &[FH], amount: f32) -> Result<Vec<FH>, Error> {
        if amount.is_nan() {
            return Err(Error::InvalidParameter("inset amount is NaN".into()));
        }
        let amount = amount.clamp(0.0, 1.0);
        let faces = self.selected_faces(faces)?;
        self.transact(|mesh| {
            let mut ring = Vec::with_capacity(faces.len() * 4);
            for &f in &faces {
                let verts = mesh.face_vertices(f);
                let center = mesh.face_centroid(f);
                let inner: Vec<VH> = verts
                    .iter()
                    .map(|v| {
                        let p = mesh.point(*v).lerp(center, amount);
                        mesh.add_vertex(p)
                    })
                    .collect();
                mesh.topol.remove_face(f)?;
                mesh.topol.add_face_at(Some(f), &inner)?;
                let n = verts.len();
                for i in 0..n {
                    let j = (i + 1) % n;
                    ring.push(mesh.add_wall((verts[i], verts[j]), (inner[i], inner[j]))?);
                }
            }
            tracing::debug!("Inset {} faces with {} ring faces", faces.len(), ring.len());
            Ok(ring)
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{element::FH, macros::assert_f32_eq, macros::assert_vec_eq, mesh::QMesh};
    use glam::vec3;

    #[test]
    fn t_inset_quad() {
        let mut grid = QMesh::quad_grid(1, 1, 2.0).expect("Cannot create grid");
        let ring = grid
            .inset_faces(&[FH::from(0)], 0.5)
            .expect("Cannot inset");
        assert_eq!(ring.len(), 4);
        assert_eq!(grid.num_faces(), 5);
        assert_eq!(grid.num_vertices(), 8);
        assert_f32_eq!(grid.face_area(0.into()), 1.0, 1e-6);
        assert_f32_eq!(grid.area(), 4.0, 1e-5);
        assert_vec_eq!(grid.face_normal(0.into()), vec3(0.0, 0.0, 1.0));
        for f in ring {
            assert_eq!(grid.face_valence(f), 4);
        }
        grid.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_inset_full_amount_collapses_to_centroid() {
        let mut qbox = QMesh::unit_box().expect("Cannot create box");
        let faces = [FH::from(0), FH::from(5)];
        let centers: Vec<_> = faces.iter().map(|f| qbox.face_centroid(*f)).collect();
        qbox.inset_faces(&faces, 1.0).expect("Cannot inset");
        for (f, c) in faces.iter().zip(centers) {
            for p in qbox.face_points(*f) {
                assert_vec_eq!(p, c, 1e-6);
            }
        }
        qbox.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_inset_adjacent_faces_independently() {
        let mut grid = QMesh::quad_grid(2, 1, 1.0).expect("Cannot create grid");
        let ring = grid
            .inset_faces(&[FH::from(0), FH::from(1)], 2.0)
            .expect("Cannot inset");
        // The amount is clamped to 1, and the shared vertices are copied once
        // per face.
        assert_eq!(ring.len(), 8);
        assert_eq!(grid.num_vertices(), 6 + 8);
        assert_f32_eq!(grid.face_area(0.into()), 0.0, 1e-6);
        grid.check_topology().expect("Topological errors found");
    }
}
