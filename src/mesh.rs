use std::fmt::Debug;

use glam::Vec3;

use crate::{
    check,
    element::{EdgeInfo, EdgeKey, FH, HH, VH},
    error::Error,
    iterator,
    topol::Topology,
};

/// Halfedge polygon mesh.
///
/// Vertices, halfedges and faces are stored in arenas and referred to by the
/// handles [`VH`], [`HH`] and [`FH`]. Handles stay valid until the element is
/// removed and are never reused. Every halfedge belongs to a face; an edge on
/// the boundary of the mesh is a halfedge without a twin.
///
/// Every editing operation is atomic: if it returns an error, the mesh is left
/// exactly as it was before the call.
///
/// Accessors that take a handle panic if the element does not exist. The
/// editing operations validate their inputs and return errors instead.
#[derive(Clone, Default)]
pub struct QMesh {
    pub(crate) topol: Topology,
}

impl Debug for QMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QMesh")
            .field("vertices", &self.num_vertices())
            .field("faces", &self.num_faces())
            .field("edges", &self.num_edges())
            .finish()
    }
}

impl QMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nverts: usize, nfaces: usize) -> Self {
        QMesh {
            topol: Topology::with_capacity(nverts, nfaces),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.topol.num_vertices()
    }

    pub fn num_halfedges(&self) -> usize {
        self.topol.num_halfedges()
    }

    pub fn num_edges(&self) -> usize {
        self.topol.num_edges()
    }

    pub fn num_faces(&self) -> usize {
        self.topol.num_faces()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        self.topol.vertices()
    }

    pub fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        self.topol.halfedges()
    }

    pub fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        self.topol.faces()
    }

    pub fn is_valid_vertex(&self, v: VH) -> bool {
        self.topol.is_valid_vertex(v)
    }

    pub fn is_valid_face(&self, f: FH) -> bool {
        self.topol.is_valid_face(f)
    }

    pub fn point(&self, v: VH) -> Vec3 {
        self.topol.point(v)
    }

    pub fn set_point(&mut self, v: VH, pos: Vec3) -> Result<(), Error> {
        if !self.topol.is_valid_vertex(v) {
            return Err(Error::InvalidVertex(v));
        }
        self.topol.set_point(v, pos);
        Ok(())
    }

    pub fn to_vertex(&self, h: HH) -> VH {
        self.topol.to_vertex(h)
    }

    pub fn from_vertex(&self, h: HH) -> VH {
        self.topol.from_vertex(h)
    }

    pub fn next_halfedge(&self, h: HH) -> HH {
        self.topol.next_halfedge(h)
    }

    pub fn prev_halfedge(&self, h: HH) -> HH {
        self.topol.prev_halfedge(h)
    }

    pub fn twin_halfedge(&self, h: HH) -> Option<HH> {
        self.topol.twin_halfedge(h)
    }

    pub fn halfedge_face(&self, h: HH) -> FH {
        self.topol.halfedge_face(h)
    }

    pub fn halfedge_key(&self, h: HH) -> EdgeKey {
        self.topol.halfedge_key(h)
    }

    pub fn face_halfedge(&self, f: FH) -> HH {
        self.topol.face_halfedge(f)
    }

    pub fn face_valence(&self, f: FH) -> usize {
        self.topol.face_valence(f)
    }

    /// Vertices of the face in winding order.
    pub fn face_vertices(&self, f: FH) -> Vec<VH> {
        iterator::fv_ccw_iter(&self.topol, f).collect()
    }

    /// Halfedges of the face in winding order.
    pub fn face_halfedges(&self, f: FH) -> Vec<HH> {
        iterator::fh_ccw_iter(&self.topol, f).collect()
    }

    /// Halfedges of the face against the winding order.
    pub fn face_halfedges_cw(&self, f: FH) -> Vec<HH> {
        iterator::fh_cw_iter(&self.topol, f).collect()
    }

    pub fn face_points(&self, f: FH) -> Vec<Vec3> {
        iterator::fv_ccw_iter(&self.topol, f)
            .map(|v| self.topol.point(v))
            .collect()
    }

    pub fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        self.topol.find_halfedge(from, to)
    }

    /// Any halfedge of the edge, if the edge exists.
    pub fn edge_halfedge(&self, key: EdgeKey) -> Option<HH> {
        self.topol.edge_halfedge(key)
    }

    pub fn is_boundary_edge(&self, key: EdgeKey) -> Result<bool, Error> {
        match self.topol.edge_halfedge(key) {
            Some(h) => Ok(self.topol.twin_halfedge(h).is_none()),
            None => Err(Error::EdgeNotFound(key)),
        }
    }

    /// The faces on either side of the edge. The second face is `None` on the
    /// boundary.
    pub fn edge_faces(&self, key: EdgeKey) -> Result<(FH, Option<FH>), Error> {
        let h = self
            .topol
            .edge_halfedge(key)
            .ok_or(Error::EdgeNotFound(key))?;
        Ok((
            self.topol.halfedge_face(h),
            self.topol
                .twin_halfedge(h)
                .map(|t| self.topol.halfedge_face(t)),
        ))
    }

    /// Outgoing halfedges of the vertex, rotating around it. On a boundary
    /// vertex the rotation starts at the boundary. A pinched vertex yields
    /// each of its fans in turn.
    pub fn outgoing_halfedges(&self, v: VH) -> Vec<HH> {
        iterator::voh_iter(&self.topol, v)
    }

    pub fn vertex_faces(&self, v: VH) -> Vec<FH> {
        iterator::vf_iter(&self.topol, v)
    }

    pub fn vertex_neighbors(&self, v: VH) -> Vec<VH> {
        iterator::vv_iter(&self.topol, v)
    }

    pub fn vertex_valence(&self, v: VH) -> usize {
        self.topol.vertex_valence(v)
    }

    /// Whether the faces around the vertex form a single fan.
    pub fn is_manifold_vertex(&self, v: VH) -> bool {
        iterator::vertex_fan(&self.topol, v).len() == self.topol.vertex_valence(v)
    }

    pub fn is_isolated_vertex(&self, v: VH) -> bool {
        self.topol.vertex_halfedge(v).is_none()
    }

    /// One entry per undirected edge, sorted by edge key.
    pub fn edges(&self) -> Vec<EdgeInfo> {
        let mut out: Vec<EdgeInfo> = self
            .topol
            .directed_edges()
            .filter(|((a, b), _)| a < b || self.topol.find_halfedge(*b, *a).is_none())
            .map(|((a, b), _)| EdgeInfo {
                v1: a,
                v2: b,
                key: EdgeKey::new(a, b),
            })
            .collect();
        out.sort_by_key(|e| e.key);
        out
    }

    pub fn add_vertex(&mut self, pos: Vec3) -> VH {
        self.topol.add_vertex(pos)
    }

    pub fn add_vertices(&mut self, pos: &[Vec3]) -> Vec<VH> {
        pos.iter().map(|p| self.topol.add_vertex(*p)).collect()
    }

    /// Add a face with the given vertex loop. Twins are linked against the
    /// existing faces. Fails with [`Error::NonManifoldEdge`] if a directed edge
    /// of the loop is already used by another face.
    pub fn add_face(&mut self, verts: &[VH]) -> Result<FH, Error> {
        self.topol.add_face(verts)
    }

    pub fn add_tri_face(&mut self, v0: VH, v1: VH, v2: VH) -> Result<FH, Error> {
        self.add_face(&[v0, v1, v2])
    }

    pub fn add_quad_face(&mut self, v0: VH, v1: VH, v2: VH, v3: VH) -> Result<FH, Error> {
        self.add_face(&[v0, v1, v2, v3])
    }

    /// Remove a face. If `delete_isolated_vertices` is true, vertices that are
    /// no longer used by any face are removed too.
    pub fn remove_face(&mut self, f: FH, delete_isolated_vertices: bool) -> Result<(), Error> {
        self.transact(|mesh| {
            let verts = mesh.topol.remove_face(f)?;
            if delete_isolated_vertices {
                for v in verts {
                    if mesh.topol.vertex_halfedge(v).is_none() {
                        mesh.topol.remove_vertex(v)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Remove every vertex not used by a face. Returns the number removed.
    pub fn remove_isolated_vertices(&mut self) -> usize {
        let isolated: Vec<VH> = self
            .topol
            .vertices()
            .filter(|v| self.topol.vertex_halfedge(*v).is_none())
            .collect();
        isolated
            .iter()
            .filter(|v| self.topol.remove_vertex(**v).is_ok())
            .count()
    }

    /// Verify all connectivity invariants.
    pub fn check_topology(&self) -> Result<(), Error> {
        check::check_topology(&self.topol)
    }

    /// Run `op` atomically. If it fails, every change made to the mesh is
    /// rolled back before the error is returned.
    pub(crate) fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let save = self.topol.begin();
        match op(self) {
            Ok(val) => {
                self.topol.commit();
                Ok(val)
            }
            Err(e) => {
                self.topol.rollback(save);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::QMesh;
    use crate::{element::EdgeKey, error::Error};
    use glam::vec3;

    #[test]
    fn t_quad_box_queries() {
        let qbox = QMesh::unit_box().expect("Cannot create a box");
        assert_eq!(qbox.num_vertices(), 8);
        assert_eq!(qbox.num_faces(), 6);
        assert_eq!(qbox.num_edges(), 12);
        assert_eq!(qbox.num_halfedges(), 24);
        assert_eq!(qbox.edges().len(), 12);
        for v in qbox.vertices() {
            assert_eq!(qbox.vertex_valence(v), 3);
            assert_eq!(qbox.vertex_faces(v).len(), 3);
        }
        for e in qbox.edges() {
            assert_eq!(qbox.is_boundary_edge(e.key), Ok(false));
        }
        qbox.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_edges_are_unique_and_canonical() {
        let grid = QMesh::quad_grid(3, 2, 1.0).expect("Cannot create grid");
        let edges = grid.edges();
        // 3x2 cells: 3*3 horizontal + 4*2 vertical edges.
        assert_eq!(edges.len(), 17);
        for pair in edges.windows(2) {
            assert!(pair[0].key < pair[1].key);
        }
        for e in &edges {
            assert_eq!(e.key, EdgeKey::new(e.v2, e.v1));
        }
    }

    #[test]
    fn t_boundary_vertex_rotation() {
        let grid = QMesh::quad_grid(2, 2, 1.0).expect("Cannot create grid");
        // Corner, edge midpoint, center.
        assert_eq!(grid.vertex_faces(0.into()).len(), 1);
        assert_eq!(grid.vertex_faces(1.into()).len(), 2);
        assert_eq!(grid.vertex_faces(4.into()).len(), 4);
        // Boundary edges carry no outgoing halfedge on the open side.
        assert_eq!(grid.outgoing_halfedges(1.into()).len(), 2);
        assert_eq!(grid.outgoing_halfedges(4.into()).len(), 4);
        grid.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_remove_face_and_isolated_vertices() {
        let mut grid = QMesh::quad_grid(2, 1, 1.0).expect("Cannot create grid");
        let f = grid.faces().next().expect("No faces");
        grid.remove_face(f, false).expect("Cannot remove face");
        assert_eq!(grid.num_faces(), 1);
        assert_eq!(grid.num_vertices(), 6);
        assert_eq!(grid.remove_isolated_vertices(), 2);
        assert_eq!(grid.num_vertices(), 4);
        let f = grid.faces().next().expect("No faces");
        grid.remove_face(f, true).expect("Cannot remove face");
        assert_eq!(grid.num_vertices(), 0);
        assert_eq!(grid.remove_face(f, true), Err(Error::InvalidFace(f)));
        grid.check_topology().expect("Topological errors found");
    }

    #[test]
    fn t_set_point() {
        let mut mesh = QMesh::new();
        let v = mesh.add_vertex(vec3(1.0, 2.0, 3.0));
        mesh.set_point(v, vec3(0.0, 0.0, 1.0)).expect("Cannot set point");
        assert_eq!(mesh.point(v), vec3(0.0, 0.0, 1.0));
        assert_eq!(
            mesh.set_point(9.into(), vec3(0.0, 0.0, 0.0)),
            Err(Error::InvalidVertex(9.into()))
        );
    }
}
