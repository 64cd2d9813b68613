use std::collections::HashSet;

use crate::{
    config::EDGE_LOOP_LIMIT,
    element::{EdgeKey, FH, HH, VH},
    error::Error,
    mesh::QMesh,
};

/// Result of [`QMesh::loop_cut`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopCut {
    /// One new vertex per edge of the ring, in ring order.
    pub vertices: Vec<VH>,
    /// The new edges splitting the faces of the ring.
    pub edges: Vec<EdgeKey>,
}

/// A ring of parallel edges across a strip of quads.
///
/// All edges are oriented the same way along the strip. Face `i` lies between
/// edge `i` and edge `i + 1`; it contains edge `i` in its own direction and
/// edge `i + 1` reversed, so its loop is `[u_i, w_i, w_i+1, u_i+1]`. When the
/// ring is closed, the last face connects the last edge to the first.
struct EdgeRing {
    edges: Vec<(VH, VH)>,
    faces: Vec<FH>,
    closed: bool,
}

impl QMesh {
    /// Walk across quads starting with the face of `start`, in the direction
    /// of that face.
    fn walk_ring(&self, start: HH, visited: &mut HashSet<FH>) -> EdgeRing {
        let key = self.halfedge_key(start);
        let mut ring = EdgeRing {
            edges: vec![(self.from_vertex(start), self.to_vertex(start))],
            faces: Vec::new(),
            closed: false,
        };
        let mut current = Some(start);
        while let Some(h) = current {
            if ring.edges.len() > EDGE_LOOP_LIMIT {
                tracing::warn!("Edge ring through {key} is too long, stopping");
                break;
            }
            let f = self.halfedge_face(h);
            if self.face_valence(f) != 4 || !visited.insert(f) {
                break;
            }
            ring.faces.push(f);
            let opposite = self.next_halfedge(self.next_halfedge(h));
            if self.halfedge_key(opposite) == key {
                ring.closed = true;
                break;
            }
            ring.edges
                .push((self.to_vertex(opposite), self.from_vertex(opposite)));
            current = self.twin_halfedge(opposite);
        }
        ring
    }

    fn edge_ring(&self, key: EdgeKey) -> Result<EdgeRing, Error> {
        let (a, b) = key.vertices();
        let start = self
            .find_halfedge(a, b)
            .or_else(|| self.find_halfedge(b, a))
            .ok_or(Error::EdgeNotFound(key))?;
        let mut visited = HashSet::new();
        let mut ring = self.walk_ring(start, &mut visited);
        if ring.closed {
            return Ok(ring);
        }
        if let Some(t) = self.twin_halfedge(start) {
            let back = self.walk_ring(t, &mut visited);
            let mut edges: Vec<(VH, VH)> = back
                .edges
                .iter()
                .skip(1)
                .rev()
                .map(|(u, w)| (*w, *u))
                .collect();
            edges.append(&mut ring.edges);
            let mut faces: Vec<FH> = back.faces.into_iter().rev().collect();
            faces.append(&mut ring.faces);
            ring.edges = edges;
            ring.faces = faces;
        }
        Ok(ring)
    }

    /// The loop of parallel edges through the given edge.
    ///
    /// The loop is walked by crossing each quad to the edge opposite to the one
    /// it was entered through, in both directions from the start edge. It
    /// stops at boundaries and at faces that are not quads, or when it returns
    /// to the start edge.
    pub fn find_edge_loop(&self, key: EdgeKey) -> Result<Vec<EdgeKey>, Error> {
        Ok(self
            .edge_ring(key)?
            .edges
            .into_iter()
            .map(|(u, w)| EdgeKey::new(u, w))
            .collect())
    }

    /// Cut the ring of quads through the given edge in two.
    ///
    /// A new vertex is inserted into every edge of the loop found by
    /// [`Self::find_edge_loop`], at `position` along it, measured from the
    /// same side of the strip as the start of `key`. Each quad of the ring is
    /// split into two quads along the new vertices. Faces at the open ends of
    /// the ring receive the new end vertex so the mesh stays conforming.
    pub fn loop_cut(&mut self, key: EdgeKey, position: f32) -> Result<LoopCut, Error> {
        if !(0.0..=1.0).contains(&position) {
            return Err(Error::InvalidParameter(format!(
                "loop cut position {position} is not in [0, 1]"
            )));
        }
        let mut ring = self.edge_ring(key)?;
        // Measure the position from the start of the key.
        if let Some(i) = ring
            .edges
            .iter()
            .position(|(u, w)| EdgeKey::new(*u, *w) == key)
        {
            if ring.edges[i].0 != key.start() {
                ring.edges.iter_mut().for_each(|(u, w)| std::mem::swap(u, w));
                // Reversing the edges mirrors the strip, so the faces now hold
                // the edges in the other direction. Reverse the order to keep
                // face i between edges i and i + 1 with the expected winding.
                ring.edges.reverse();
                ring.faces.reverse();
                if ring.closed {
                    ring.edges.rotate_right(1);
                }
            }
        }
        let ring_faces: HashSet<FH> = ring.faces.iter().copied().collect();
        self.transact(|mesh| {
            let verts: Vec<VH> = ring
                .edges
                .iter()
                .map(|(u, w)| {
                    let p = mesh.point(*u).lerp(mesh.point(*w), position);
                    mesh.add_vertex(p)
                })
                .collect();
            let n = ring.edges.len();
            if !ring.closed {
                // The faces beyond the two ends of the strip.
                let ends = [
                    (ring.edges[0].1, ring.edges[0].0, verts[0]),
                    (ring.edges[n - 1].0, ring.edges[n - 1].1, verts[n - 1]),
                ];
                for (x, y, v) in ends {
                    let Some(h) = mesh.find_halfedge(x, y) else {
                        continue;
                    };
                    let f = mesh.halfedge_face(h);
                    if ring_faces.contains(&f) {
                        return Err(Error::InvalidParameter(format!(
                            "edge ring through {key} crosses itself"
                        )));
                    }
                    mesh.insert_between(f, x, y, v)?;
                }
            }
            let mut edges = Vec::with_capacity(ring.faces.len());
            for (i, f) in ring.faces.iter().enumerate() {
                let j = (i + 1) % n;
                let ((u0, w0), (u1, w1)) = (ring.edges[i], ring.edges[j]);
                let (m0, m1) = (verts[i], verts[j]);
                mesh.topol.replace_face(*f, &[u0, m0, m1, u1])?;
                mesh.topol.add_face(&[m0, w0, w1, m1])?;
                edges.push(EdgeKey::new(m0, m1));
            }
            tracing::debug!(
                "Loop cut through {key} added {} vertices and split {} faces",
                verts.len(),
                ring.faces.len()
            );
            Ok(LoopCut {
                vertices: verts,
                edges,
            })
        })
    }
}
