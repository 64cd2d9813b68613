use std::collections::HashMap;

use glam::Vec3;

use crate::{
    element::{EdgeKey, FH, Face, HH, Halfedge, Handle, VH, Vertex},
    error::Error,
    history::{Element, Savepoint, TopolHistory},
    iterator,
};

/// Connectivity arena of the mesh.
///
/// Elements live in `Vec<Option<_>>` slots indexed by their handles. Removing
/// an element leaves a tombstone, so handles are never reused. Every directed
/// edge `(from, to)` is indexed, which is how twins are found when faces are
/// added.
#[derive(Clone, Default)]
pub(crate) struct Topology {
    vertices: Vec<Option<Vertex>>,
    halfedges: Vec<Option<Halfedge>>,
    faces: Vec<Option<Face>>,
    edge_index: HashMap<(VH, VH), HH>,
    nverts: usize,
    nhalfedges: usize,
    nfaces: usize,
    history: Option<TopolHistory>,
}

impl Topology {
    pub(crate) fn with_capacity(nverts: usize, nfaces: usize) -> Self {
        Topology {
            vertices: Vec::with_capacity(nverts),
            halfedges: Vec::with_capacity(nfaces * 3),
            faces: Vec::with_capacity(nfaces),
            edge_index: HashMap::with_capacity(nfaces * 3),
            ..Default::default()
        }
    }

    pub(crate) fn num_vertices(&self) -> usize {
        self.nverts
    }

    pub(crate) fn num_halfedges(&self) -> usize {
        self.nhalfedges
    }

    pub(crate) fn num_faces(&self) -> usize {
        self.nfaces
    }

    pub(crate) fn num_edges(&self) -> usize {
        self.edge_index
            .keys()
            .filter(|(a, b)| a < b || !self.edge_index.contains_key(&(*b, *a)))
            .count()
    }

    pub(crate) fn vertices(&self) -> impl Iterator<Item = VH> + use<'_> {
        live_handles(&self.vertices)
    }

    pub(crate) fn halfedges(&self) -> impl Iterator<Item = HH> + use<'_> {
        live_handles(&self.halfedges)
    }

    pub(crate) fn faces(&self) -> impl Iterator<Item = FH> + use<'_> {
        live_handles(&self.faces)
    }

    pub(crate) fn is_valid_vertex(&self, v: VH) -> bool {
        matches!(self.vertices.get(v.index() as usize), Some(Some(_)))
    }

    pub(crate) fn is_valid_halfedge(&self, h: HH) -> bool {
        matches!(self.halfedges.get(h.index() as usize), Some(Some(_)))
    }

    pub(crate) fn is_valid_face(&self, f: FH) -> bool {
        matches!(self.faces.get(f.index() as usize), Some(Some(_)))
    }

    pub(crate) fn try_vertex(&self, v: VH) -> Option<&Vertex> {
        self.vertices.get(v.index() as usize).and_then(Option::as_ref)
    }

    pub(crate) fn try_halfedge(&self, h: HH) -> Option<&Halfedge> {
        self.halfedges.get(h.index() as usize).and_then(Option::as_ref)
    }

    fn vert(&self, v: VH) -> &Vertex {
        match &self.vertices[v.index() as usize] {
            Some(vert) => vert,
            None => panic!("{v} has been removed"),
        }
    }

    fn hedge(&self, h: HH) -> &Halfedge {
        match &self.halfedges[h.index() as usize] {
            Some(he) => he,
            None => panic!("{h} has been removed"),
        }
    }

    fn face(&self, f: FH) -> &Face {
        match &self.faces[f.index() as usize] {
            Some(face) => face,
            None => panic!("{f} has been removed"),
        }
    }

    pub(crate) fn point(&self, v: VH) -> Vec3 {
        self.vert(v).pos
    }

    pub(crate) fn set_point(&mut self, v: VH, pos: Vec3) {
        self.update_vertex(v, |vert| vert.pos = pos);
    }

    pub(crate) fn vertex_halfedge(&self, v: VH) -> Option<HH> {
        self.vert(v).halfedge
    }

    /// Number of outgoing halfedges of `v`. Unlike a rotation this counts
    /// every fan of a pinched vertex.
    pub(crate) fn vertex_valence(&self, v: VH) -> usize {
        self.vert(v).valence as usize
    }

    pub(crate) fn to_vertex(&self, h: HH) -> VH {
        self.hedge(h).vertex
    }

    pub(crate) fn from_vertex(&self, h: HH) -> VH {
        self.to_vertex(self.prev_halfedge(h))
    }

    pub(crate) fn next_halfedge(&self, h: HH) -> HH {
        self.hedge(h).next
    }

    pub(crate) fn prev_halfedge(&self, h: HH) -> HH {
        self.hedge(h).prev
    }

    pub(crate) fn twin_halfedge(&self, h: HH) -> Option<HH> {
        self.hedge(h).twin
    }

    pub(crate) fn halfedge_face(&self, h: HH) -> FH {
        self.hedge(h).face
    }

    pub(crate) fn halfedge_key(&self, h: HH) -> EdgeKey {
        EdgeKey::new(self.from_vertex(h), self.to_vertex(h))
    }

    pub(crate) fn face_halfedge(&self, f: FH) -> HH {
        self.face(f).halfedge
    }

    pub(crate) fn face_valence(&self, f: FH) -> usize {
        self.face(f).valence as usize
    }

    pub(crate) fn find_halfedge(&self, from: VH, to: VH) -> Option<HH> {
        self.edge_index.get(&(from, to)).copied()
    }

    /// Either halfedge of the edge, preferring the one from `start` to `end`.
    pub(crate) fn edge_halfedge(&self, key: EdgeKey) -> Option<HH> {
        let (a, b) = key.vertices();
        self.find_halfedge(a, b).or_else(|| self.find_halfedge(b, a))
    }

    /// Every directed edge in the index with its halfedge, in no particular
    /// order.
    pub(crate) fn directed_edges(&self) -> impl Iterator<Item = ((VH, VH), HH)> + use<'_> {
        self.edge_index.iter().map(|(k, h)| (*k, *h))
    }

    /// Linear scan for any outgoing halfedge of `v`. Used when the local fan
    /// around the vertex no longer has a replacement.
    fn scan_outgoing(&self, v: VH) -> Option<HH> {
        self.scan_all_outgoing(v).next()
    }

    /// Every outgoing halfedge of `v`, found by scanning the arena.
    pub(crate) fn scan_all_outgoing(&self, v: VH) -> impl Iterator<Item = HH> + use<'_> {
        self.halfedges
            .iter()
            .enumerate()
            .filter_map(move |(i, slot)| match slot {
                Some(he) if self.hedge(he.prev).vertex == v => Some(HH::from(i as u32)),
                _ => None,
            })
    }

    /// Faces that use `v`, found by scanning every halfedge. Unlike the
    /// rotation around the vertex this also works for pinched vertices.
    pub(crate) fn faces_using_vertex(&self, v: VH) -> Vec<FH> {
        let mut out: Vec<FH> = self
            .halfedges
            .iter()
            .flatten()
            .filter(|he| he.vertex == v)
            .map(|he| he.face)
            .collect();
        out.sort();
        out.dedup();
        out
    }

    fn write_vertex(&mut self, v: VH, val: Option<Vertex>) {
        let slot = &mut self.vertices[v.index() as usize];
        if let Some(history) = self.history.as_mut() {
            history.record(Element::Vertex(v, *slot));
        }
        match (slot.is_some(), val.is_some()) {
            (false, true) => self.nverts += 1,
            (true, false) => self.nverts -= 1,
            _ => {}
        }
        *slot = val;
    }

    fn write_halfedge(&mut self, h: HH, val: Option<Halfedge>) {
        let slot = &mut self.halfedges[h.index() as usize];
        if let Some(history) = self.history.as_mut() {
            history.record(Element::Halfedge(h, *slot));
        }
        match (slot.is_some(), val.is_some()) {
            (false, true) => self.nhalfedges += 1,
            (true, false) => self.nhalfedges -= 1,
            _ => {}
        }
        *slot = val;
    }

    fn write_face(&mut self, f: FH, val: Option<Face>) {
        let slot = &mut self.faces[f.index() as usize];
        if let Some(history) = self.history.as_mut() {
            history.record(Element::Face(f, *slot));
        }
        match (slot.is_some(), val.is_some()) {
            (false, true) => self.nfaces += 1,
            (true, false) => self.nfaces -= 1,
            _ => {}
        }
        *slot = val;
    }

    fn update_vertex(&mut self, v: VH, edit: impl FnOnce(&mut Vertex)) {
        let mut vert = *self.vert(v);
        edit(&mut vert);
        self.write_vertex(v, Some(vert));
    }

    fn update_halfedge(&mut self, h: HH, edit: impl FnOnce(&mut Halfedge)) {
        let mut he = *self.hedge(h);
        edit(&mut he);
        self.write_halfedge(h, Some(he));
    }

    pub(crate) fn add_vertex(&mut self, pos: Vec3) -> VH {
        let v = VH::from(self.vertices.len() as u32);
        self.vertices.push(None);
        self.write_vertex(
            v,
            Some(Vertex {
                pos,
                halfedge: None,
                valence: 0,
            }),
        );
        v
    }

    pub(crate) fn add_face(&mut self, verts: &[VH]) -> Result<FH, Error> {
        self.add_face_at(None, verts)
    }

    /// Add a face with the given vertex loop. If `fh` is given, the face is
    /// written into that vacant slot instead of a new one.
    pub(crate) fn add_face_at(&mut self, fh: Option<FH>, verts: &[VH]) -> Result<FH, Error> {
        let n = verts.len();
        if n < 3 {
            return Err(Error::DegenerateFace(format!("{n} vertices")));
        }
        for (i, v) in verts.iter().enumerate() {
            if !self.is_valid_vertex(*v) {
                return Err(Error::InvalidVertex(*v));
            }
            if verts[..i].contains(v) {
                return Err(Error::DegenerateFace(format!("{v} appears more than once")));
            }
        }
        for i in 0..n {
            let (a, b) = (verts[i], verts[(i + 1) % n]);
            if self.edge_index.contains_key(&(a, b)) {
                return Err(Error::NonManifoldEdge(a, b));
            }
        }
        let f = match fh {
            Some(f) => match self.faces.get(f.index() as usize) {
                Some(None) => f,
                _ => return Err(Error::InvalidFace(f)),
            },
            None => {
                let f = FH::from(self.faces.len() as u32);
                self.faces.push(None);
                f
            }
        };
        let first = self.halfedges.len() as u32;
        let hs: Vec<HH> = (0..n as u32).map(|i| HH::from(first + i)).collect();
        for i in 0..n {
            let (a, b) = (verts[i], verts[(i + 1) % n]);
            let h = hs[i];
            let twin = self.find_halfedge(b, a);
            self.halfedges.push(None);
            self.write_halfedge(
                h,
                Some(Halfedge {
                    face: f,
                    vertex: b,
                    twin,
                    next: hs[(i + 1) % n],
                    prev: hs[(i + n - 1) % n],
                }),
            );
            if let Some(t) = twin {
                self.update_halfedge(t, |he| he.twin = Some(h));
            }
            self.edge_index.insert((a, b), h);
            self.update_vertex(a, |vert| {
                vert.halfedge.get_or_insert(h);
                vert.valence += 1;
            });
        }
        self.write_face(
            f,
            Some(Face {
                halfedge: hs[0],
                valence: n as u32,
            }),
        );
        Ok(f)
    }

    /// Remove a face and its halfedges, unlinking the twins of its edges. The
    /// vertices are kept. Returns the vertex loop of the removed face.
    pub(crate) fn remove_face(&mut self, f: FH) -> Result<Vec<VH>, Error> {
        if !self.is_valid_face(f) {
            return Err(Error::InvalidFace(f));
        }
        let hs: Vec<HH> = iterator::fh_ccw_iter(self, f).collect();
        let verts: Vec<VH> = hs.iter().map(|h| self.from_vertex(*h)).collect();
        let fixes: Vec<(VH, Option<HH>)> = hs
            .iter()
            .zip(verts.iter())
            .filter(|(h, v)| self.vert(**v).halfedge == Some(**h))
            .map(|(h, v)| {
                let alt = self
                    .twin_halfedge(self.prev_halfedge(*h))
                    .or_else(|| self.twin_halfedge(*h).map(|t| self.next_halfedge(t)));
                (*v, alt)
            })
            .collect();
        let n = hs.len();
        for i in 0..n {
            let h = hs[i];
            if let Some(t) = self.twin_halfedge(h) {
                self.update_halfedge(t, |he| he.twin = None);
            }
            self.edge_index.remove(&(verts[i], verts[(i + 1) % n]));
            self.write_halfedge(h, None);
        }
        self.write_face(f, None);
        for v in &verts {
            self.update_vertex(*v, |vert| vert.valence -= 1);
        }
        for (v, alt) in fixes {
            let alt = alt.or_else(|| self.scan_outgoing(v));
            self.update_vertex(v, |vert| vert.halfedge = alt);
        }
        Ok(verts)
    }

    /// Replace the vertex loop of a face, keeping its handle.
    pub(crate) fn replace_face(&mut self, f: FH, verts: &[VH]) -> Result<(), Error> {
        self.remove_face(f)?;
        self.add_face_at(Some(f), verts)?;
        Ok(())
    }

    /// Remove a vertex that is not used by any face.
    pub(crate) fn remove_vertex(&mut self, v: VH) -> Result<(), Error> {
        if !self.is_valid_vertex(v) {
            return Err(Error::InvalidVertex(v));
        }
        if self.vert(v).halfedge.is_some() {
            return Err(Error::InvalidParameter(format!("{v} is still used by a face")));
        }
        self.write_vertex(v, None);
        Ok(())
    }

    pub(crate) fn begin(&mut self) -> Savepoint {
        let (nv, nh, nf) = (self.vertices.len(), self.halfedges.len(), self.faces.len());
        self.history
            .get_or_insert_with(TopolHistory::default)
            .begin(nv, nh, nf)
    }

    pub(crate) fn commit(&mut self) {
        let done = self.history.as_mut().is_none_or(|h| h.finish());
        if done {
            self.history = None;
        }
    }

    /// Restore every slot written since the savepoint and drop the elements
    /// added after it.
    pub(crate) fn rollback(&mut self, save: Savepoint) {
        let entries: Vec<Element> = match self.history.as_mut() {
            Some(history) => history.unwind(&save).collect(),
            None => Vec::new(),
        };
        tracing::debug!("Rolling back {} journaled writes", entries.len());
        for entry in entries {
            match entry {
                Element::Vertex(v, val) => self.vertices[v.index() as usize] = val,
                Element::Halfedge(h, val) => self.halfedges[h.index() as usize] = val,
                Element::Face(f, val) => self.faces[f.index() as usize] = val,
            }
        }
        self.vertices.truncate(save.nverts);
        self.halfedges.truncate(save.nhalfedges);
        self.faces.truncate(save.nfaces);
        self.rebuild_index();
        self.commit();
    }

    fn rebuild_index(&mut self) {
        self.nverts = self.vertices.iter().flatten().count();
        self.nfaces = self.faces.iter().flatten().count();
        self.nhalfedges = 0;
        self.edge_index.clear();
        for (i, slot) in self.halfedges.iter().enumerate() {
            if let Some(he) = slot {
                let from = self.hedge(he.prev).vertex;
                self.edge_index.insert((from, he.vertex), HH::from(i as u32));
                self.nhalfedges += 1;
            }
        }
    }

    /// Run `op` as one atomic step. If it fails, every change it made is
    /// undone before the error is returned.
    #[cfg(test)]
    pub(crate) fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let save = self.begin();
        match op(self) {
            Ok(val) => {
                self.commit();
                Ok(val)
            }
            Err(e) => {
                self.rollback(save);
                Err(e)
            }
        }
    }
}

fn live_handles<T, H: From<u32>>(slots: &[Option<T>]) -> impl Iterator<Item = H> + use<'_, T, H> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.as_ref().map(|_| H::from(i as u32)))
}
