use std::collections::HashMap;

use crate::{
    element::{EdgeKey, Handle, VH},
    error::Error,
    iterator,
    topol::Topology,
};

fn check_vertices(topol: &Topology) -> Result<(), Error> {
    // Outgoing halfedges per vertex, counted over the whole arena.
    let mut counts: HashMap<VH, usize> = HashMap::new();
    for h in topol.halfedges() {
        *counts.entry(topol.from_vertex(h)).or_default() += 1;
    }
    for v in topol.vertices() {
        let count = counts.get(&v).copied().unwrap_or(0);
        if topol.vertex_valence(v) != count {
            return Err(Error::InvalidOutgoingHalfedge(v));
        }
        let Some(h) = topol.vertex_halfedge(v) else {
            if count > 0 {
                return Err(Error::InvalidOutgoingHalfedge(v));
            }
            continue;
        };
        // Must be a live halfedge going out of this vertex.
        if !topol.is_valid_halfedge(h) || topol.from_vertex(h) != v {
            return Err(Error::InvalidOutgoingHalfedge(v));
        }
        // Rotation must visit each outgoing halfedge exactly once.
        let mut fan = iterator::voh_iter(topol, v);
        let n = fan.len();
        fan.sort();
        fan.dedup();
        if fan.len() != n || n != count || fan.iter().any(|h| topol.from_vertex(*h) != v) {
            return Err(Error::InvalidOutgoingHalfedge(v));
        }
    }
    Ok(())
}

fn check_halfedges(topol: &Topology) -> Result<(), Error> {
    for h in topol.halfedges() {
        let Some(he) = topol.try_halfedge(h) else {
            return Err(Error::InvalidHalfedgeLink(h));
        };
        let (Some(next), Some(prev)) = (topol.try_halfedge(he.next), topol.try_halfedge(he.prev))
        else {
            return Err(Error::InvalidHalfedgeLink(h));
        };
        if next.prev != h || prev.next != h {
            return Err(Error::InvalidHalfedgeLink(h));
        }
        if next.face != he.face || prev.face != he.face || !topol.is_valid_face(he.face) {
            return Err(Error::InvalidHalfedgeLink(h));
        }
        if topol.try_vertex(he.vertex).is_none() {
            return Err(Error::InvalidHalfedgeLink(h));
        }
        let (from, to) = (prev.vertex, he.vertex);
        if from == to {
            return Err(Error::InvalidHalfedgeLink(h));
        }
        if topol.find_halfedge(from, to) != Some(h) {
            return Err(Error::EdgeIndexMismatch(h));
        }
        match he.twin {
            Some(t) => {
                let Some(twin) = topol.try_halfedge(t) else {
                    return Err(Error::InvalidTwin(h));
                };
                if twin.twin != Some(h) || twin.face == he.face {
                    return Err(Error::InvalidTwin(h));
                }
                if topol.halfedge_key(t) != EdgeKey::new(from, to) || twin.vertex != from {
                    return Err(Error::InvalidTwin(h));
                }
            }
            None => {
                // A missing twin is only allowed if the opposite direction is
                // really absent.
                if topol.find_halfedge(to, from).is_some() {
                    return Err(Error::InvalidTwin(h));
                }
            }
        }
    }
    Ok(())
}

fn check_faces(topol: &Topology, visited: &mut [bool]) -> Result<(), Error> {
    visited.fill(false);
    for f in topol.faces() {
        let hstart = topol.face_halfedge(f);
        if !topol.is_valid_halfedge(hstart) || topol.halfedge_face(hstart) != f {
            return Err(Error::InvalidLoopTopology(f));
        }
        let valence = topol.face_valence(f);
        let mut verts = Vec::with_capacity(valence);
        // Walk with a bound so a broken loop cannot spin forever.
        for h in iterator::fh_ccw_iter(topol, f).take(valence + 1) {
            if std::mem::replace(&mut visited[h.index() as usize], true) {
                return Err(Error::InvalidLoopTopology(f));
            }
            if topol.halfedge_face(h) != f {
                return Err(Error::InvalidLoopTopology(f));
            }
            verts.push(topol.to_vertex(h));
        }
        if verts.len() != valence || valence < 3 {
            return Err(Error::InvalidLoopTopology(f));
        }
        verts.sort();
        verts.dedup();
        if verts.len() != valence {
            return Err(Error::InvalidLoopTopology(f));
        }
    }
    // Every live halfedge belongs to exactly one face loop.
    if let Some(h) = topol.halfedges().find(|h| !visited[h.index() as usize]) {
        return Err(Error::InvalidHalfedgeLink(h));
    }
    Ok(())
}

/// Verify every connectivity invariant of the mesh. Returns an error naming the
/// first offending element.
pub(crate) fn check_topology(topol: &Topology) -> Result<(), Error> {
    let nslots = topol
        .halfedges()
        .map(|h| h.index() as usize + 1)
        .max()
        .unwrap_or(0);
    let mut visited = vec![false; nslots];
    check_halfedges(topol)?;
    check_faces(topol, &mut visited)?;
    check_vertices(topol)?;
    Ok(())
}
