use crate::{
    element::{FH, HH, VH},
    topol::Topology,
};

struct FaceHalfedgeIter<'a, const CCW: bool> {
    topol: &'a Topology,
    hstart: HH,
    hcurrent: Option<HH>,
}

impl Iterator for FaceHalfedgeIter<'_, true> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.next_halfedge(current);
                self.hcurrent = if next == self.hstart {
                    None
                } else {
                    Some(next)
                };
                Some(current)
            }
            None => None,
        }
    }
}

impl Iterator for FaceHalfedgeIter<'_, false> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        match self.hcurrent {
            Some(current) => {
                let next = self.topol.prev_halfedge(current);
                self.hcurrent = if next == self.hstart {
                    None
                } else {
                    Some(next)
                };
                Some(current)
            }
            None => None,
        }
    }
}

/// Rotates around a vertex through twins. Stops at the start or at a boundary.
struct OutgoingHalfedgeIter<'a, const CCW: bool> {
    topol: &'a Topology,
    hstart: HH,
    hcurrent: Option<HH>,
}

impl Iterator for OutgoingHalfedgeIter<'_, true> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.hcurrent?;
        self.hcurrent = self
            .topol
            .twin_halfedge(self.topol.prev_halfedge(current))
            .filter(|next| *next != self.hstart);
        Some(current)
    }
}

impl Iterator for OutgoingHalfedgeIter<'_, false> {
    type Item = HH;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.hcurrent?;
        self.hcurrent = self
            .topol
            .twin_halfedge(current)
            .map(|t| self.topol.next_halfedge(t))
            .filter(|next| *next != self.hstart);
        Some(current)
    }
}

pub(crate) fn fh_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = HH> + use<'_> {
    let h = topol.face_halfedge(f);
    FaceHalfedgeIter::<true> {
        topol,
        hstart: h,
        hcurrent: Some(h),
    }
}

pub(crate) fn fh_cw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = HH> + use<'_> {
    let h = topol.face_halfedge(f);
    FaceHalfedgeIter::<false> {
        topol,
        hstart: h,
        hcurrent: Some(h),
    }
}

/// Halfedges of the loop containing `h`, starting at `h`.
pub(crate) fn loop_ccw_iter(topol: &Topology, h: HH) -> impl Iterator<Item = HH> + use<'_> {
    FaceHalfedgeIter::<true> {
        topol,
        hstart: h,
        hcurrent: Some(h),
    }
}

pub(crate) fn fv_ccw_iter(topol: &Topology, f: FH) -> impl Iterator<Item = VH> + use<'_> {
    fh_ccw_iter(topol, f).map(|h| topol.to_vertex(h))
}

/// Outgoing halfedges of the fan that contains `hstart`. An open fan is walked
/// in both directions, starting from its clockwise end.
fn fan_from(topol: &Topology, hstart: HH) -> Vec<HH> {
    let mut out: Vec<HH> = OutgoingHalfedgeIter::<true> {
        topol,
        hstart,
        hcurrent: Some(hstart),
    }
    .collect();
    let closed = topol
        .twin_halfedge(topol.prev_halfedge(*out.last().unwrap_or(&hstart)))
        == Some(hstart);
    if !closed {
        // Hit a boundary, walk the other way as well.
        let mut cw: Vec<HH> = OutgoingHalfedgeIter::<false> {
            topol,
            hstart,
            hcurrent: Some(hstart),
        }
        .skip(1)
        .collect();
        cw.reverse();
        cw.extend(out);
        out = cw;
    }
    out
}

/// Outgoing halfedges of the fan that contains the vertex's reference
/// halfedge only.
pub(crate) fn vertex_fan(topol: &Topology, v: VH) -> Vec<HH> {
    match topol.vertex_halfedge(v) {
        Some(h) => fan_from(topol, h),
        None => Vec::new(),
    }
}

/// Every outgoing halfedge of the vertex, fan by fan. A manifold vertex has a
/// single fan and is walked by rotation alone. The fans of a pinched vertex
/// are found through the arena.
pub(crate) fn voh_iter(topol: &Topology, v: VH) -> Vec<HH> {
    let mut out = vertex_fan(topol, v);
    if out.len() < topol.vertex_valence(v) {
        for h in topol.scan_all_outgoing(v) {
            if !out.contains(&h) {
                out.extend(fan_from(topol, h));
            }
        }
    }
    out
}

pub(crate) fn vf_iter(topol: &Topology, v: VH) -> Vec<FH> {
    voh_iter(topol, v)
        .into_iter()
        .map(|h| topol.halfedge_face(h))
        .collect()
}

pub(crate) fn vv_iter(topol: &Topology, v: VH) -> Vec<VH> {
    voh_iter(topol, v)
        .into_iter()
        .map(|h| topol.to_vertex(h))
        .collect()
}
