use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::{
    config::BEVEL_MAX_SLIDE,
    element::{EdgeKey, FH, VH},
    error::Error,
    mesh::QMesh,
};

/// Point on the quadratic profile from `a` to `b` bending towards the corner
/// `c`.
fn profile(a: Vec3, c: Vec3, b: Vec3, t: f32) -> Vec3 {
    let s = 1.0 - t;
    a * (s * s) + c * (2.0 * s * t) + b * (t * t)
}

/// Drop consecutive repeats, treating the list as a closed loop.
fn dedup_cyclic(mut verts: Vec<VH>) -> Vec<VH> {
    verts.dedup();
    while verts.len() > 1 && verts.first() == verts.last() {
        verts.pop();
    }
    verts
}

fn is_simple(verts: &[VH]) -> bool {
    let unique: HashSet<&VH> = verts.iter().collect();
    unique.len() == verts.len()
}

/// The edges and faces around a vertex, in rotation order. Face `j` lies
/// between spokes `j` and `j + 1` and its loop reads `spokes[j + 1] -> vertex
/// -> spokes[j]`. On the boundary the last face is a gap.
struct Fan {
    vertex: VH,
    spokes: Vec<VH>,
    faces: Vec<Option<FH>>,
}

impl Fan {
    fn len(&self) -> usize {
        self.spokes.len()
    }

    fn next(&self, j: usize) -> usize {
        (j + 1) % self.len()
    }

    fn prev(&self, j: usize) -> usize {
        (j + self.len() - 1) % self.len()
    }

    fn is_closed(&self) -> bool {
        self.faces.iter().all(Option::is_some)
    }

    fn position(&self, f: FH) -> Option<usize> {
        self.faces.iter().position(|g| *g == Some(f))
    }
}

/// What happens to a beveled vertex.
enum Fate {
    /// Every face around the vertex is cut. The vertex is replaced by a
    /// corner face, if the new points span one.
    Corner,
    /// The only face not cut takes the new points in place of the vertex.
    Absorbed(FH),
    /// The vertex stays, and each run of cut faces is closed with a cap.
    Kept,
}

/// Everything a joint bevel creates around one vertex.
struct Corner {
    fan: Fan,
    selected: Vec<bool>,
    /// New point of each cut face.
    points: Vec<Option<VH>>,
    /// Points sliding along unselected spokes, by spoke.
    slides: HashMap<usize, VH>,
    /// Profile of each selected spoke, from the point of the face before it
    /// to the point of the face after it.
    chains: HashMap<usize, Vec<VH>>,
    fate: Fate,
}

impl Corner {
    fn is_cut(&self, j: usize) -> bool {
        self.fan.faces[j].is_some() && (self.selected[j] || self.selected[self.fan.next(j)])
    }

    /// Runs of cut faces, each as the loop of new points from the slide on
    /// its first spoke to the slide on its last spoke.
    fn runs(&self) -> Vec<Vec<VH>> {
        let m = self.fan.len();
        let Some(start) = (0..m).find(|j| !self.is_cut(*j)) else {
            return vec![self.ring()];
        };
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for step in 1..=m {
            let j = (start + step) % m;
            if self.is_cut(j) {
                current.extend(self.points[j]);
                if let Some(chain) = self.chains.get(&self.fan.next(j)) {
                    current.extend_from_slice(&chain[1..chain.len() - 1]);
                }
            } else if !current.is_empty() {
                runs.push(dedup_cyclic(std::mem::take(&mut current)));
            }
        }
        runs
    }

    /// Loop of new points around a vertex whose faces are all cut.
    fn ring(&self) -> Vec<VH> {
        let mut out = Vec::new();
        for j in 0..self.fan.len() {
            out.extend(self.points[j]);
            if let Some(chain) = self.chains.get(&self.fan.next(j)) {
                out.extend_from_slice(&chain[1..chain.len() - 1]);
            }
        }
        dedup_cyclic(out)
    }

    /// Profile along the spoke towards `to`, if that spoke is beveled.
    fn chain_to(&self, to: VH) -> Option<&[VH]> {
        let j = self.fan.spokes.iter().position(|n| *n == to)?;
        self.chains.get(&j).map(Vec::as_slice)
    }

    /// Vertices that replace the corner in face `j`.
    fn replacement(&self, j: usize) -> Vec<VH> {
        if let Some(p) = self.points[j] {
            return vec![p];
        }
        match self.fate {
            Fate::Absorbed(_) => self.runs().into_iter().next().unwrap_or_default(),
            _ => {
                let mut out = Vec::with_capacity(3);
                out.extend(self.slides.get(&self.fan.next(j)));
                out.push(self.fan.vertex);
                out.extend(self.slides.get(&j));
                out
            }
        }
    }
}

impl QMesh {
    fn bevel_fan(&self, v: VH) -> Result<Fan, Error> {
        if !self.is_manifold_vertex(v) {
            return Err(Error::ComplexVertex(v));
        }
        let hs = self.outgoing_halfedges(v);
        let last = *hs
            .last()
            .ok_or_else(|| Error::DegenerateFace(format!("{v} is isolated")))?;
        let mut spokes: Vec<VH> = hs.iter().map(|h| self.to_vertex(*h)).collect();
        let mut faces: Vec<Option<FH>> = hs.iter().map(|h| Some(self.halfedge_face(*h))).collect();
        let inner = self.prev_halfedge(last);
        if self.twin_halfedge(inner).is_none() {
            spokes.push(self.from_vertex(inner));
            faces.push(None);
        }
        if spokes.len() < 3 {
            return Err(Error::DegenerateFace(format!("{v} has too few edges to bevel")));
        }
        Ok(Fan {
            vertex: v,
            spokes,
            faces,
        })
    }

    /// Check that an edge can be beveled and return the fans of its
    /// endpoints.
    fn bevel_target(&self, key: EdgeKey) -> Result<[Fan; 2], Error> {
        let h = self.edge_halfedge(key).ok_or(Error::EdgeNotFound(key))?;
        let t = self
            .twin_halfedge(h)
            .ok_or(Error::BoundaryEdgeNotBevelable(key))?;
        let (f1, f2) = (self.halfedge_face(h), self.halfedge_face(t));
        if f1 == f2 {
            return Err(Error::DegenerateFace(format!(
                "{f1} lies on both sides of {key}"
            )));
        }
        let (a, b) = key.vertices();
        Ok([self.bevel_fan(a)?, self.bevel_fan(b)?])
    }

    /// Create the new points around one vertex and decide its fate.
    fn bevel_corner(
        &mut self,
        fan: Fan,
        selected: &HashSet<EdgeKey>,
        d: f32,
        segments: usize,
        profiles: &mut HashMap<(VH, VH, VH), Vec<VH>>,
    ) -> Corner {
        let v = fan.vertex;
        let m = fan.len();
        let origin = self.point(v);
        let dirs: Vec<Vec3> = fan
            .spokes
            .iter()
            .map(|n| (self.point(*n) - origin).normalize_or_zero())
            .collect();
        let mut corner = Corner {
            selected: fan
                .spokes
                .iter()
                .map(|n| selected.contains(&EdgeKey::new(v, *n)))
                .collect(),
            points: vec![None; m],
            slides: HashMap::new(),
            chains: HashMap::new(),
            fate: Fate::Kept,
            fan,
        };
        for j in 0..m {
            if !corner.is_cut(j) {
                continue;
            }
            let k = corner.fan.next(j);
            let p = match (corner.selected[j], corner.selected[k]) {
                (true, true) => self.add_vertex(origin + (dirs[j] + dirs[k]) * d),
                (true, false) => *corner
                    .slides
                    .entry(k)
                    .or_insert_with(|| self.add_vertex(origin + dirs[k] * d)),
                _ => *corner
                    .slides
                    .entry(j)
                    .or_insert_with(|| self.add_vertex(origin + dirs[j] * d)),
            };
            corner.points[j] = Some(p);
        }
        for j in 0..m {
            if !corner.selected[j] {
                continue;
            }
            // A selected spoke is never on the boundary, so both faces are cut.
            let (Some(start), Some(end)) = (
                corner.points[corner.fan.prev(j)],
                corner.points[j],
            ) else {
                continue;
            };
            // Two spokes whose profiles span the same points share them.
            let key = (v, start.min(end), start.max(end));
            let interior = match profiles.get(&key) {
                Some(shared) if start < end => shared.clone(),
                Some(shared) => shared.iter().rev().copied().collect(),
                None => {
                    let (ps, pe) = (self.point(start), self.point(end));
                    let interior: Vec<VH> = (1..segments)
                        .map(|i| {
                            self.add_vertex(profile(ps, origin, pe, i as f32 / segments as f32))
                        })
                        .collect();
                    let stored = if start < end {
                        interior.clone()
                    } else {
                        interior.iter().rev().copied().collect()
                    };
                    profiles.insert(key, stored);
                    interior
                }
            };
            let mut chain = Vec::with_capacity(segments + 1);
            chain.push(start);
            chain.extend(interior);
            chain.push(end);
            corner.chains.insert(j, chain);
        }
        let uncut: Vec<usize> = (0..m).filter(|j| !corner.is_cut(*j)).collect();
        corner.fate = match (corner.fan.is_closed(), uncut.as_slice()) {
            (true, []) => Fate::Corner,
            (true, [j]) if m == 3 => match corner.fan.faces[*j] {
                Some(f) => Fate::Absorbed(f),
                None => Fate::Kept,
            },
            _ => Fate::Kept,
        };
        corner
    }

    /// Replace each edge with a strip of `segments` quads.
    ///
    /// The endpoints slide along the edges around them by `amount`, clamped
    /// to half the length of the shortest edge at any beveled vertex so the
    /// bevel never reaches the next vertex. The strips follow a quadratic
    /// profile through the original edges. Edges that meet at a vertex are
    /// beveled together: their strips share the new points between them.
    ///
    /// A vertex is then handled in one of three ways. If all its faces are
    /// cut, it is replaced by a corner face. If it has three edges and one
    /// face that is not cut, it is absorbed into that face. Otherwise it stays
    /// and the cut is closed with cap faces.
    ///
    /// Edges that cannot be beveled, such as boundary edges, are skipped with
    /// a warning. Returns the strip, cap and corner faces.
    pub fn bevel_edges(
        &mut self,
        keys: &[EdgeKey],
        amount: f32,
        segments: usize,
    ) -> Result<Vec<FH>, Error> {
        if !(amount > 0.0) || !amount.is_finite() {
            return Err(Error::InvalidParameter(format!("bevel amount {amount}")));
        }
        if segments == 0 {
            return Err(Error::InvalidParameter(
                "bevel needs at least one segment".into(),
            ));
        }
        let mut selected = HashSet::with_capacity(keys.len());
        let mut edges = Vec::with_capacity(keys.len());
        let mut fans: Vec<Fan> = Vec::new();
        for &key in keys {
            if selected.contains(&key) {
                continue;
            }
            match self.bevel_target(key) {
                Ok(ends) => {
                    selected.insert(key);
                    edges.push(key);
                    for fan in ends {
                        if fans.iter().all(|f| f.vertex != fan.vertex) {
                            fans.push(fan);
                        }
                    }
                }
                Err(e) => tracing::warn!("Skipping bevel of {key}: {e}"),
            }
        }
        if edges.is_empty() {
            return Ok(Vec::new());
        }
        let shortest = fans
            .iter()
            .flat_map(|fan| fan.spokes.iter().map(|n| self.edge_length(fan.vertex, *n)))
            .fold(f32::INFINITY, f32::min);
        let d = amount.min(shortest * BEVEL_MAX_SLIDE);
        if d < amount {
            tracing::debug!("Clamped bevel from {amount} to {d}");
        }
        self.transact(|mesh| {
            let mut profiles = HashMap::new();
            let corners: Vec<Corner> = fans
                .into_iter()
                .map(|fan| mesh.bevel_corner(fan, &selected, d, segments, &mut profiles))
                .collect();
            let index: HashMap<VH, &Corner> = corners.iter().map(|c| (c.fan.vertex, c)).collect();
            // New loops of the faces around the beveled vertices, computed
            // before any of them changes.
            let mut touched: Vec<FH> = corners
                .iter()
                .flat_map(|c| c.fan.faces.iter().flatten().copied())
                .collect();
            touched.sort();
            touched.dedup();
            let loops: Vec<(FH, Vec<VH>)> = touched
                .iter()
                .map(|f| {
                    let verts: Vec<VH> = mesh
                        .face_vertices(*f)
                        .into_iter()
                        .flat_map(|v| match index.get(&v) {
                            Some(c) => c.fan.position(*f).map_or(vec![v], |j| c.replacement(j)),
                            None => vec![v],
                        })
                        .collect();
                    (*f, verts)
                })
                .collect();
            for f in &touched {
                mesh.topol.remove_face(*f)?;
            }
            for (f, verts) in &loops {
                mesh.topol.add_face_at(Some(*f), verts)?;
            }
            let mut added = Vec::new();
            for key in &edges {
                let (a, b) = key.vertices();
                let (Some(chain_a), Some(chain_b)) = (
                    index.get(&a).and_then(|c| c.chain_to(b)),
                    index.get(&b).and_then(|c| c.chain_to(a)),
                ) else {
                    return Err(Error::EdgeNotFound(*key));
                };
                // The chains run in opposite directions across the strip.
                for k in 0..segments {
                    added.push(mesh.topol.add_face(&[
                        chain_a[k + 1],
                        chain_a[k],
                        chain_b[segments - k],
                        chain_b[segments - k - 1],
                    ])?);
                }
            }
            let mut removed = Vec::new();
            for corner in &corners {
                let v = corner.fan.vertex;
                match corner.fate {
                    Fate::Corner => {
                        let ring = corner.ring();
                        if ring.len() >= 3 && is_simple(&ring) {
                            added.push(mesh.topol.add_face(&ring)?);
                        }
                        removed.push(v);
                    }
                    Fate::Absorbed(_) => removed.push(v),
                    Fate::Kept => {
                        for run in corner.runs() {
                            let mut cap = Vec::with_capacity(run.len() + 1);
                            cap.push(v);
                            cap.extend(run);
                            added.push(mesh.topol.add_face(&cap)?);
                        }
                    }
                }
            }
            for v in removed {
                mesh.topol.remove_vertex(v)?;
            }
            tracing::debug!(
                "Beveled {} edges into {} faces",
                edges.len(),
                added.len()
            );
            Ok(added)
        })
    }
}
