use crate::element::{FH, Face, HH, Halfedge, VH, Vertex};

/// Previous contents of an arena slot, recorded before it is overwritten.
#[derive(Clone)]
pub(crate) enum Element {
    Vertex(VH, Option<Vertex>),
    Halfedge(HH, Option<Halfedge>),
    Face(FH, Option<Face>),
}

/// Marks the state of the journal and the arenas when a transaction began.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Savepoint {
    pub(crate) mark: usize,
    pub(crate) nverts: usize,
    pub(crate) nhalfedges: usize,
    pub(crate) nfaces: usize,
}

/// Journal of overwritten slots used to roll back failed operations.
///
/// Transactions nest. Each one remembers a [`Savepoint`], and rolling back to
/// it replays only the entries recorded after it. The journal is discarded when
/// the outermost transaction finishes.
#[derive(Default, Clone)]
pub(crate) struct TopolHistory {
    cache: Vec<Element>,
    depth: usize,
}

impl TopolHistory {
    pub(crate) fn begin(&mut self, nverts: usize, nhalfedges: usize, nfaces: usize) -> Savepoint {
        self.depth += 1;
        Savepoint {
            mark: self.cache.len(),
            nverts,
            nhalfedges,
            nfaces,
        }
    }

    pub(crate) fn record(&mut self, elem: Element) {
        self.cache.push(elem);
    }

    /// Finish a transaction. Returns true if it was the outermost one.
    pub(crate) fn finish(&mut self) -> bool {
        self.depth = self.depth.saturating_sub(1);
        self.depth == 0
    }

    /// Take the entries recorded after the savepoint, most recent first.
    pub(crate) fn unwind(&mut self, save: &Savepoint) -> impl Iterator<Item = Element> + use<> {
        let tail: Vec<Element> = self.cache.drain(save.mark..).collect();
        tail.into_iter().rev()
    }
}
