use glam::Vec3;
use std::fmt::{Debug, Display};

/**
 * All elements of the mesh implement this trait. They are identified by their
 * index.
 */
pub trait Handle {
    /**
     * The index of the element.
     */
    fn index(&self) -> u32;
}

/**
 * Vertex handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VH {
    idx: u32,
}

/**
 * Halfedge handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HH {
    idx: u32,
}

/**
 * Face handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FH {
    idx: u32,
}

macro_rules! impl_handle {
    ($name:ident, $label:literal) => {
        impl Handle for $name {
            fn index(&self) -> u32 {
                self.idx
            }
        }

        impl From<u32> for $name {
            fn from(idx: u32) -> Self {
                $name { idx }
            }
        }

        impl From<&u32> for $name {
            fn from(idx: &u32) -> Self {
                $name { idx: *idx }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.idx)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.idx)
            }
        }
    };
}

impl_handle!(VH, "VH");
impl_handle!(HH, "HH");
impl_handle!(FH, "FH");

/// Canonical key of an undirected edge.
///
/// The key is the pair of endpoint vertices with the smaller vertex first, so
/// both halfedges of an edge map to the same key regardless of direction.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    v0: VH,
    v1: VH,
}

impl EdgeKey {
    pub fn new(a: VH, b: VH) -> Self {
        if a <= b {
            EdgeKey { v0: a, v1: b }
        } else {
            EdgeKey { v0: b, v1: a }
        }
    }

    /// The endpoint with the smaller id.
    pub fn start(&self) -> VH {
        self.v0
    }

    /// The endpoint with the larger id.
    pub fn end(&self) -> VH {
        self.v1
    }

    pub fn vertices(&self) -> (VH, VH) {
        (self.v0, self.v1)
    }

    pub fn contains(&self, v: VH) -> bool {
        self.v0 == v || self.v1 == v
    }
}

impl Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e({},{})", self.v0.idx, self.v1.idx)
    }
}

impl Debug for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e({},{})", self.v0.idx, self.v1.idx)
    }
}

/// One entry of [`crate::QMesh::edges`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EdgeInfo {
    pub v1: VH,
    pub v2: VH,
    pub key: EdgeKey,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Vertex {
    pub(crate) pos: Vec3,
    /// Any outgoing halfedge. Used for traversal only.
    pub(crate) halfedge: Option<HH>,
    /// Number of outgoing halfedges, over every fan of the vertex.
    pub(crate) valence: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Halfedge {
    pub(crate) face: FH,
    /// The vertex this halfedge points to.
    pub(crate) vertex: VH,
    pub(crate) twin: Option<HH>,
    pub(crate) next: HH,
    pub(crate) prev: HH,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Face {
    pub(crate) halfedge: HH,
    pub(crate) valence: u32,
}
