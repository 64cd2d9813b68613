use thiserror::Error;

use crate::element::{EdgeKey, FH, HH, VH};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Topology.
    #[error("non-manifold edge from {0} to {1}")]
    NonManifoldEdge(VH, VH),
    #[error("merging requires at least two vertices, got {0}")]
    InsufficientVertices(usize),
    #[error("{0} does not exist")]
    InvalidVertex(VH),
    #[error("{0} does not exist")]
    InvalidFace(FH),
    #[error("edge {0} does not exist")]
    EdgeNotFound(EdgeKey),
    #[error("edge {0} lies on the boundary and cannot be dissolved")]
    BoundaryEdgeNotDissolvable(EdgeKey),
    #[error("edge {0} lies on the boundary and cannot be beveled")]
    BoundaryEdgeNotBevelable(EdgeKey),
    #[error("{0} joins more than one fan of faces")]
    ComplexVertex(VH),
    #[error("face would be degenerate: {0}")]
    DegenerateFace(String),
    // Knife.
    #[error("degenerate cut")]
    DegenerateCut,
    #[error("cut point lies outside the face")]
    PointOutsideFace,
    // Boolean.
    #[error("empty mesh: {0}")]
    EmptyMesh(String),
    #[error("missing geometry for boolean operand")]
    MissingGeometry,
    #[error("the operands do not intersect")]
    NoIntersection,
    // Buffers and parameters.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("failed to load obj: {0}")]
    ObjLoadFailed(String),
    // Topology checks.
    #[error("{0} is not linked consistently with its neighbours")]
    InvalidHalfedgeLink(HH),
    #[error("{0} has an inconsistent twin")]
    InvalidTwin(HH),
    #[error("the loop of {0} is malformed")]
    InvalidLoopTopology(FH),
    #[error("the outgoing halfedge of {0} is invalid")]
    InvalidOutgoingHalfedge(VH),
    #[error("{0} is missing from the edge index")]
    EdgeIndexMismatch(HH),
}
