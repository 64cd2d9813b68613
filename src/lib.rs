/*!
A halfedge polygon mesh engine for interactive modeling, with topology editing,
boolean operations and a non-destructive modifier stack.

# Overview

+ [`QMesh`] is the editable representation. It stores the connectivity of
  vertices, halfedges and faces, where faces can have any number of vertices.
  Element handles ([`VH`], [`HH`], [`FH`]) stay stable across edits: a removed
  element leaves a tombstone and its id is never reused.

+ Every editing operation on [`QMesh`] is atomic. Either it succeeds, or it
  fails with an [`Error`] and leaves the mesh exactly as it was. The editing
  operations include:

  + [`QMesh::extrude_faces`], [`QMesh::inset_faces`] and [`QMesh::spin`] to
    grow new geometry out of a region of faces.

  + [`QMesh::bevel_edges`], [`QMesh::loop_cut`] and [`QMesh::split_face`] to
    refine existing geometry.

  + [`QMesh::dissolve_edges`] and [`QMesh::merge_vertices`] to simplify it.

+ [`FlatMesh`] is a flat indexed triangle buffer, used to exchange geometry
  with renderers and file formats. [`compile`] and [`decompile`] convert
  between the two representations.

+ The [`boolean`] module combines two flat meshes with union, subtraction or
  intersection, and rebuilds an editable [`QMesh`] from the result.

+ The [`modifier`] module evaluates an ordered stack of generative modifiers
  (mirror, array, solidify, displace and subdivision) on top of a base flat
  mesh without changing it.

Diagnostics are emitted through [`tracing`](https://crates.io/crates/tracing);
installing a subscriber is up to the application.
*/

mod bridge;
mod check;
mod config;
mod edit;
mod element;
mod error;
mod flat;
mod history;
mod iterator;
mod macros;
mod math;
mod mesh;
mod primitive;
mod topol;
mod triangulate;

#[cfg(feature = "obj")]
mod obj;

pub mod boolean;
pub mod modifier;

pub use boolean::{
    BooleanEngine, BooleanOp, BooleanOperand, BooleanResult, BspKernel, CsgKernel, Validation,
    perform_intersect, perform_subtract, perform_union, validate_mesh_for_boolean,
};
pub use bridge::{compile, decompile, decompile_with};
pub use config::{
    BEVEL_MAX_SLIDE, BSP_EPSILON, BooleanConfig, BridgeConfig, EDGE_LOOP_LIMIT, EPSILON,
    FULL_TURN_TOLERANCE, KNIFE_PLANE_TOLERANCE, Weld,
};
pub use edit::{LoopCut, Spin};
pub use element::{EdgeInfo, EdgeKey, FH, HH, Handle, VH};
pub use error::Error;
pub use flat::FlatMesh;
pub use math::{Aabb, centroid, newell_normal, polygon_area};
pub use mesh::QMesh;
pub use modifier::{
    ArrayMode, Axis, Modifier, ModifierKind, ModifierStack, ValueNoise, apply_modifier_stack,
};
pub use triangulate::triangulate_polygon;
