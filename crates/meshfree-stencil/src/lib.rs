//! meshfree-stencil: boundary-aware nearest-neighbor stencils.
//!
//! Mesh-free (RBF) solvers approximate derivatives over local stencils --
//! per-node sets of nearest-neighbor indices. In domains with walls, a
//! stencil must never "see through" the boundary: a neighbor whose
//! connecting segment crosses a wall is invalid, no matter how close it
//! is in plain Euclidean terms.
//!
//! The pipeline: [`stencil_network`] -> [`nearest`] ->
//! ([`boundary_aware_distance`] -> intersection oracle), with
//! [`is_connected`]/[`connectivity`] closing the loop when a stencil is
//! sized by connectivity target instead of by width.
//!
//! This crate has **no I/O** -- it operates on in-memory coordinate
//! slices and returns structured tables. All operations are pure; the
//! spatial index is rebuilt per search and discarded.

pub mod distance;
pub mod graph;
pub mod network;
pub mod search;
pub mod types;

pub use distance::boundary_aware_distance;
pub use graph::{connectivity, is_connected};
pub use network::{DEFAULT_STENCIL_SIZE, StencilSizing, stencil_network};
pub use search::nearest;
pub use types::{Neighborhood, Stencil, StencilError};

/// Re-export the boundary types so downstream crates can build walls
/// without depending on `meshfree-geometry` directly.
pub use meshfree_geometry::{Boundary, GeometryError, IntersectionCount};
