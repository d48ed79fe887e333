//! meshfree-geometry: boundary representation and segment-crossing tests.
//!
//! Mesh-free solvers constrain neighbor stencils with piecewise-linear
//! boundaries: a stencil edge is invalid if the straight segment between
//! the two nodes crosses a wall. This crate provides the [`Boundary`]
//! data type (vertices + simplex connectivity) and the batched
//! [`IntersectionCount`] oracle the stencil search queries.
//!
//! The crate has **no I/O** -- it operates on in-memory coordinate slices
//! and returns counts. 2-D boundaries are made of edge segments, 3-D
//! boundaries of triangles.

pub mod boundary;
pub mod intersect;

pub use boundary::{Boundary, GeometryError};
pub use intersect::IntersectionCount;
