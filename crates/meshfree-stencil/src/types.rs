//! Shared types for stencil construction.

use serde::{Deserialize, Serialize};

/// A per-node table of neighbor indices.
///
/// One row per node, each row holding exactly `width` population indices
/// ordered by ascending boundary-aware distance. Rows are stored densely
/// in row-major order and are immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stencil {
    node_count: usize,
    width: usize,
    indices: Vec<usize>,
}

impl Stencil {
    /// Build a stencil from equal-length rows.
    ///
    /// Returns `None` if the rows differ in length.
    #[must_use]
    pub fn from_rows(rows: &[Vec<usize>]) -> Option<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }

        Some(Self {
            node_count: rows.len(),
            width,
            indices: rows.concat(),
        })
    }

    /// Internal constructor from a row-major buffer.
    ///
    /// Callers guarantee `indices.len() == node_count * width`.
    pub(crate) fn from_flat(node_count: usize, width: usize, indices: Vec<usize>) -> Self {
        debug_assert_eq!(indices.len(), node_count * width);
        Self {
            node_count,
            width,
            indices,
        }
    }

    /// Number of rows (one per node).
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Neighbors per row.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// The neighbor indices of one node, ascending by distance.
    ///
    /// Returns an empty slice for out-of-range rows or zero-width stencils.
    #[must_use]
    pub fn row(&self, node: usize) -> &[usize] {
        if node >= self.node_count || self.width == 0 {
            return &[];
        }
        &self.indices[node * self.width..(node + 1) * self.width]
    }

    /// Iterate over all rows in node order.
    pub fn rows(&self) -> impl Iterator<Item = &[usize]> {
        (0..self.node_count).map(|node| self.row(node))
    }

    /// The edge list view: every `(node, neighbor)` pair from every row.
    ///
    /// Undirected by convention; may contain duplicate or self edges if
    /// the stencil does. This is the input to connectivity analysis.
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::with_capacity(self.node_count * self.width);
        for (node, row) in self.rows().enumerate() {
            for &neighbor in row {
                edges.push((node, neighbor));
            }
        }
        edges
    }
}

/// Result of a nearest-neighbor search: the stencil plus the matching
/// boundary-aware distances, row-major with the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    stencil: Stencil,
    distances: Vec<f64>,
}

impl Neighborhood {
    pub(crate) const fn from_parts(stencil: Stencil, distances: Vec<f64>) -> Self {
        Self { stencil, distances }
    }

    /// A `(query_count, 0)` result: empty rows, no distances.
    pub(crate) fn empty(query_count: usize) -> Self {
        Self {
            stencil: Stencil::from_flat(query_count, 0, Vec::new()),
            distances: Vec::new(),
        }
    }

    /// The neighbor index table.
    #[must_use]
    pub const fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// Consume the search result, keeping only the neighbor table.
    #[must_use]
    pub fn into_stencil(self) -> Stencil {
        self.stencil
    }

    /// The distances matching [`Stencil::row`], ascending.
    ///
    /// Returns an empty slice for out-of-range rows or zero-width results.
    #[must_use]
    pub fn distance_row(&self, node: usize) -> &[f64] {
        let width = self.stencil.width();
        if node >= self.stencil.node_count() || width == 0 {
            return &[];
        }
        &self.distances[node * width..(node + 1) * width]
    }
}

/// Errors from stencil construction.
///
/// All variants are terminal at the point of detection: nothing is retried
/// beyond the documented widening loop, and no partial result is returned.
#[derive(Debug, thiserror::Error)]
pub enum StencilError {
    /// More neighbors were requested than the population holds.
    #[error("cannot find {requested} nearest neighbors among a population of {population} points")]
    NeighborCountExceedsPopulation {
        /// Requested neighbor count.
        requested: usize,
        /// Population size.
        population: usize,
    },

    /// The widening search exhausted the population while some required
    /// neighbor still crosses the boundary (or is excluded).
    #[error(
        "cannot find {requested} nearest neighbors for point {point:?} without crossing a boundary"
    )]
    NeighborsBlockedByBoundary {
        /// Requested neighbor count.
        requested: usize,
        /// Coordinates of the offending query point.
        point: Vec<f64>,
    },

    /// The stencil size would need to exceed the node count to reach the
    /// requested connectivity.
    #[error("cannot build a stencil with connectivity {target} from {node_count} nodes")]
    ConnectivityUnreachable {
        /// Requested connectivity.
        target: usize,
        /// Number of nodes available.
        node_count: usize,
    },
}
