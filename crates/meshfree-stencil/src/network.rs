//! Stencil network construction: one stencil row per node, sized either
//! explicitly or by growing until a connectivity target is met.

use serde::{Deserialize, Serialize};

use meshfree_geometry::{Boundary, IntersectionCount};

use crate::graph::connectivity;
use crate::search::nearest;
use crate::types::{Stencil, StencilError};

/// Default stencil width when none is requested (capped at the node
/// count).
pub const DEFAULT_STENCIL_SIZE: usize = 10;

/// Selects how the stencil width is chosen.
///
/// Exactly one sizing mode is active per call, replacing the
/// "connectivity overrides size" optional-argument protocol with an
/// explicit choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StencilSizing {
    /// `min(DEFAULT_STENCIL_SIZE, node count)` neighbors per node.
    #[default]
    Auto,

    /// Exactly this many neighbors per node.
    Fixed(usize),

    /// The smallest width (starting at 2) whose stencil graph reaches
    /// this node connectivity.
    ///
    /// Computing connectivity is expensive past a few hundred nodes;
    /// prefer [`Fixed`](Self::Fixed) for large node sets.
    Connectivity(usize),
}

/// Build the stencil of nearest neighbors for every node.
///
/// The node set serves as both query and population, so each node's own
/// index appears in its row at distance 0 -- there is no explicit
/// self-exclusion, and a population with duplicate coordinates resolves
/// zero-distance ties by stable discovery order. Segments crossing
/// `boundary` are never spanned by a stencil entry.
///
/// In [`StencilSizing::Connectivity`] mode each candidate width is a
/// full independent rebuild: no state carries over between retries.
///
/// # Errors
///
/// - [`StencilError::NeighborCountExceedsPopulation`] if a fixed width
///   exceeds the node count.
/// - [`StencilError::NeighborsBlockedByBoundary`] if some node cannot
///   reach enough same-side neighbors.
/// - [`StencilError::ConnectivityUnreachable`] if the width would need
///   to exceed the node count to meet the connectivity target.
pub fn stencil_network<const D: usize>(
    nodes: &[[f64; D]],
    sizing: StencilSizing,
    boundary: Option<&Boundary<D>>,
) -> Result<Stencil, StencilError>
where
    [f64; D]: rstar::Point<Scalar = f64>,
    Boundary<D>: IntersectionCount<D>,
{
    match sizing {
        StencilSizing::Auto => {
            fixed_width(nodes, nodes.len().min(DEFAULT_STENCIL_SIZE), boundary)
        }
        StencilSizing::Fixed(width) => fixed_width(nodes, width, boundary),
        StencilSizing::Connectivity(target) => grow_to_connectivity(nodes, target, boundary),
    }
}

fn fixed_width<const D: usize>(
    nodes: &[[f64; D]],
    width: usize,
    boundary: Option<&Boundary<D>>,
) -> Result<Stencil, StencilError>
where
    [f64; D]: rstar::Point<Scalar = f64>,
    Boundary<D>: IntersectionCount<D>,
{
    Ok(nearest(nodes, nodes, width, boundary, None)?.into_stencil())
}

fn grow_to_connectivity<const D: usize>(
    nodes: &[[f64; D]],
    target: usize,
    boundary: Option<&Boundary<D>>,
) -> Result<Stencil, StencilError>
where
    [f64; D]: rstar::Point<Scalar = f64>,
    Boundary<D>: IntersectionCount<D>,
{
    let mut width = 2;
    let mut stencil = fixed_width(nodes, width, boundary)?;
    while connectivity(&stencil) < target {
        width += 1;
        if width > nodes.len() {
            return Err(StencilError::ConnectivityUnreachable {
                target,
                node_count: nodes.len(),
            });
        }
        stencil = fixed_width(nodes, width, boundary)?;
    }
    Ok(stencil)
}
