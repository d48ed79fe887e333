//! Adaptive nearest-neighbor search with boundary and exclusion masking.
//!
//! The fast path is a plain batched k-nearest-neighbor query against an
//! R\*-tree. When a boundary or an exclusion set is active, each query
//! point is finalized independently: candidates whose connecting segment
//! crosses the boundary (or whose index is excluded) become infinitely
//! far, and the candidate set is widened -- re-querying the tree from
//! scratch at `n`, `2n`, `3n`, ... up to the population size -- until the
//! kept row is free of infinities or the population is exhausted.

use rstar::RTree;
use rstar::primitives::GeomWithData;

use meshfree_geometry::{Boundary, IntersectionCount};

use crate::distance::boundary_aware_distance;
use crate::types::{Neighborhood, Stencil, StencilError};

/// A population point tagged with its index, suitable for R\*-tree
/// insertion.
type IndexedPoint<const D: usize> = GeomWithData<[f64; D], usize>;

/// Find the `n` nearest valid neighbors within `population` for each
/// query point.
///
/// Two points whose connecting segment crosses `boundary` are treated as
/// infinitely far apart; indices in `excluding` are never returned.
/// Rows come back sorted ascending by boundary-aware distance, shape
/// exactly `(query.len(), n)`.
///
/// A population point coincident with a query point is returned at
/// distance 0 (never treated as boundary-crossing). Exclusion indices
/// outside the population range are ignored -- they can never be
/// returned anyway.
///
/// Note: a query point lying exactly on the boundary is infinitely far
/// from every other point and fails once the widening loop exhausts the
/// population.
///
/// # Errors
///
/// - [`StencilError::NeighborCountExceedsPopulation`] if
///   `n > population.len()`.
/// - [`StencilError::NeighborsBlockedByBoundary`] if the widening search
///   exhausts the whole population while some required neighbor still
///   crosses the boundary or is excluded.
pub fn nearest<const D: usize>(
    query: &[[f64; D]],
    population: &[[f64; D]],
    n: usize,
    boundary: Option<&Boundary<D>>,
    excluding: Option<&[usize]>,
) -> Result<Neighborhood, StencilError>
where
    [f64; D]: rstar::Point<Scalar = f64>,
    Boundary<D>: IntersectionCount<D>,
{
    if n > population.len() {
        return Err(StencilError::NeighborCountExceedsPopulation {
            requested: n,
            population: population.len(),
        });
    }

    // A zero-sized request never touches the spatial index.
    if n == 0 {
        return Ok(Neighborhood::empty(query.len()));
    }

    let tree = RTree::bulk_load(
        population
            .iter()
            .enumerate()
            .map(|(index, &point)| IndexedPoint::new(point, index))
            .collect(),
    );

    // Batched k-NN: rows arrive sorted ascending by distance.
    let mut indices = Vec::with_capacity(query.len() * n);
    let mut distances = Vec::with_capacity(query.len() * n);
    for q in query {
        for (item, distance_2) in tree.nearest_neighbor_iter_with_distance_2(q).take(n) {
            indices.push(item.data);
            distances.push(distance_2.sqrt());
        }
    }

    // Fast path: the raw k-NN result is the answer.
    if boundary.is_none() && excluding.is_none() {
        let stencil = Stencil::from_flat(query.len(), n, indices);
        return Ok(Neighborhood::from_parts(stencil, distances));
    }

    let mut excluded = vec![false; population.len()];
    for &index in excluding.unwrap_or_default() {
        if let Some(flag) = excluded.get_mut(index) {
            *flag = true;
        }
    }

    // Slow path: finalize each query row independently.
    for (i, &q) in query.iter().enumerate() {
        let row = i * n;
        let mut row_indices = indices[row..row + n].to_vec();
        let mut row_distances = masked_distances(q, &row_indices, population, boundary, &excluded);

        let mut query_size = n;
        while row_distances.iter().any(|d| d.is_infinite()) {
            if query_size == population.len() {
                // The whole population is in view and the row still has
                // unreachable entries: terminal.
                return Err(StencilError::NeighborsBlockedByBoundary {
                    requested: n,
                    point: q.to_vec(),
                });
            }
            query_size = (query_size + n).min(population.len());

            // Each round re-queries and re-masks from scratch.
            let candidates: Vec<usize> = tree
                .nearest_neighbor_iter(&q)
                .take(query_size)
                .map(|item| item.data)
                .collect();
            let candidate_distances =
                masked_distances(q, &candidates, population, boundary, &excluded);

            // Stable ascending sort, then keep the closest n. Ties keep
            // the tree's discovery order.
            let mut order: Vec<usize> = (0..candidates.len()).collect();
            order.sort_by(|&a, &b| candidate_distances[a].total_cmp(&candidate_distances[b]));
            row_indices = order.iter().take(n).map(|&k| candidates[k]).collect();
            row_distances = order.iter().take(n).map(|&k| candidate_distances[k]).collect();
        }

        indices[row..row + n].copy_from_slice(&row_indices);
        distances[row..row + n].copy_from_slice(&row_distances);
    }

    let stencil = Stencil::from_flat(query.len(), n, indices);
    Ok(Neighborhood::from_parts(stencil, distances))
}

/// Boundary-aware distances from `test` to the indexed candidates, with
/// excluded indices forced to infinity.
fn masked_distances<const D: usize>(
    test: [f64; D],
    candidate_indices: &[usize],
    population: &[[f64; D]],
    boundary: Option<&Boundary<D>>,
    excluded: &[bool],
) -> Vec<f64>
where
    Boundary<D>: IntersectionCount<D>,
{
    let candidates: Vec<[f64; D]> = candidate_indices
        .iter()
        .map(|&index| population[index])
        .collect();
    let mut distances = boundary_aware_distance(test, &candidates, boundary);
    for (distance, &index) in distances.iter_mut().zip(candidate_indices) {
        if excluded[index] {
            *distance = f64::INFINITY;
        }
    }
    distances
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::distance::euclidean;

    /// Brute-force reference: indices of the `n` closest population
    /// points, stable ascending by distance.
    fn brute_force<const D: usize>(
        q: [f64; D],
        population: &[[f64; D]],
        n: usize,
    ) -> Vec<usize> {
        let mut order: Vec<usize> = (0..population.len()).collect();
        order.sort_by(|&a, &b| {
            euclidean(q, population[a]).total_cmp(&euclidean(q, population[b]))
        });
        order.truncate(n);
        order
    }

    /// A deterministic scattering of 2-D points with distinct pairwise
    /// distances (no RNG needed).
    fn scattered_points(count: usize) -> Vec<[f64; 2]> {
        (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64;
                [t.mul_add(0.7, (t * 1.3).sin()), (t * 0.9).cos() * 2.0 + t * 0.1]
            })
            .collect()
    }

    #[test]
    fn matches_brute_force_without_boundary() {
        let population = scattered_points(40);
        let query = scattered_points(11);
        let result = nearest(&query, &population, 5, None, None).unwrap();

        for (i, &q) in query.iter().enumerate() {
            let expected = brute_force(q, &population, 5);
            assert_eq!(
                result.stencil().row(i),
                expected.as_slice(),
                "row {i} disagrees with brute force",
            );
        }
    }

    #[test]
    fn rows_sorted_ascending() {
        let population = scattered_points(30);
        let query = scattered_points(7);
        let result = nearest(&query, &population, 6, None, None).unwrap();

        for i in 0..query.len() {
            let row = result.distance_row(i);
            assert!(
                row.windows(2).all(|w| w[0] <= w[1]),
                "row {i} not ascending: {row:?}",
            );
        }
    }

    #[test]
    fn zero_neighbors_returns_empty_rows() {
        let population = scattered_points(5);
        let result = nearest(&population, &population, 0, None, None).unwrap();
        assert_eq!(result.stencil().node_count(), 5);
        assert_eq!(result.stencil().width(), 0);
    }

    #[test]
    fn zero_neighbors_from_empty_population() {
        // Must not build a spatial index over nothing.
        let query = [[0.0, 0.0]];
        let result = nearest(&query, &[], 0, None, None).unwrap();
        assert_eq!(result.stencil().node_count(), 1);
        assert_eq!(result.stencil().width(), 0);
    }

    #[test]
    fn too_many_neighbors_is_an_error() {
        let population = scattered_points(4);
        let result = nearest(&population, &population, 5, None, None);
        assert!(matches!(
            result,
            Err(StencilError::NeighborCountExceedsPopulation {
                requested: 5,
                population: 4,
            })
        ));
    }

    #[test]
    fn self_is_first_neighbor() {
        let population = scattered_points(12);
        let result = nearest(&population, &population, 3, None, None).unwrap();
        for i in 0..population.len() {
            assert_eq!(result.stencil().row(i)[0], i);
            assert_eq!(result.distance_row(i)[0], 0.0);
        }
    }

    #[test]
    fn excluded_indices_never_appear() {
        let population = scattered_points(20);
        let excluding = [0, 3, 7, 11, 19];
        let result = nearest(&population, &population, 4, None, Some(&excluding)).unwrap();

        for i in 0..population.len() {
            for &neighbor in result.stencil().row(i) {
                assert!(
                    !excluding.contains(&neighbor),
                    "excluded index {neighbor} returned for query {i}",
                );
            }
        }
    }

    #[test]
    fn exclusion_forces_widening() {
        // Five collinear points; querying from the left end with the
        // nearest two excluded must widen out to the far points.
        let population = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let query = [[0.0, 0.0]];
        let result = nearest(&query, &population, 2, None, Some(&[1, 2])).unwrap();
        assert_eq!(result.stencil().row(0), &[0, 3]);
    }

    #[test]
    fn out_of_range_exclusions_are_ignored() {
        let population = scattered_points(6);
        let result = nearest(&population, &population, 2, None, Some(&[100, 200])).unwrap();
        assert_eq!(result.stencil().node_count(), 6);
    }

    #[test]
    fn excluding_too_much_is_terminal() {
        // Three points, two neighbors wanted, two points excluded: even
        // the full population cannot satisfy the request.
        let population = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
        let query = [[0.0, 0.0]];
        let result = nearest(&query, &population, 2, None, Some(&[1, 2]));
        assert!(matches!(
            result,
            Err(StencilError::NeighborsBlockedByBoundary { requested: 2, .. })
        ));
    }

    #[test]
    fn wall_reroutes_neighbors() {
        // Two clusters separated by a vertical wall. For the points
        // flanking the wall the nearest Euclidean neighbor sits across
        // it, but every crossing segment is infinite, so neighbors come
        // from the same side.
        let population = [
            [0.9, 0.0],
            [0.1, 0.0],
            [0.0, 0.5],
            [1.1, 0.0],
            [1.9, 0.0],
            [2.0, 0.5],
        ];
        let wall =
            Boundary::new(vec![[1.0, -10.0], [1.0, 10.0]], vec![[0, 1]]).unwrap();
        let result = nearest(&population, &population, 3, Some(&wall), None).unwrap();

        for i in 0..population.len() {
            let same_side = usize::from(i >= 3) * 3;
            for &neighbor in result.stencil().row(i) {
                assert!(
                    (same_side..same_side + 3).contains(&neighbor),
                    "query {i} crossed the wall to reach {neighbor}",
                );
            }
        }
    }

    #[test]
    fn wall_makes_request_unsatisfiable() {
        // Three points on the left of the wall, one on the right. The
        // right-hand point cannot find 2 neighbors on its own side.
        let population = [[0.0, 0.0], [0.1, 0.2], [0.2, 0.0], [5.0, 0.0]];
        let wall =
            Boundary::new(vec![[2.0, -10.0], [2.0, 10.0]], vec![[0, 1]]).unwrap();
        let err = nearest(&population, &population, 2, Some(&wall), None).unwrap_err();

        assert!(
            matches!(
                &err,
                StencilError::NeighborsBlockedByBoundary { requested: 2, point }
                    if point == &[5.0, 0.0]
            ),
            "expected NeighborsBlockedByBoundary for the walled-off point, got {err:?}",
        );
    }

    #[test]
    fn widening_keeps_distances_ascending() {
        // Wall between the query's nearest Euclidean neighbors forces a
        // widened, re-sorted row; it must still come back ascending and
        // finite.
        let population = [
            [0.0, 0.0],
            [0.9, 0.0],
            [1.1, 0.0],
            [-0.5, 0.0],
            [-1.0, 0.0],
            [-1.5, 0.0],
        ];
        let wall = Boundary::new(vec![[1.0, -1.0], [1.0, 1.0]], vec![[0, 1]]).unwrap();
        let query = [[0.0, 0.0]];
        let result = nearest(&query, &population, 4, Some(&wall), None).unwrap();

        let row = result.distance_row(0);
        assert!(row.iter().all(|d| d.is_finite()));
        assert!(row.windows(2).all(|w| w[0] <= w[1]));
        // The across-wall point at x = 1.1 must be absent.
        assert!(!result.stencil().row(0).contains(&2));
    }

    #[test]
    fn single_neighbor_rows() {
        let population = scattered_points(8);
        let result = nearest(&population, &population, 1, None, None).unwrap();
        for i in 0..population.len() {
            assert_eq!(result.stencil().row(i), &[i]);
        }
    }

    #[test]
    fn duplicate_coordinates_resolve_by_discovery_order() {
        // Two coincident points: both sit at distance 0 from either
        // query; the row is the stable zero-distance pair.
        let population = [[1.0, 1.0], [1.0, 1.0], [5.0, 5.0]];
        let query = [[1.0, 1.0]];
        let result = nearest(&query, &population, 2, None, None).unwrap();
        let row = result.stencil().row(0);
        assert!(row.contains(&0) && row.contains(&1), "row = {row:?}");
    }

    #[test]
    fn three_dimensional_search() {
        let population: Vec<[f64; 3]> = (0..10)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64;
                [t, (t * 0.5).sin(), (t * 0.3).cos()]
            })
            .collect();
        let result = nearest(&population, &population, 2, None, None).unwrap();
        for i in 0..population.len() {
            assert_eq!(result.stencil().row(i)[0], i);
        }
    }
}
