//! Boundary-aware distance: Euclidean, forced to infinity across walls.

use meshfree_geometry::{Boundary, IntersectionCount};

/// Euclidean distance between two points.
pub(crate) fn euclidean<const D: usize>(a: [f64; D], b: [f64; D]) -> f64 {
    a.iter()
        .zip(&b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Distance from `test` to each candidate, with boundary crossings forced
/// to `f64::INFINITY`.
///
/// Candidates coincident with `test` (separation exactly zero) never
/// consult the oracle and keep distance 0 -- a zero-length segment crosses
/// nothing by convention. With no boundary (or an empty one) this is plain
/// Euclidean distance.
///
/// The oracle is queried once per call, with all nonzero-separation
/// segments batched.
#[must_use = "returns the boundary-aware distances"]
pub fn boundary_aware_distance<const D: usize>(
    test: [f64; D],
    candidates: &[[f64; D]],
    boundary: Option<&Boundary<D>>,
) -> Vec<f64>
where
    Boundary<D>: IntersectionCount<D>,
{
    let mut distances: Vec<f64> = candidates
        .iter()
        .map(|&candidate| euclidean(test, candidate))
        .collect();

    let Some(boundary) = boundary else {
        return distances;
    };
    if boundary.is_empty() {
        return distances;
    }

    // Batch the oracle query over all candidates with nonzero separation.
    let mut from = Vec::with_capacity(candidates.len());
    let mut to = Vec::with_capacity(candidates.len());
    let mut slots = Vec::with_capacity(candidates.len());
    for (slot, (&candidate, &distance)) in candidates.iter().zip(&distances).enumerate() {
        if distance != 0.0 {
            from.push(test);
            to.push(candidate);
            slots.push(slot);
        }
    }

    let counts = boundary.intersection_count(&from, &to);
    for (&slot, count) in slots.iter().zip(counts) {
        if count > 0 {
            distances[slot] = f64::INFINITY;
        }
    }

    distances
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plain_euclidean_without_boundary() {
        let distances = boundary_aware_distance([0.0, 0.0], &[[3.0, 4.0], [1.0, 0.0]], None);
        assert_eq!(distances, vec![5.0, 1.0]);
    }

    #[test]
    fn empty_boundary_skips_the_oracle() {
        let empty = Boundary::<2>::new(Vec::new(), Vec::new()).unwrap();
        let distances =
            boundary_aware_distance([0.0, 0.0], &[[3.0, 4.0]], Some(&empty));
        assert_eq!(distances, vec![5.0]);
    }

    #[test]
    fn wall_forces_infinite_distance() {
        let wall = Boundary::new(vec![[1.0, -1.0], [1.0, 1.0]], vec![[0, 1]]).unwrap();
        let distances = boundary_aware_distance(
            [0.0, 0.0],
            &[[2.0, 0.0], [0.5, 0.0]],
            Some(&wall),
        );
        assert!(distances[0].is_infinite());
        assert!((distances[1] - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn coincident_candidate_keeps_zero_distance() {
        // The test point sits on the wall itself; the zero-length segment
        // to its duplicate must still come back as 0, not infinity.
        let wall = Boundary::new(vec![[1.0, -1.0], [1.0, 1.0]], vec![[0, 1]]).unwrap();
        let distances = boundary_aware_distance(
            [1.0, 0.0],
            &[[1.0, 0.0], [2.0, 0.0]],
            Some(&wall),
        );
        assert_eq!(distances[0], 0.0);
    }

    #[test]
    fn mixed_batch_masks_only_crossing_segments() {
        let wall = Boundary::new(vec![[1.0, -1.0], [1.0, 1.0]], vec![[0, 1]]).unwrap();
        let candidates = [[0.5, 0.5], [2.0, 0.0], [0.0, 0.0], [3.0, 0.5]];
        let distances = boundary_aware_distance([0.0, 0.0], &candidates, Some(&wall));
        assert!(distances[0].is_finite());
        assert!(distances[1].is_infinite());
        assert_eq!(distances[2], 0.0);
        assert!(distances[3].is_infinite());
    }

    #[test]
    fn three_dimensional_wall() {
        // A large triangle in the z = 0 plane blocks the vertical segment.
        let wall = Boundary::new(
            vec![[-10.0, -10.0, 0.0], [10.0, -10.0, 0.0], [0.0, 10.0, 0.0]],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let distances = boundary_aware_distance(
            [0.0, 0.0, -1.0],
            &[[0.0, 0.0, 1.0], [1.0, 0.0, -1.0]],
            Some(&wall),
        );
        assert!(distances[0].is_infinite());
        assert!((distances[1] - 1.0).abs() < f64::EPSILON);
    }
}
