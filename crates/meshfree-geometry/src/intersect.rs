//! Segment-crossing counts against a boundary.
//!
//! This is the intersection oracle consumed by the stencil search: given a
//! batch of segment endpoint pairs, report how many boundary simplices each
//! segment crosses. Count 0 means the segment stays on one side of every
//! wall.
//!
//! Touching a simplex at an endpoint or overlapping it collinearly counts
//! as a crossing, so stencils stay strictly one-sided. Zero-length query
//! segments never cross anything.

use geo::line_intersection::line_intersection;
use geo::{Coord, Line};

use crate::boundary::Boundary;

/// Tolerance for the 3-D parametric segment-triangle test.
const EPS: f64 = 1e-12;

/// Batched segment-crossing counts against a boundary.
///
/// Implemented for [`Boundary<2>`] (segment walls) and [`Boundary<3>`]
/// (triangle walls). The stencil search is generic over this trait and
/// never sees the per-dimension intersection mathematics.
pub trait IntersectionCount<const D: usize> {
    /// Count boundary crossings for each `(from[k], to[k])` segment.
    ///
    /// Order-preserving: `counts[k]` belongs to the `k`-th input pair.
    /// The two slices are zipped positionally; surplus entries in the
    /// longer slice are ignored.
    fn intersection_count(&self, from: &[[f64; D]], to: &[[f64; D]]) -> Vec<usize>;
}

impl IntersectionCount<2> for Boundary<2> {
    fn intersection_count(&self, from: &[[f64; 2]], to: &[[f64; 2]]) -> Vec<usize> {
        from.iter()
            .zip(to)
            .map(|(&f, &t)| self.segment_crossings_2d(f, t))
            .collect()
    }
}

impl IntersectionCount<3> for Boundary<3> {
    fn intersection_count(&self, from: &[[f64; 3]], to: &[[f64; 3]]) -> Vec<usize> {
        from.iter()
            .zip(to)
            .map(|(&f, &t)| self.segment_crossings_3d(f, t))
            .collect()
    }
}

impl Boundary<2> {
    /// Count boundary edges crossed by one segment.
    fn segment_crossings_2d(&self, from: [f64; 2], to: [f64; 2]) -> usize {
        if from == to {
            return 0;
        }

        let query = Line::new(
            Coord {
                x: from[0],
                y: from[1],
            },
            Coord { x: to[0], y: to[1] },
        );

        self.simplices()
            .iter()
            .filter(|simplex| {
                let a = self.vertices()[simplex[0]];
                let b = self.vertices()[simplex[1]];
                let wall = Line::new(Coord { x: a[0], y: a[1] }, Coord { x: b[0], y: b[1] });
                // Any shared point counts: proper crossings, endpoint
                // touches, and collinear overlaps.
                line_intersection(query, wall).is_some()
            })
            .count()
    }
}

impl Boundary<3> {
    /// Count boundary triangles crossed by one segment.
    fn segment_crossings_3d(&self, from: [f64; 3], to: [f64; 3]) -> usize {
        if from == to {
            return 0;
        }

        self.simplices()
            .iter()
            .filter(|simplex| {
                let triangle = [
                    self.vertices()[simplex[0]],
                    self.vertices()[simplex[1]],
                    self.vertices()[simplex[2]],
                ];
                segment_hits_triangle(from, to, triangle)
            })
            .count()
    }
}

/// Parametric segment-triangle intersection (Moller-Trumbore).
///
/// The segment is `from + t * (to - from)` for `t` in `[0, 1]`; the hit
/// point must satisfy the barycentric bounds `u >= 0`, `v >= 0`,
/// `u + v <= 1`. Segments parallel to the triangle's plane (or degenerate
/// triangles, which make the determinant vanish) never count.
fn segment_hits_triangle(from: [f64; 3], to: [f64; 3], triangle: [[f64; 3]; 3]) -> bool {
    let dir = sub(to, from);
    let edge1 = sub(triangle[1], triangle[0]);
    let edge2 = sub(triangle[2], triangle[0]);

    let pvec = cross(dir, edge2);
    let det = dot(edge1, pvec);
    if det.abs() < EPS {
        return false;
    }

    let inv_det = 1.0 / det;
    let tvec = sub(from, triangle[0]);
    let u = dot(tvec, pvec) * inv_det;
    if u < -EPS || u > 1.0 + EPS {
        return false;
    }

    let qvec = cross(tvec, edge1);
    let v = dot(dir, qvec) * inv_det;
    if v < -EPS || u + v > 1.0 + EPS {
        return false;
    }

    let t = dot(edge2, qvec) * inv_det;
    (-EPS..=1.0 + EPS).contains(&t)
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1].mul_add(b[2], -(a[2] * b[1])),
        a[2].mul_add(b[0], -(a[0] * b[2])),
        a[0].mul_add(b[1], -(a[1] * b[0])),
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[2].mul_add(b[2], a[0].mul_add(b[0], a[1] * b[1]))
}
