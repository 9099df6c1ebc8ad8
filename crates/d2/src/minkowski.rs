//! Minkowski sums.
//!
//! Convex pairs are summed in O(n + m) by merging edge vectors sorted by
//! angle. Non-convex rings are triangulated by ear clipping, every triangle
//! pair is summed, and the partial sums are unioned.

use crate::boolean::Clipper;
use crate::geometry::{convex_hull_of, Point, Polygon};
use sheetnest_core::robust;
use std::f64::consts::PI;

/// Minkowski sum of two rings; holes are not considered.
pub fn minkowski_sum(a: &[Point], b: &[Point], clipper: &Clipper) -> Vec<Polygon> {
    if a.len() < 3 || b.len() < 3 {
        return Vec::new();
    }
    if is_convex(a) && is_convex(b) {
        return Polygon::new(convex_minkowski_sum(a, b))
            .map(|p| vec![p.ensure_orientation(true)])
            .unwrap_or_default();
    }

    let tri_a = triangulate(a);
    let tri_b = triangulate(b);
    let partial: Vec<Polygon> = tri_a
        .iter()
        .flat_map(|ta| tri_b.iter().map(move |tb| convex_minkowski_sum(ta, tb)))
        .filter_map(|ring| Polygon::new(ring).ok())
        .collect();

    if partial.is_empty() {
        let hull_a = convex_hull_of(a.iter().copied());
        let hull_b = convex_hull_of(b.iter().copied());
        return Polygon::new(convex_minkowski_sum(&hull_a, &hull_b))
            .map(|p| vec![p.ensure_orientation(true)])
            .unwrap_or_default();
    }
    clipper.union_all(&partial)
}

/// Conservative no-fit region: `hull(stationary) ⊕ -hull(orbiting)`.
///
/// Contains every translation at which the two rings can overlap.
pub fn hull_nfp(stationary: &[Point], orbiting: &[Point]) -> Option<Polygon> {
    let hull_a = convex_hull_of(stationary.iter().copied());
    let reflected: Vec<Point> = convex_hull_of(orbiting.iter().copied())
        .into_iter()
        .map(|p| -p)
        .collect();
    Polygon::new(convex_minkowski_sum(&hull_a, &reflected))
        .ok()
        .map(|p| p.ensure_orientation(true))
}

fn is_convex(ring: &[Point]) -> bool {
    let tuples: Vec<(f64, f64)> = ring.iter().map(|p| p.as_tuple()).collect();
    robust::is_convex(&tuples)
}

/// Sum of two convex rings (any orientation).
pub fn convex_minkowski_sum(a: &[Point], b: &[Point]) -> Vec<Point> {
    let a = ensure_ccw(a);
    let b = ensure_ccw(b);

    let edges_a = edge_vectors(&a);
    let edges_b = edge_vectors(&b);

    let start_a = bottom_left(&a);
    let start_b = bottom_left(&b);

    let mut result = Vec::with_capacity(a.len() + b.len());
    let mut current = a[start_a] + b[start_b];
    result.push(current);
    for edge in merge_edge_vectors(&edges_a, start_a, &edges_b, start_b) {
        current = current + edge;
        result.push(current);
    }

    if result.len() > 1 {
        let first = result[0];
        if let Some(&last) = result.last() {
            if first.almost_eq(last, 1e-10) {
                result.pop();
            }
        }
    }
    result
}

/// Ear-clipping triangulation of a simple ring. Convex rings are returned whole.
pub fn triangulate(ring: &[Point]) -> Vec<Vec<Point>> {
    if ring.len() < 3 {
        return Vec::new();
    }
    if is_convex(ring) {
        return vec![ring.to_vec()];
    }

    let mut vertices = ensure_ccw(ring);
    let mut triangles = Vec::new();

    while vertices.len() > 3 {
        let n = vertices.len();
        let ear = (0..n).find(|&i| is_ear(&vertices, (i + n - 1) % n, i, (i + 1) % n));
        let Some(i) = ear else {
            // Degenerate input: give up on exact decomposition.
            return vec![convex_hull_of(ring.iter().copied())];
        };
        let (prev, next) = ((i + n - 1) % n, (i + 1) % n);
        triangles.push(vec![vertices[prev], vertices[i], vertices[next]]);
        vertices.remove(i);
    }

    if vertices.len() == 3 {
        triangles.push(vertices);
    }
    triangles
}

fn is_ear(vertices: &[Point], prev: usize, curr: usize, next: usize) -> bool {
    let (a, b, c) = (vertices[prev], vertices[curr], vertices[next]);

    // Reflex or flat vertices are never ears of a counter-clockwise ring.
    if (b - a).cross(c - b) <= 0.0 {
        return false;
    }

    // A vertex touching the candidate diagonal blocks the ear too.
    !vertices.iter().enumerate().any(|(i, &p)| {
        i != prev
            && i != curr
            && i != next
            && p != a
            && p != b
            && p != c
            && touches_triangle(p, a, b, c)
    })
}

fn touches_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let o1 = robust::orient2d_filtered(a.as_tuple(), b.as_tuple(), p.as_tuple());
    let o2 = robust::orient2d_filtered(b.as_tuple(), c.as_tuple(), p.as_tuple());
    let o3 = robust::orient2d_filtered(c.as_tuple(), a.as_tuple(), p.as_tuple());
    let any_cw = o1.is_cw() || o2.is_cw() || o3.is_cw();
    let any_ccw = o1.is_ccw() || o2.is_ccw() || o3.is_ccw();
    !(any_cw && any_ccw)
}

fn ensure_ccw(ring: &[Point]) -> Vec<Point> {
    let tuples: Vec<(f64, f64)> = ring.iter().map(|p| p.as_tuple()).collect();
    if robust::signed_area(&tuples) < 0.0 {
        ring.iter().rev().copied().collect()
    } else {
        ring.to_vec()
    }
}

fn edge_vectors(ring: &[Point]) -> Vec<Point> {
    let n = ring.len();
    (0..n).map(|i| ring[(i + 1) % n] - ring[i]).collect()
}

fn bottom_left(ring: &[Point]) -> usize {
    let mut min_idx = 0;
    for (i, p) in ring.iter().enumerate() {
        let m = ring[min_idx];
        if p.y < m.y || (p.y == m.y && p.x < m.x) {
            min_idx = i;
        }
    }
    min_idx
}

fn edge_angle(v: Point) -> f64 {
    let angle = v.y.atan2(v.x);
    if angle < 0.0 {
        angle + 2.0 * PI
    } else {
        angle
    }
}

fn merge_edge_vectors(edges_a: &[Point], start_a: usize, edges_b: &[Point], start_b: usize) -> Vec<Point> {
    let (n_a, n_b) = (edges_a.len(), edges_b.len());
    let mut result = Vec::with_capacity(n_a + n_b);
    let (mut i_a, mut i_b) = (0, 0);

    while i_a < n_a || i_b < n_b {
        if i_a >= n_a {
            result.push(edges_b[(start_b + i_b) % n_b]);
            i_b += 1;
        } else if i_b >= n_b {
            result.push(edges_a[(start_a + i_a) % n_a]);
            i_a += 1;
        } else {
            let ea = edges_a[(start_a + i_a) % n_a];
            let eb = edges_b[(start_b + i_b) % n_b];
            let (angle_a, angle_b) = (edge_angle(ea), edge_angle(eb));
            if angle_a <= angle_b + 1e-10 {
                result.push(ea);
                i_a += 1;
            }
            if angle_b <= angle_a + 1e-10 {
                result.push(eb);
                i_b += 1;
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn test_convex_sum_of_squares() {
        let a = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let b = pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        let sum = Polygon::new(convex_minkowski_sum(&a, &b)).unwrap();
        assert_relative_eq!(sum.area().abs(), 9.0, epsilon = 1e-9);
        assert_eq!(sum.bounds().width, 3.0);
    }

    #[test]
    fn test_triangulate_l_shape() {
        let l = pts(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ]);
        let triangles = triangulate(&l);
        assert_eq!(triangles.len(), 4);
        let area: f64 = triangles
            .iter()
            .map(|t| Polygon::new(t.clone()).unwrap().area().abs())
            .sum();
        assert_relative_eq!(area, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_non_convex_sum() {
        let l = pts(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ]);
        let dot = pts(&[(0.0, 0.0), (0.1, 0.0), (0.1, 0.1), (0.0, 0.1)]);
        let result = minkowski_sum(&l, &dot, &Clipper::default());
        assert_eq!(result.len(), 1);
        let area = result[0].net_area();
        assert!(area > 3.0 && area < 3.6);
    }

    #[test]
    fn test_hull_nfp_contains_overlaps() {
        let a = pts(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let b = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let nfp = hull_nfp(&a, &b).unwrap();
        let bounds = nfp.bounds();
        assert_relative_eq!(bounds.x, -1.0);
        assert_relative_eq!(bounds.width, 5.0);
        assert!(nfp.is_clockwise());
    }
}
