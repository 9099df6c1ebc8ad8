//! Merged cut lines between adjacent parts.
//!
//! Two edges from different parts can be cut in one pass when they run in
//! opposite directions along (nearly) the same line. The merged length is
//! the overlap of their projections.

use crate::geometry::{Bounds, Point};

/// Anti-parallel tolerance on the dot product of unit directions.
const ANGLE_TOLERANCE: f64 = 1e-3;

/// Overlaps shorter than this are ignored.
const MIN_OVERLAP: f64 = 1e-6;

/// One shared stretch between edge `edge_a` of ring `ring_a` and edge
/// `edge_b` of ring `ring_b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedEdge {
    pub ring_a: usize,
    pub edge_a: usize,
    pub ring_b: usize,
    pub edge_b: usize,
    pub length: f64,
}

/// Every shared stretch between distinct rings within `max_distance`.
pub fn merged_edges(rings: &[Vec<Point>], max_distance: f64) -> Vec<MergedEdge> {
    let bounds: Vec<Option<Bounds>> = rings
        .iter()
        .map(|r| Bounds::from_points(r.iter().copied()))
        .collect();

    let mut found = Vec::new();
    for i in 0..rings.len() {
        for j in (i + 1)..rings.len() {
            let (Some(a), Some(b)) = (bounds[i], bounds[j]) else {
                continue;
            };
            if !near(&a, &b, max_distance) {
                continue;
            }
            edges_between(i, &rings[i], j, &rings[j], max_distance, &mut found);
        }
    }
    found
}

/// Total merged length between distinct rings.
pub fn merged_length(rings: &[Vec<Point>], max_distance: f64) -> f64 {
    merged_edges(rings, max_distance).iter().map(|e| e.length).sum()
}

fn near(a: &Bounds, b: &Bounds, distance: f64) -> bool {
    a.x - distance <= b.max_x()
        && a.max_x() + distance >= b.x
        && a.y - distance <= b.max_y()
        && a.max_y() + distance >= b.y
}

fn edges_between(
    ring_a: usize,
    a: &[Point],
    ring_b: usize,
    b: &[Point],
    max_distance: f64,
    out: &mut Vec<MergedEdge>,
) {
    let (na, nb) = (a.len(), b.len());
    for i in 0..na {
        let (a0, a1) = (a[i], a[(i + 1) % na]);
        let len_a = a0.distance(a1);
        if len_a < 1e-12 {
            continue;
        }
        let dir_a = (a1 - a0) * (1.0 / len_a);

        for j in 0..nb {
            let (b0, b1) = (b[j], b[(j + 1) % nb]);
            let len_b = b0.distance(b1);
            if len_b < 1e-12 {
                continue;
            }
            let dir_b = (b1 - b0) * (1.0 / len_b);

            if dir_a.dot(dir_b) > -1.0 + ANGLE_TOLERANCE {
                continue;
            }
            // Both endpoints of b close to a's line.
            if (b0 - a0).cross(dir_a).abs() > max_distance || (b1 - a0).cross(dir_a).abs() > max_distance {
                continue;
            }

            let t0 = (b0 - a0).dot(dir_a);
            let t1 = (b1 - a0).dot(dir_a);
            let overlap = t0.max(t1).min(len_a) - t0.min(t1).max(0.0);
            if overlap > MIN_OVERLAP {
                out.push(MergedEdge {
                    ring_a,
                    edge_a: i,
                    ring_b,
                    edge_b: j,
                    length: overlap,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ]
    }

    #[test]
    fn test_touching_rectangles_share_an_edge() {
        let rings = vec![rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 0.0, 10.0, 10.0)];
        let edges = merged_edges(&rings, 0.01);
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].ring_a, edges[0].ring_b), (0, 1));
        assert_relative_eq!(edges[0].length, 10.0);
    }

    #[test]
    fn test_partial_overlap_within_gap() {
        let rings = vec![rect(0.0, 0.0, 10.0, 10.0), rect(10.2, 4.0, 10.0, 10.0)];
        assert_relative_eq!(merged_length(&rings, 0.5), 6.0, epsilon = 1e-9);
        assert_eq!(merged_length(&rings, 0.1), 0.0);
    }

    #[test]
    fn test_corner_contact_is_not_merged() {
        let rings = vec![rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 10.0, 10.0, 10.0)];
        assert_eq!(merged_length(&rings, 0.01), 0.0);
    }

    #[test]
    fn test_distant_and_empty() {
        let rings = vec![rect(0.0, 0.0, 1.0, 1.0), rect(50.0, 0.0, 1.0, 1.0)];
        assert!(merged_edges(&rings, 0.5).is_empty());
        assert_eq!(merged_length(&[], 0.5), 0.0);
    }
}
