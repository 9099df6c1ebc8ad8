//! Robust geometric predicates.
//!
//! Orientation tests built on Shewchuk's adaptive precision arithmetic
//! (the `robust` crate), with a cheap floating-point filter in front.
//! Points are plain `(x, y)` tuples so the predicates stay independent of
//! any polygon type.
//!
//! Orientation names refer to the mathematical frame (y axis up).
//!
//! ```rust
//! use sheetnest_core::robust::{orient2d, Orientation};
//!
//! assert_eq!(
//!     orient2d((0.0, 0.0), (1.0, 0.0), (0.5, 1.0)),
//!     Orientation::CounterClockwise
//! );
//! ```

use robust::{orient2d as robust_orient2d, Coord};

/// Result of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Left turn.
    CounterClockwise,
    /// Right turn.
    Clockwise,
    /// The three points are collinear.
    Collinear,
}

impl Orientation {
    #[inline]
    pub fn is_ccw(self) -> bool {
        matches!(self, Orientation::CounterClockwise)
    }

    #[inline]
    pub fn is_cw(self) -> bool {
        matches!(self, Orientation::Clockwise)
    }

    #[inline]
    pub fn is_collinear(self) -> bool {
        matches!(self, Orientation::Collinear)
    }
}

/// Exact orientation of `pc` relative to the directed line `pa -> pb`.
#[inline]
pub fn orient2d(pa: (f64, f64), pb: (f64, f64), pc: (f64, f64)) -> Orientation {
    let det = robust_orient2d(
        Coord { x: pa.0, y: pa.1 },
        Coord { x: pb.0, y: pb.1 },
        Coord { x: pc.0, y: pc.1 },
    );

    if det > 0.0 {
        Orientation::CounterClockwise
    } else if det < 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

const FILTER_EPSILON: f64 = 1e-12;

/// Fast orientation test; falls back to [`orient2d`] near degeneracy.
#[inline]
pub fn orient2d_filtered(pa: (f64, f64), pb: (f64, f64), pc: (f64, f64)) -> Orientation {
    let acx = pa.0 - pc.0;
    let bcx = pb.0 - pc.0;
    let acy = pa.1 - pc.1;
    let bcy = pb.1 - pc.1;

    let det = acx * bcy - acy * bcx;
    let det_sum = (acx * bcy).abs() + (acy * bcx).abs();

    if det.abs() > FILTER_EPSILON * det_sum {
        return if det > 0.0 {
            Orientation::CounterClockwise
        } else {
            Orientation::Clockwise
        };
    }

    orient2d(pa, pb, pc)
}

/// Checks if a point lies strictly inside a triangle (vertices in any order).
pub fn point_in_triangle(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let o1 = orient2d_filtered(a, b, p);
    let o2 = orient2d_filtered(b, c, p);
    let o3 = orient2d_filtered(c, a, p);

    (o1.is_ccw() && o2.is_ccw() && o3.is_ccw()) || (o1.is_cw() && o2.is_cw() && o3.is_cw())
}

/// Checks if a closed ring is convex. Collinear vertices are ignored.
pub fn is_convex(ring: &[(f64, f64)]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut expected: Option<Orientation> = None;
    for i in 0..n {
        let o = orient2d_filtered(ring[i], ring[(i + 1) % n], ring[(i + 2) % n]);
        if o.is_collinear() {
            continue;
        }
        match expected {
            None => expected = Some(o),
            Some(e) if e != o => return false,
            _ => {}
        }
    }

    true
}

/// Returns true if every point lies on one line (or there are fewer than 3).
pub fn all_collinear(points: &[(f64, f64)]) -> bool {
    let Some(&first) = points.first() else {
        return true;
    };
    let Some(&second) = points.iter().find(|&&p| p != first) else {
        return true;
    };

    points
        .iter()
        .all(|&p| orient2d(first, second, p).is_collinear())
}

/// Signed area of a ring in the mathematical frame (counter-clockwise positive).
///
/// Uses Kahan summation of the shoelace terms.
pub fn signed_area(ring: &[(f64, f64)]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut c = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let term = ring[i].0 * ring[j].1 - ring[j].0 * ring[i].1;
        let y = term - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }

    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_orient2d_basic() {
        assert_eq!(
            orient2d((0.0, 0.0), (1.0, 0.0), (0.5, 1.0)),
            Orientation::CounterClockwise
        );
        assert_eq!(
            orient2d((0.0, 0.0), (1.0, 0.0), (0.5, -1.0)),
            Orientation::Clockwise
        );
        assert_eq!(
            orient2d((0.0, 0.0), (1.0, 1.0), (2.0, 2.0)),
            Orientation::Collinear
        );
    }

    #[test]
    fn test_orient2d_near_degenerate() {
        // Differs from the line by far less than the filter threshold.
        let a = (0.0, 0.0);
        let b = (1.0, 1.0);
        let c = (0.5, 0.5 + 1e-17);
        assert_eq!(orient2d_filtered(a, b, c), orient2d(a, b, c));
    }

    #[test]
    fn test_point_in_triangle() {
        let (a, b, c) = ((0.0, 0.0), (4.0, 0.0), (0.0, 4.0));
        assert!(point_in_triangle((1.0, 1.0), a, b, c));
        assert!(point_in_triangle((1.0, 1.0), a, c, b));
        assert!(!point_in_triangle((2.0, 0.0), a, b, c));
        assert!(!point_in_triangle((5.0, 5.0), a, b, c));
    }

    #[test]
    fn test_is_convex() {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(is_convex(&square));

        let l_shape = [
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ];
        assert!(!is_convex(&l_shape));
    }

    #[test]
    fn test_all_collinear() {
        assert!(all_collinear(&[(0.0, 0.0), (1.0, 1.0), (3.0, 3.0)]));
        assert!(all_collinear(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]));
        assert!(!all_collinear(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]));
    }

    #[test]
    fn test_signed_area() {
        let ccw = [(0.0, 0.0), (2.0, 0.0), (2.0, 3.0), (0.0, 3.0)];
        assert_relative_eq!(signed_area(&ccw), 6.0);

        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert_relative_eq!(signed_area(&cw), -6.0);
    }
}
