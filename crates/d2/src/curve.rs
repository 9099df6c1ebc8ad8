//! Curve linearization.
//!
//! Curves are flattened lazily: [`Curve::linearize`] returns an iterator that
//! subdivides on demand with an explicit stack, yielding the start point and
//! then the end point of every piece that passes the flatness test.

use crate::geometry::Point;
use crate::util::within_distance;
use std::iter::FusedIterator;

/// Subdivision depth at which a piece is accepted regardless of flatness.
const MAX_DEPTH: u32 = 24;

/// A curve that can be split in half and tested for flatness.
pub trait Curve: Copy {
    fn start(&self) -> Point;

    fn end(&self) -> Point;

    /// True if a straight chord approximates the curve within `tolerance`.
    fn is_flat(&self, tolerance: f64) -> bool;

    /// Splits the curve at its parametric midpoint.
    fn split(&self) -> (Self, Self);

    /// True if the curve has no extent (a single point).
    fn is_degenerate(&self) -> bool;

    /// Lazily approximates the curve by a polyline.
    fn linearize(self, tolerance: f64) -> Linearize<Self> {
        Linearize::new(self, tolerance)
    }
}

/// Iterator over the vertices of a linearized curve.
///
/// Consecutive duplicate points are skipped, so degenerate curves yield a
/// single point and straight ones yield their two endpoints.
#[derive(Debug, Clone)]
pub struct Linearize<C> {
    stack: Vec<(C, u32)>,
    tolerance: f64,
    start: Option<Point>,
    last: Option<Point>,
}

impl<C: Curve> Linearize<C> {
    fn new(curve: C, tolerance: f64) -> Self {
        let tolerance = if tolerance.is_finite() && tolerance > 0.0 {
            tolerance
        } else {
            f64::EPSILON
        };
        let stack = if curve.is_degenerate() {
            Vec::new()
        } else {
            vec![(curve, 0)]
        };
        Self {
            stack,
            tolerance,
            start: Some(curve.start()),
            last: None,
        }
    }
}

impl<C: Curve> Iterator for Linearize<C> {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if let Some(start) = self.start.take() {
            self.last = Some(start);
            return Some(start);
        }
        while let Some((curve, depth)) = self.stack.pop() {
            if depth >= MAX_DEPTH || curve.is_flat(self.tolerance) {
                let end = curve.end();
                if self.last == Some(end) {
                    continue;
                }
                self.last = Some(end);
                return Some(end);
            }
            let (first, second) = curve.split();
            self.stack.push((second, depth + 1));
            self.stack.push((first, depth + 1));
        }
        None
    }
}

impl<C: Curve> FusedIterator for Linearize<C> {}

/// Quadratic Bezier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticBezier {
    pub p1: Point,
    pub control: Point,
    pub p2: Point,
}

impl QuadraticBezier {
    pub fn new(p1: Point, control: Point, p2: Point) -> Self {
        Self { p1, control, p2 }
    }
}

impl Curve for QuadraticBezier {
    fn start(&self) -> Point {
        self.p1
    }

    fn end(&self) -> Point {
        self.p2
    }

    fn is_flat(&self, tolerance: f64) -> bool {
        let u = self.control * 2.0 - self.p1 - self.p2;
        u.length_squared() <= 4.0 * tolerance * tolerance
    }

    fn split(&self) -> (Self, Self) {
        let m1 = (self.p1 + self.control) * 0.5;
        let m2 = (self.control + self.p2) * 0.5;
        let mid = (m1 + m2) * 0.5;
        (Self::new(self.p1, m1, mid), Self::new(mid, m2, self.p2))
    }

    fn is_degenerate(&self) -> bool {
        self.p1 == self.control && self.control == self.p2
    }
}

/// Cubic Bezier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p1: Point,
    pub c1: Point,
    pub c2: Point,
    pub p2: Point,
}

impl CubicBezier {
    pub fn new(p1: Point, c1: Point, c2: Point, p2: Point) -> Self {
        Self { p1, c1, c2, p2 }
    }
}

impl Curve for CubicBezier {
    fn start(&self) -> Point {
        self.p1
    }

    fn end(&self) -> Point {
        self.p2
    }

    fn is_flat(&self, tolerance: f64) -> bool {
        let u = self.c1 * 3.0 - self.p1 * 2.0 - self.p2;
        let v = self.c2 * 3.0 - self.p2 * 2.0 - self.p1;
        let ux = (u.x * u.x).max(v.x * v.x);
        let uy = (u.y * u.y).max(v.y * v.y);
        ux + uy <= 16.0 * tolerance * tolerance
    }

    fn split(&self) -> (Self, Self) {
        let m1 = (self.p1 + self.c1) * 0.5;
        let m2 = (self.c1 + self.c2) * 0.5;
        let m3 = (self.c2 + self.p2) * 0.5;
        let l2 = (m1 + m2) * 0.5;
        let r2 = (m2 + m3) * 0.5;
        let mid = (l2 + r2) * 0.5;
        (
            Self::new(self.p1, m1, l2, mid),
            Self::new(mid, r2, m3, self.p2),
        )
    }

    fn is_degenerate(&self) -> bool {
        self.p1 == self.c1 && self.c1 == self.c2 && self.c2 == self.p2
    }
}

/// Elliptical arc in center form. Angles are in degrees; a positive
/// `extent` runs towards increasing angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub center: Point,
    pub rx: f64,
    pub ry: f64,
    pub start_angle: f64,
    pub extent: f64,
    /// Rotation of the ellipse's x axis.
    pub rotation: f64,
}

impl Arc {
    pub fn new(center: Point, rx: f64, ry: f64, start_angle: f64, extent: f64, rotation: f64) -> Self {
        Self {
            center,
            rx: rx.abs(),
            ry: ry.abs(),
            start_angle,
            extent: extent.clamp(-360.0, 360.0),
            rotation,
        }
    }

    /// Circular arc.
    pub fn circle(center: Point, radius: f64, start_angle: f64, extent: f64) -> Self {
        Self::new(center, radius, radius, start_angle, extent, 0.0)
    }

    /// Converts an SVG endpoint arc to center form.
    ///
    /// Returns `None` when the endpoints coincide or a radius is zero; the
    /// arc is then drawn as the straight segment `p1`-`p2`. Radii too small
    /// to span the endpoints are scaled up.
    pub fn from_svg(
        p1: Point,
        p2: Point,
        rx: f64,
        ry: f64,
        rotation: f64,
        large_arc: bool,
        sweep: bool,
    ) -> Option<Self> {
        let (mut rx, mut ry) = (rx.abs(), ry.abs());
        if p1 == p2 || rx == 0.0 || ry == 0.0 {
            return None;
        }

        let (sin, cos) = rotation.rem_euclid(360.0).to_radians().sin_cos();
        let half = (p1 - p2) * 0.5;
        let x1 = cos * half.x + sin * half.y;
        let y1 = -sin * half.x + cos * half.y;

        let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }

        let (rx2, ry2) = (rx * rx, ry * ry);
        let num = rx2 * ry2 - rx2 * y1 * y1 - ry2 * x1 * x1;
        let den = rx2 * y1 * y1 + ry2 * x1 * x1;
        let sign = if large_arc != sweep { 1.0 } else { -1.0 };
        let coef = sign * (num / den).max(0.0).sqrt();
        let cx1 = coef * (rx * y1 / ry);
        let cy1 = coef * -(ry * x1 / rx);

        let mid = (p1 + p2) * 0.5;
        let center = Point::new(mid.x + cos * cx1 - sin * cy1, mid.y + sin * cx1 + cos * cy1);

        let u = Point::new((x1 - cx1) / rx, (y1 - cy1) / ry);
        let v = Point::new((-x1 - cx1) / rx, (-y1 - cy1) / ry);
        let start_angle = u.y.atan2(u.x).to_degrees();
        let mut extent = u.cross(v).atan2(u.dot(v)).to_degrees();
        if !sweep && extent > 0.0 {
            extent -= 360.0;
        } else if sweep && extent < 0.0 {
            extent += 360.0;
        }

        Some(Self::new(center, rx, ry, start_angle, extent, rotation))
    }

    /// Point on the ellipse at `angle` degrees.
    pub fn point_at(&self, angle: f64) -> Point {
        let (sin_t, cos_t) = angle.to_radians().sin_cos();
        let (sin_r, cos_r) = self.rotation.to_radians().sin_cos();
        let x = self.rx * cos_t;
        let y = self.ry * sin_t;
        Point::new(
            self.center.x + x * cos_r - y * sin_r,
            self.center.y + x * sin_r + y * cos_r,
        )
    }

    fn with_span(&self, start_angle: f64, extent: f64) -> Self {
        Self {
            start_angle,
            extent,
            ..*self
        }
    }
}

impl Curve for Arc {
    fn start(&self) -> Point {
        self.point_at(self.start_angle)
    }

    fn end(&self) -> Point {
        self.point_at(self.start_angle + self.extent)
    }

    /// Compares the chord midpoint with the arc midpoint.
    fn is_flat(&self, tolerance: f64) -> bool {
        let chord_mid = (self.start() + self.end()) * 0.5;
        let arc_mid = self.point_at(self.start_angle + 0.5 * self.extent);
        within_distance(chord_mid, arc_mid, tolerance)
    }

    fn split(&self) -> (Self, Self) {
        let half = 0.5 * self.extent;
        (
            self.with_span(self.start_angle, half),
            self.with_span(self.start_angle + half, half),
        )
    }

    fn is_degenerate(&self) -> bool {
        (self.rx == 0.0 && self.ry == 0.0) || self.extent == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_endpoints_and_bounds() {
        let curve = QuadraticBezier::new(Point::new(0.0, 0.0), Point::new(5.0, 10.0), Point::new(10.0, 0.0));
        let points: Vec<Point> = curve.linearize(0.1).collect();
        assert!(points.len() > 4);
        assert_eq!(points[0], Point::new(0.0, 0.0));
        assert_eq!(*points.last().unwrap(), Point::new(10.0, 0.0));
        // The curve peaks at half the control height.
        assert!(points.iter().all(|p| p.y >= 0.0 && p.y <= 5.0 + 1e-9));
    }

    #[test]
    fn test_straight_quadratic_yields_two_points() {
        let curve = QuadraticBezier::new(Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0));
        let points: Vec<Point> = curve.linearize(0.1).collect();
        assert_eq!(points, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    }

    #[test]
    fn test_degenerate_curves_collapse() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(QuadraticBezier::new(p, p, p).linearize(0.1).count(), 1);
        assert_eq!(CubicBezier::new(p, p, p, p).linearize(0.1).count(), 1);
        assert_eq!(Arc::circle(p, 0.0, 0.0, 180.0).linearize(0.1).count(), 1);
    }

    #[test]
    fn test_cubic_tighter_tolerance_gives_more_points() {
        let curve = CubicBezier::new(
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        );
        let coarse = curve.linearize(1.0).count();
        let fine = curve.linearize(0.01).count();
        assert!(fine > coarse);
        assert!(coarse >= 2);
    }

    #[test]
    fn test_iterator_is_lazy_and_fused() {
        let curve = CubicBezier::new(
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        );
        let mut iter = curve.linearize(0.01);
        assert_eq!(iter.next(), Some(Point::new(0.0, 0.0)));
        let rest = iter.by_ref().count();
        assert!(rest > 0);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_full_circle() {
        let arc = Arc::circle(Point::new(0.0, 0.0), 10.0, 0.0, 360.0);
        let points: Vec<Point> = arc.linearize(0.05).collect();
        assert!(points.len() > 16);
        for p in &points {
            assert_relative_eq!(p.length(), 10.0, epsilon = 1e-9);
        }
        assert_relative_eq!(points[0].x, points.last().unwrap().x, epsilon = 1e-9);
    }

    #[test]
    fn test_svg_semicircle() {
        let arc = Arc::from_svg(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            5.0,
            5.0,
            0.0,
            false,
            true,
        )
        .unwrap();
        assert_relative_eq!(arc.center.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(arc.center.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(arc.extent.abs(), 180.0, epsilon = 1e-9);

        let points: Vec<Point> = arc.linearize(0.1).collect();
        assert_relative_eq!(points[0].x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(points.last().unwrap().x, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_svg_degenerate_arcs() {
        let p = Point::new(1.0, 1.0);
        assert!(Arc::from_svg(p, p, 5.0, 5.0, 0.0, false, true).is_none());
        assert!(Arc::from_svg(p, Point::new(2.0, 2.0), 0.0, 5.0, 0.0, false, true).is_none());
    }

    #[test]
    fn test_svg_radii_scaled_up() {
        let arc = Arc::from_svg(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            1.0,
            1.0,
            0.0,
            false,
            false,
        )
        .unwrap();
        assert_relative_eq!(arc.rx, 5.0, epsilon = 1e-9);
    }
}
