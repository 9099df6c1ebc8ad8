//! Geometry primitives for NFP tracing and placement.
//!
//! Polygons are passed as vertex slices (an implicit closing edge joins the
//! last vertex to the first). Distances along a direction are signed: a
//! positive value means the moving shape has room to travel that far.

use crate::geometry::{Bounds, Point};
use sheetnest_core::robust::{self, Orientation};

/// Default tolerance for coordinate comparisons.
pub const TOLERANCE: f64 = 1e-9;

/// Result of a point-in-polygon test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointInPolygon {
    Inside,
    Outside,
    /// On an edge or vertex; neither inside nor outside.
    OnBoundary,
}

impl PointInPolygon {
    /// `Some(true)` inside, `Some(false)` outside, `None` on the boundary.
    pub fn as_option(self) -> Option<bool> {
        match self {
            PointInPolygon::Inside => Some(true),
            PointInPolygon::Outside => Some(false),
            PointInPolygon::OnBoundary => None,
        }
    }
}

#[inline]
pub fn almost_equal(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

#[inline]
fn approx(a: f64, b: f64) -> bool {
    almost_equal(a, b, TOLERANCE)
}

#[inline]
pub fn almost_equal_points(a: Point, b: Point, tolerance: f64) -> bool {
    a.almost_eq(b, tolerance)
}

/// True if the points are closer than `distance`.
#[inline]
pub fn within_distance(a: Point, b: Point, distance: f64) -> bool {
    (a - b).length_squared() < distance * distance
}

pub fn normalize_vector(v: Point) -> Point {
    let len_sq = v.length_squared();
    if approx(len_sq, 1.0) || len_sq == 0.0 {
        return v;
    }
    v * (1.0 / len_sq.sqrt())
}

/// Sine and cosine of an angle in degrees; exact for multiples of 90.
pub fn sin_cos_degrees(degrees: f64) -> (f64, f64) {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 {
        (0.0, 1.0)
    } else if normalized == 90.0 {
        (1.0, 0.0)
    } else if normalized == 180.0 {
        (0.0, -1.0)
    } else if normalized == 270.0 {
        (-1.0, 0.0)
    } else {
        normalized.to_radians().sin_cos()
    }
}

/// Rotates a vertex sequence about the origin.
pub fn rotate_polygon(points: &[Point], degrees: f64) -> Vec<Point> {
    let (sin, cos) = sin_cos_degrees(degrees);
    points
        .iter()
        .map(|p| Point::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos))
        .collect()
}

/// Signed area; negative for clockwise rings in the y-down frame.
pub fn polygon_area(points: &[Point]) -> f64 {
    let tuples: Vec<(f64, f64)> = points.iter().map(|p| p.as_tuple()).collect();
    -robust::signed_area(&tuples)
}

pub fn polygon_bounds(points: &[Point]) -> Option<Bounds> {
    Bounds::from_points(points.iter().copied())
}

/// True for an axis-aligned rectangle given as 4 points (5 with a closing duplicate).
pub fn is_rectangle(points: &[Point], tolerance: f64) -> bool {
    let n = if points.len() == 5 && points[0].almost_eq(points[4], tolerance) {
        4
    } else {
        points.len()
    };
    if n != 4 {
        return false;
    }
    let Some(bb) = polygon_bounds(points) else {
        return false;
    };
    if bb.width < tolerance || bb.height < tolerance {
        return false;
    }
    points[..n].iter().all(|p| {
        (almost_equal(p.x, bb.x, tolerance) || almost_equal(p.x, bb.max_x(), tolerance))
            && (almost_equal(p.y, bb.y, tolerance) || almost_equal(p.y, bb.max_y(), tolerance))
    })
}

/// Euclidean distance from `p` to the segment `a`-`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// True if `p` lies on segment `a`-`b`, excluding the endpoints.
pub fn on_segment(a: Point, b: Point, p: Point) -> bool {
    // vertical
    if approx(a.x, b.x) && approx(p.x, a.x) {
        return !approx(p.y, b.y)
            && !approx(p.y, a.y)
            && p.y < a.y.max(b.y)
            && p.y > a.y.min(b.y);
    }

    // horizontal
    if approx(a.y, b.y) && approx(p.y, a.y) {
        return !approx(p.x, b.x)
            && !approx(p.x, a.x)
            && p.x < a.x.max(b.x)
            && p.x > a.x.min(b.x);
    }

    if (p.x < a.x && p.x < b.x)
        || (p.x > a.x && p.x > b.x)
        || (p.y < a.y && p.y < b.y)
        || (p.y > a.y && p.y > b.y)
    {
        return false;
    }

    if (approx(p.x, a.x) && approx(p.y, a.y)) || (approx(p.x, b.x) && approx(p.y, b.y)) {
        return false;
    }

    let cross = (p.y - a.y) * (b.x - a.x) - (p.x - a.x) * (b.y - a.y);
    if cross.abs() > TOLERANCE {
        return false;
    }

    let dot = (p - a).dot(b - a);
    if dot < 0.0 || approx(dot, 0.0) {
        return false;
    }

    let len_sq = (b - a).length_squared();
    !(dot > len_sq || approx(dot, len_sq))
}

/// Intersection of segments `a`-`b` and `e`-`f`.
///
/// With `infinite` the segments are treated as lines. Parallel and collinear
/// inputs (overlapping or not) return `None`: collinear overlap is not
/// resolved to a point.
pub fn line_intersect(a: Point, b: Point, e: Point, f: Point, infinite: bool) -> Option<Point> {
    let a1 = b.y - a.y;
    let b1 = a.x - b.x;
    let c1 = b.x * a.y - a.x * b.y;
    let a2 = f.y - e.y;
    let b2 = e.x - f.x;
    let c2 = f.x * e.y - e.x * f.y;

    let denom = a1 * b2 - a2 * b1;
    if denom == 0.0 {
        return None;
    }
    let x = (b1 * c2 - b2 * c1) / denom;
    let y = (a2 * c1 - a1 * c2) / denom;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    if !infinite {
        let outside = |lo: f64, hi: f64, v: f64| {
            (lo - hi).abs() > TOLERANCE && if lo < hi { v < lo || v > hi } else { v > lo || v < hi }
        };
        if outside(a.x, b.x, x) || outside(a.y, b.y, y) || outside(e.x, f.x, x) || outside(e.y, f.y, y)
        {
            return None;
        }
    }

    Some(Point::new(x, y))
}

/// Even-odd containment test with an explicit boundary result.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> PointInPolygon {
    let n = polygon.len();
    if n < 3 {
        return PointInPolygon::Outside;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (polygon[i], polygon[j]);
        if approx(pi.x, point.x) && approx(pi.y, point.y) {
            return PointInPolygon::OnBoundary;
        }
        if on_segment(pi, pj, point) {
            return PointInPolygon::OnBoundary;
        }
        if !(approx(pi.x, pj.x) && approx(pi.y, pj.y)) {
            let crosses = (pi.y > point.y) != (pj.y > point.y)
                && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if crosses {
                inside = !inside;
            }
        }
        j = i;
    }
    if inside {
        PointInPolygon::Inside
    } else {
        PointInPolygon::Outside
    }
}

/// The chain of vertices of `polygon` that faces `normal` (the edge most
/// nearly perpendicular to it).
pub fn polygon_edge(polygon: &[Point], normal: Point) -> Option<Vec<Point>> {
    let n = polygon.len();
    if n < 3 {
        return None;
    }
    let normal = normalize_vector(normal);
    let direction = Point::new(-normal.y, normal.x);

    let dots: Vec<f64> = polygon.iter().map(|p| p.dot(direction)).collect();
    let min = dots.iter().copied().fold(f64::INFINITY, f64::min);
    let max = dots.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // Ties go to the vertex furthest along the normal.
    let mut index_min = 0;
    let mut index_max = 0;
    let mut normal_min: Option<f64> = None;
    let mut normal_max: Option<f64> = None;
    for (i, p) in polygon.iter().enumerate() {
        let along = p.dot(normal);
        if approx(dots[i], min) {
            if normal_min.map_or(true, |m| along > m) {
                normal_min = Some(along);
                index_min = i;
            }
        } else if approx(dots[i], max) && normal_max.map_or(true, |m| along > m) {
            normal_max = Some(along);
            index_max = i;
        }
    }

    let min_vertex = polygon[index_min];
    let left = polygon[(index_min + n - 1) % n] - min_vertex;
    let right = polygon[(index_min + 1) % n] - min_vertex;
    let dot_left = left.dot(direction);
    let dot_right = right.dot(direction);

    let step_forward = if approx(dot_left, 0.0) {
        true
    } else if approx(dot_right, 0.0) {
        false
    } else {
        let (normal_left, normal_right) = if approx(dot_left, dot_right) {
            (left.dot(normal), right.dot(normal))
        } else if dot_left < dot_right {
            (left.dot(normal), right.dot(normal) * (dot_left / dot_right))
        } else {
            (left.dot(normal) * (dot_right / dot_left), right.dot(normal))
        };
        normal_left <= normal_right
    };

    let mut edge = Vec::new();
    let mut i = index_min;
    for _ in 0..n {
        edge.push(polygon[i]);
        if i == index_max {
            break;
        }
        i = if step_forward { (i + 1) % n } else { (i + n - 1) % n };
    }
    Some(edge)
}

/// Distance from `p` to the line through `s1`-`s2` measured along `normal`.
///
/// Points whose projection falls on an endpoint count only when that
/// endpoint is inclusive. Returns `None` when the point misses the segment.
pub fn point_line_distance(
    p: Point,
    s1: Point,
    s2: Point,
    normal: Point,
    s1_inclusive: bool,
    s2_inclusive: bool,
) -> Option<f64> {
    let normal = normalize_vector(normal);
    let dir = Point::new(normal.y, -normal.x);

    let (p_dot, s1_dot, s2_dot) = (p.dot(dir), s1.dot(dir), s2.dot(dir));
    let (p_norm, s1_norm, s2_norm) = (p.dot(normal), s1.dot(normal), s2.dot(normal));

    if approx(p_dot, s1_dot) && approx(p_dot, s2_dot) {
        if approx(p_norm, s1_norm) || approx(p_norm, s2_norm) {
            return None;
        }
        if p_norm > s1_norm && p_norm > s2_norm {
            return Some((p_norm - s1_norm).min(p_norm - s2_norm));
        }
        if p_norm < s1_norm && p_norm < s2_norm {
            return Some(-(s1_norm - p_norm).min(s2_norm - p_norm));
        }
        let diff1 = p_norm - s1_norm;
        return Some(if diff1 > 0.0 { diff1 } else { p_norm - s2_norm });
    }
    if approx(p_dot, s1_dot) {
        return s1_inclusive.then_some(p_norm - s1_norm);
    }
    if approx(p_dot, s2_dot) {
        return s2_inclusive.then_some(p_norm - s2_norm);
    }
    if (p_dot < s1_dot && p_dot < s2_dot) || (p_dot > s1_dot && p_dot > s2_dot) {
        return None;
    }

    Some(p_norm - s1_norm + (s1_norm - s2_norm) * (s1_dot - p_dot) / (s1_dot - s2_dot))
}

/// Signed distance `p` must travel along `normal` to reach segment `s1`-`s2`.
///
/// Unless `infinite`, points projecting outside the segment (or exactly on
/// one of its endpoints) return `None`.
pub fn point_distance(p: Point, s1: Point, s2: Point, normal: Point, infinite: bool) -> Option<f64> {
    let normal = normalize_vector(normal);
    let dir = Point::new(normal.y, -normal.x);

    let (p_dot, s1_dot, s2_dot) = (p.dot(dir), s1.dot(dir), s2.dot(dir));
    let (p_norm, s1_norm, s2_norm) = (p.dot(normal), s1.dot(normal), s2.dot(normal));

    if !infinite {
        let le = |a: f64, b: f64| a < b || approx(a, b);
        let ge = |a: f64, b: f64| a > b || approx(a, b);
        if (le(p_dot, s1_dot) && le(p_dot, s2_dot)) || (ge(p_dot, s1_dot) && ge(p_dot, s2_dot)) {
            return None;
        }
        if approx(p_dot, s1_dot) && approx(p_dot, s2_dot) {
            if p_norm > s1_norm && p_norm > s2_norm {
                return Some((p_norm - s1_norm).min(p_norm - s2_norm));
            }
            if p_norm < s1_norm && p_norm < s2_norm {
                return Some(-(s1_norm - p_norm).min(s2_norm - p_norm));
            }
        }
    }

    let denom = s1_dot - s2_dot;
    if denom == 0.0 {
        return None;
    }
    Some(-(p_norm - s1_norm + (s1_norm - s2_norm) * (s1_dot - p_dot) / denom))
}

/// How far edge `e`-`f` can move along `direction` before touching edge
/// `a`-`b`. `None` if the edges never meet, or merely graze, on that path.
pub fn segment_distance(a: Point, b: Point, e: Point, f: Point, direction: Point) -> Option<f64> {
    let normal = Point::new(direction.y, -direction.x);
    let reverse = -direction;

    let (dot_a, dot_b, dot_e, dot_f) = (a.dot(normal), b.dot(normal), e.dot(normal), f.dot(normal));
    let (cross_a, cross_b, cross_e, cross_f) = (
        a.dot(direction),
        b.dot(direction),
        e.dot(direction),
        f.dot(direction),
    );

    let ab_min = dot_a.min(dot_b);
    let ab_max = dot_a.max(dot_b);
    let ef_min = dot_e.min(dot_f);
    let ef_max = dot_e.max(dot_f);

    // touching at a single point
    if approx(ab_max, ef_min) || approx(ab_min, ef_max) {
        return None;
    }
    if ab_max < ef_min || ab_min > ef_max {
        return None;
    }

    let overlap = if (ab_max > ef_max && ab_min < ef_min) || (ef_max > ab_max && ef_min < ab_min) {
        1.0
    } else {
        let min_max = ab_max.min(ef_max);
        let max_min = ab_min.max(ef_min);
        let max_max = ab_max.max(ef_max);
        let min_min = ab_min.min(ef_min);
        (min_max - max_min) / (max_max - min_min)
    };

    let cross_abe = (e.y - a.y) * (b.x - a.x) - (e.x - a.x) * (b.y - a.y);
    let cross_abf = (f.y - a.y) * (b.x - a.x) - (f.x - a.x) * (b.y - a.y);

    if approx(cross_abe, 0.0) && approx(cross_abf, 0.0) {
        let ab_norm = normalize_vector(Point::new(b.y - a.y, a.x - b.x));
        let ef_norm = normalize_vector(Point::new(f.y - e.y, e.x - f.x));

        // opposite-facing normals: the edges lie against each other
        if (ab_norm.y * ef_norm.x - ab_norm.x * ef_norm.y).abs() < TOLERANCE
            && ab_norm.dot(ef_norm) < 0.0
        {
            let norm_dot = ab_norm.dot(direction);
            if approx(norm_dot, 0.0) {
                return None;
            }
            if norm_dot < 0.0 {
                return Some(0.0);
            }
        }
        return None;
    }

    let mut best: Option<f64> = None;
    let mut push = |d: f64| {
        best = Some(best.map_or(d, |m: f64| m.min(d)));
    };

    // A vertex of `a`-`b` reached by `e`-`f` travelling along `direction`,
    // unless the edges are already touching and separating.
    let moving_away = |d: Option<f64>, other: Option<f64>| -> Option<f64> {
        match d {
            Some(v) if approx(v, 0.0) => {
                let separating = other.map_or(false, |o| o < 0.0 || approx(o * overlap, 0.0));
                if separating {
                    None
                } else {
                    Some(v)
                }
            }
            other => other,
        }
    };

    if approx(dot_a, dot_e) {
        push(cross_a - cross_e);
    } else if approx(dot_a, dot_f) {
        push(cross_a - cross_f);
    } else if dot_a > ef_min && dot_a < ef_max {
        let d = point_distance(a, e, f, reverse, false);
        let d = moving_away(d, point_distance(b, e, f, reverse, true));
        if let Some(v) = d {
            push(v);
        }
    }

    if approx(dot_b, dot_e) {
        push(cross_b - cross_e);
    } else if approx(dot_b, dot_f) {
        push(cross_b - cross_f);
    } else if dot_b > ef_min && dot_b < ef_max {
        let d = point_distance(b, e, f, reverse, false);
        let d = moving_away(d, point_distance(a, e, f, reverse, true));
        if let Some(v) = d {
            push(v);
        }
    }

    if dot_e > ab_min && dot_e < ab_max {
        let d = point_distance(e, a, b, direction, false);
        let d = moving_away(d, point_distance(f, a, b, direction, true));
        if let Some(v) = d {
            push(v);
        }
    }

    if dot_f > ab_min && dot_f < ab_max {
        let d = point_distance(f, a, b, direction, false);
        let d = moving_away(d, point_distance(e, a, b, direction, true));
        if let Some(v) = d {
            push(v);
        }
    }

    best
}

/// How far polygon `b` can slide along `direction` before touching `a`.
///
/// Both polygons are given in their current absolute positions. Returns
/// `None` if no edge of `b` meets an edge of `a` on that path. With
/// `ignore_negative`, negative distances (edges already behind each other)
/// are skipped, except that interpenetrating polygons report 0.
pub fn polygon_slide_distance(
    a: &[Point],
    b: &[Point],
    direction: Point,
    ignore_negative: bool,
) -> Option<f64> {
    let mut overlapping: Option<bool> = None;
    edge_slide_distance(a, b, direction, |d| {
        if !ignore_negative || d >= 0.0 || approx(d, 0.0) {
            return Some(d);
        }
        overlapping
            .get_or_insert_with(|| polygons_overlap(a, b))
            .then_some(0.0)
    })
}

/// Slide distance for polygons known to touch without overlapping.
///
/// Negative distances are always skipped, even where rounding on rotated
/// outlines makes the touching rings look interpenetrating.
pub fn touching_slide_distance(a: &[Point], b: &[Point], direction: Point) -> Option<f64> {
    edge_slide_distance(a, b, direction, |d| (d >= 0.0 || approx(d, 0.0)).then_some(d))
}

/// Smallest edge-pair distance that `accept` keeps.
fn edge_slide_distance<F>(a: &[Point], b: &[Point], direction: Point, mut accept: F) -> Option<f64>
where
    F: FnMut(f64) -> Option<f64>,
{
    let dir = normalize_vector(direction);
    let mut distance: Option<f64> = None;

    for i in 0..b.len() {
        let (b1, b2) = (b[i], b[(i + 1) % b.len()]);
        if approx(b1.x, b2.x) && approx(b1.y, b2.y) {
            continue;
        }
        for j in 0..a.len() {
            let (a1, a2) = (a[j], a[(j + 1) % a.len()]);
            if approx(a1.x, a2.x) && approx(a1.y, a2.y) {
                continue;
            }
            let Some(d) = segment_distance(a1, a2, b1, b2, dir).and_then(&mut accept) else {
                continue;
            };
            if distance.map_or(true, |current| d < current) {
                distance = Some(d);
            }
        }
    }
    distance
}

/// The largest distance any vertex of `b` must travel along `direction` to
/// clear `a` (the shortest projection per vertex, maximized over vertices).
pub fn polygon_projection_distance(a: &[Point], b: &[Point], direction: Point) -> Option<f64> {
    let mut distance: Option<f64> = None;
    for &p in b {
        let mut min_projection: Option<f64> = None;
        for j in 0..a.len() {
            let (s1, s2) = (a[j], a[(j + 1) % a.len()]);
            if ((s2.y - s1.y) * direction.x - (s2.x - s1.x) * direction.y).abs() < TOLERANCE {
                continue;
            }
            if let Some(d) = point_distance(p, s1, s2, direction, false) {
                if min_projection.map_or(true, |m| d < m) {
                    min_projection = Some(d);
                }
            }
        }
        if let Some(m) = min_projection {
            if distance.map_or(true, |d| m > d) {
                distance = Some(m);
            }
        }
    }
    distance
}

/// True if the interiors of two rings overlap.
///
/// Detects proper edge crossings, vertices or edge midpoints strictly
/// inside the other ring, and coincident rings.
pub fn polygons_overlap(a: &[Point], b: &[Point]) -> bool {
    let (Some(ba), Some(bb)) = (polygon_bounds(a), polygon_bounds(b)) else {
        return false;
    };
    let shrunk = |bounds: Bounds| {
        Bounds::new(
            bounds.x + TOLERANCE,
            bounds.y + TOLERANCE,
            (bounds.width - 2.0 * TOLERANCE).max(0.0),
            (bounds.height - 2.0 * TOLERANCE).max(0.0),
        )
    };
    if !shrunk(ba).intersects(&shrunk(bb)) {
        return false;
    }

    let samples_inside = |ring: &[Point], other: &[Point]| {
        let n = ring.len();
        (0..n).any(|i| {
            let p = ring[i];
            let mid = (p + ring[(i + 1) % n]) * 0.5;
            point_in_polygon(p, other) == PointInPolygon::Inside
                || point_in_polygon(mid, other) == PointInPolygon::Inside
        })
    };
    if samples_inside(a, b) || samples_inside(b, a) {
        return true;
    }

    for i in 0..a.len() {
        let (a1, a2) = (a[i], a[(i + 1) % a.len()]);
        for j in 0..b.len() {
            let (b1, b2) = (b[j], b[(j + 1) % b.len()]);
            if segments_cross(a1, a2, b1, b2) {
                return true;
            }
        }
    }

    // Identical outlines touch everywhere and cross nowhere.
    let centroid_inside = |ring: &[Point], other: &[Point]| {
        let c = ring_centroid(ring);
        point_in_polygon(c, ring) == PointInPolygon::Inside
            && point_in_polygon(c, other) == PointInPolygon::Inside
    };
    centroid_inside(a, b) || centroid_inside(b, a)
}

/// Proper crossing: each segment strictly separates the other's endpoints.
fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let o = |p: Point, q: Point, r: Point| robust::orient2d_filtered(p.as_tuple(), q.as_tuple(), r.as_tuple());
    let d1 = o(a1, a2, b1);
    let d2 = o(a1, a2, b2);
    let d3 = o(b1, b2, a1);
    let d4 = o(b1, b2, a2);
    let opposite = |x: Orientation, y: Orientation| {
        (x.is_ccw() && y.is_cw()) || (x.is_cw() && y.is_ccw())
    };
    if !(opposite(d1, d2) && opposite(d3, d4)) {
        return false;
    }
    // An endpoint resting on the other segment is a touch.
    let rests_on = |s1: Point, s2: Point, p: Point| {
        on_segment(s1, s2, p) || almost_equal_points(s1, p, TOLERANCE) || almost_equal_points(s2, p, TOLERANCE)
    };
    !(rests_on(a1, a2, b1) || rests_on(a1, a2, b2) || rests_on(b1, b2, a1) || rests_on(b1, b2, a2))
}

fn ring_centroid(ring: &[Point]) -> Point {
    let n = ring.len();
    let mut twice_area = 0.0;
    let mut c = Point::ORIGIN;
    for i in 0..n {
        let (p, q) = (ring[i], ring[(i + 1) % n]);
        let cross = p.cross(q);
        twice_area += cross;
        c = c + (p + q) * cross;
    }
    if twice_area.abs() < TOLERANCE {
        let sum = ring.iter().fold(Point::ORIGIN, |acc, &p| acc + p);
        return sum * (1.0 / n.max(1) as f64);
    }
    c * (1.0 / (3.0 * twice_area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().copied().map(Point::from).collect()
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        pts(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size)])
    }

    #[test]
    fn test_almost_equal() {
        assert!(almost_equal(1.0, 1.0 + 1e-12, TOLERANCE));
        assert!(!almost_equal(1.0, 1.001, TOLERANCE));
        assert!(within_distance(Point::new(0.0, 0.0), Point::new(0.3, 0.4), 0.6));
        assert!(!within_distance(Point::new(0.0, 0.0), Point::new(0.3, 0.4), 0.5));
    }

    #[test]
    fn test_polygon_area_sign() {
        assert_relative_eq!(polygon_area(&square(0.0, 0.0, 10.0)), -100.0);
        let triangle = pts(&[(0.0, 0.0), (5.0, 0.0), (2.5, 5.0)]);
        assert_relative_eq!(polygon_area(&triangle), -12.5);
    }

    #[test]
    fn test_is_rectangle() {
        assert!(is_rectangle(&square(1.0, 2.0, 3.0), TOLERANCE));
        let mut closed = square(0.0, 0.0, 1.0);
        closed.push(Point::new(0.0, 0.0));
        assert!(is_rectangle(&closed, TOLERANCE));
        let skew = pts(&[(0.0, 0.0), (2.0, 0.0), (3.0, 1.0), (0.0, 1.0)]);
        assert!(!is_rectangle(&skew, TOLERANCE));
    }

    #[test]
    fn test_on_segment_excludes_endpoints() {
        let (a, b) = (Point::new(0.0, 0.0), Point::new(4.0, 4.0));
        assert!(on_segment(a, b, Point::new(2.0, 2.0)));
        assert!(!on_segment(a, b, a));
        assert!(!on_segment(a, b, Point::new(5.0, 5.0)));
        assert!(!on_segment(a, b, Point::new(2.0, 2.5)));
        assert!(on_segment(Point::new(0.0, 0.0), Point::new(0.0, 3.0), Point::new(0.0, 1.0)));
    }

    #[test]
    fn test_line_intersect() {
        let p = line_intersect(
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(2.0, 0.0),
            false,
        )
        .unwrap();
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 1.0);

        // Out of range unless infinite.
        let (a, b) = (Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let (e, f) = (Point::new(3.0, 0.0), Point::new(4.0, -1.0));
        assert!(line_intersect(a, b, e, f, false).is_none());
        assert!(line_intersect(a, b, e, f, true).is_some());

        // Collinear overlap is unsupported.
        assert!(line_intersect(a, Point::new(3.0, 3.0), Point::new(1.0, 1.0), Point::new(4.0, 4.0), false).is_none());
    }

    #[test]
    fn test_point_in_polygon_ternary() {
        let sq = square(0.0, 0.0, 10.0);
        assert_eq!(point_in_polygon(Point::new(5.0, 5.0), &sq), PointInPolygon::Inside);
        assert_eq!(point_in_polygon(Point::new(15.0, 5.0), &sq), PointInPolygon::Outside);
        assert_eq!(point_in_polygon(Point::new(10.0, 5.0), &sq), PointInPolygon::OnBoundary);
        assert_eq!(point_in_polygon(Point::new(10.0, 10.0), &sq), PointInPolygon::OnBoundary);
        assert_eq!(PointInPolygon::OnBoundary.as_option(), None);
    }

    #[test]
    fn test_polygon_edge_facing_normal() {
        let sq = square(0.0, 0.0, 10.0);
        let edge = polygon_edge(&sq, Point::new(0.0, 1.0)).unwrap();
        assert_eq!(edge, pts(&[(10.0, 10.0), (0.0, 10.0)]));
        assert!(polygon_edge(&sq[..2], Point::new(0.0, 1.0)).is_none());
    }

    #[test]
    fn test_point_distance() {
        let (s1, s2) = (Point::new(0.0, 0.0), Point::new(0.0, 10.0));
        // Moving right from x = -3 reaches the vertical segment after 3.
        let d = point_distance(Point::new(-3.0, 5.0), s1, s2, Point::new(1.0, 0.0), false).unwrap();
        assert_relative_eq!(d, 3.0);
        assert!(point_distance(Point::new(-3.0, 15.0), s1, s2, Point::new(1.0, 0.0), false).is_none());
        assert!(point_distance(Point::new(-3.0, 15.0), s1, s2, Point::new(1.0, 0.0), true).is_some());
    }

    #[test]
    fn test_point_line_distance_inclusive_endpoints() {
        let (s1, s2) = (Point::new(0.0, 0.0), Point::new(0.0, 10.0));
        let normal = Point::new(1.0, 0.0);
        let p = Point::new(4.0, 0.0);
        assert!(point_line_distance(p, s1, s2, normal, false, false).is_none());
        assert_relative_eq!(point_line_distance(p, s1, s2, normal, true, false).unwrap(), 4.0);
        assert_relative_eq!(
            point_line_distance(Point::new(4.0, 5.0), s1, s2, normal, false, false).unwrap(),
            4.0
        );
    }

    #[test]
    fn test_segment_distance_parallel_edges() {
        // Right edge of a unit square at x = 1, left edge of another at x = 2.
        let d = segment_distance(
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 1.0),
            Point::new(2.0, 0.0),
            Point::new(-1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(d, 1.0);
    }

    #[test]
    fn test_segment_distance_grazing_is_none() {
        let d = segment_distance(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, -1.0),
            Point::new(-1.0, 0.0),
        );
        assert!(d.is_none());
    }

    #[test]
    fn test_slide_distance_separated_squares() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(2.0, 0.0, 1.0);
        let d = polygon_slide_distance(&a, &b, Point::new(-1.0, 0.0), true).unwrap();
        assert_eq!(d, 1.0);
        assert!(polygon_slide_distance(&a, &b, Point::new(1.0, 0.0), true).is_none());
    }

    #[test]
    fn test_slide_distance_overlapping_squares_clamped() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.0, 1.0);
        let d = polygon_slide_distance(&a, &b, Point::new(-1.0, 0.0), true).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_touching_slide_distance_skips_negative() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.0, 1.0);
        let d = touching_slide_distance(&a, &b, Point::new(-1.0, 0.0)).unwrap();
        assert_relative_eq!(d, 0.5);
        assert_eq!(polygon_slide_distance(&a, &b, Point::new(-1.0, 0.0), true), Some(0.0));

        let b = square(2.0, 0.0, 1.0);
        assert_eq!(touching_slide_distance(&a, &b, Point::new(-1.0, 0.0)), Some(1.0));
    }

    #[test]
    fn test_projection_distance() {
        let a = square(0.0, 0.0, 10.0);
        // b spans x in [-5, -3]; its trailing vertices need 5 to reach a.
        let b = square(-5.0, 2.0, 2.0);
        let d = polygon_projection_distance(&a, &b, Point::new(1.0, 0.0)).unwrap();
        assert_relative_eq!(d, 5.0);
    }

    #[test]
    fn test_polygons_overlap() {
        let a = square(0.0, 0.0, 2.0);
        assert!(polygons_overlap(&a, &square(1.0, 1.0, 2.0)));
        assert!(polygons_overlap(&a, &square(0.0, 0.0, 2.0)));
        assert!(polygons_overlap(&a, &square(0.5, 0.5, 1.0)));
        assert!(!polygons_overlap(&a, &square(2.0, 0.0, 2.0)));
        assert!(!polygons_overlap(&a, &square(5.0, 5.0, 1.0)));

        // A thin cross: no vertex of either lies inside the other.
        let h = pts(&[(-1.0, 0.4), (3.0, 0.4), (3.0, 0.6), (-1.0, 0.6)]);
        let v = pts(&[(0.9, -1.0), (1.1, -1.0), (1.1, 3.0), (0.9, 3.0)]);
        assert!(polygons_overlap(&h, &v));
    }

    #[test]
    fn test_rounding_at_a_touch_is_not_overlap() {
        let diamond = pts(&[(2.0, 0.0), (4.0, 2.0), (2.0, 4.0), (0.0, 2.0)]);
        // Tip on the diamond's edge, a rounding step past it.
        let resting = pts(&[(3.0 - 1e-13, 3.0 - 1e-13), (5.0, 3.5), (3.5, 5.0)]);
        assert!(!polygons_overlap(&diamond, &resting));
        let sunk = pts(&[(2.5, 2.5), (5.0, 3.5), (3.5, 5.0)]);
        assert!(polygons_overlap(&diamond, &sunk));
    }

    #[test]
    fn test_rotate_polygon() {
        let r = rotate_polygon(&pts(&[(1.0, 0.0)]), 90.0);
        assert_eq!(r[0], Point::new(0.0, 1.0));
        let r = rotate_polygon(&pts(&[(1.0, 0.0)]), 45.0);
        assert_relative_eq!(r[0].x, std::f64::consts::FRAC_1_SQRT_2);
    }
}
