//! No-Fit Polygon (NFP) and Inner-Fit Polygon (IFP) computation.
//!
//! ## Conventions
//!
//! NFP vertices are translations: placing the orbiting part at translation
//! `t` overlaps the stationary part iff `t` lies strictly inside the NFP.
//! The stationary part's holes show up as child loops of the NFP (regions
//! where the orbiting part fits inside a hole).
//!
//! ## Algorithms
//!
//! - **Outer NFP**: orbital sliding. The orbiting ring starts touching the
//!   stationary ring from above and is slid around it, one touching event
//!   at a time, until it returns to a position it already visited.
//! - **Inner-fit polygon**: closed form for rectangular containers; general
//!   containers subtract every edge-pair parallelogram from the container.

use crate::boolean::{BooleanKind, Clipper};
use crate::geometry::{Point, Polygon};
use crate::util::{
    self, on_segment, point_in_polygon, polygon_projection_distance, polygons_overlap,
    touching_slide_distance, TOLERANCE,
};
use serde::{Deserialize, Serialize};

/// Tolerance for recognising a rectangular container.
const RECTANGLE_TOLERANCE: f64 = 1e-6;

/// Result of an NFP or IFP computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nfp {
    /// Region loops; children are holes in the region.
    pub polygons: Vec<Polygon>,

    /// Isolated translations (an inner fit that is only a point or a segment).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,

    /// The orbital trace did not close; `polygons` holds a partial result.
    #[serde(default)]
    pub degraded: bool,
}

impl Nfp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons,
            ..Self::default()
        }
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    /// No region and no isolated points.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.points.is_empty()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Nfp {
        Nfp {
            polygons: self.polygons.iter().map(|p| p.translate(dx, dy)).collect(),
            points: self.points.iter().map(|p| Point::new(p.x + dx, p.y + dy)).collect(),
            degraded: self.degraded,
        }
    }

    /// Total region area (holes excluded).
    pub fn area(&self) -> f64 {
        self.polygons.iter().map(Polygon::net_area).sum()
    }
}

/// Raw loops produced by [`no_fit_polygon`].
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub loops: Vec<Vec<Point>>,
    pub degraded: bool,
}

/// Computes NFPs and IFPs with a shared clipping backend.
#[derive(Debug, Clone)]
pub struct NfpCalculator {
    clipper: Clipper,
    step_limit: usize,
    explore_concave: bool,
}

impl Default for NfpCalculator {
    fn default() -> Self {
        Self::new(Clipper::default(), 10)
    }
}

impl NfpCalculator {
    /// `step_limit` bounds the sliding steps per loop, per vertex of the pair.
    pub fn new(clipper: Clipper, step_limit: usize) -> Self {
        Self {
            clipper,
            step_limit,
            explore_concave: false,
        }
    }

    /// Also trace secondary loops (interlocking positions).
    pub fn with_explore_concave(mut self, explore: bool) -> Self {
        self.explore_concave = explore;
        self
    }

    pub fn clipper(&self) -> &Clipper {
        &self.clipper
    }

    /// NFP of `orbiting` around `stationary`, both in their final rotation.
    ///
    /// Only the orbiting part's outer ring is used. A degraded result keeps
    /// whatever loop could be traced.
    pub fn outer(&self, stationary: &Polygon, orbiting: &Polygon) -> Nfp {
        let a = stationary.ensure_orientation(true);
        let b = Polygon::from_ring_unchecked(orbiting.points().to_vec()).ensure_orientation(true);

        let trace = no_fit_polygon(a.points(), b.points(), self.explore_concave, self.step_limit);
        if trace.degraded {
            log::debug!(
                "NFP trace did not close ({} x {} vertices)",
                a.len(),
                b.len()
            );
        }

        let mut loops = trace
            .loops
            .into_iter()
            .filter_map(|ring| Polygon::new(ring).ok());
        let Some(primary) = loops.next() else {
            return Nfp {
                degraded: trace.degraded,
                ..Nfp::default()
            };
        };

        // Secondary loops enclose pockets the orbiting part can reach only
        // from inside; they are holes of the forbidden region.
        let mut children: Vec<Polygon> = loops.collect();
        for hole in a.children() {
            let container = Polygon::from_ring_unchecked(hole.points().to_vec());
            let fit = self.inner_ring(&container, b.points());
            children.extend(fit.polygons);
        }

        let polygon = primary.ensure_orientation(true).with_children(children);
        Nfp {
            polygons: vec![polygon.ensure_orientation(true)],
            points: Vec::new(),
            degraded: trace.degraded,
        }
    }

    /// Inner-fit polygon: translations keeping `part` inside `container`.
    pub fn inner(&self, container: &Polygon, part: &Polygon) -> Nfp {
        self.inner_ring(container, part.points())
    }

    fn inner_ring(&self, container: &Polygon, part: &[Point]) -> Nfp {
        let (Some(outer), Some(inner)) = (
            util::polygon_bounds(container.points()),
            util::polygon_bounds(part),
        ) else {
            return Nfp::new();
        };
        if !outer.can_contain(&inner, TOLERANCE) {
            return Nfp::new();
        }

        if container.children().is_empty() && container.is_rectangle(RECTANGLE_TOLERANCE) {
            return rectangle_fit(outer, inner);
        }
        self.general_fit(container, part)
    }

    /// `(container - b0)` minus every translation at which the part's
    /// boundary meets the container's boundary.
    fn general_fit(&self, container: &Polygon, part: &[Point]) -> Nfp {
        let b0 = part[0];
        let base = container.translate(-b0.x, -b0.y);

        let mut forbidden = Vec::new();
        let mut rings: Vec<&[Point]> = vec![container.points()];
        rings.extend(container.children().iter().map(|c| c.points()));
        let m = part.len();
        for (ring_index, ring) in rings.iter().enumerate() {
            let n = ring.len();
            for i in 0..n {
                let (p, q) = (ring[i], ring[(i + 1) % n]);
                for j in 0..m {
                    let (u, v) = (part[j], part[(j + 1) % m]);
                    if let Ok(parallelogram) = Polygon::new(vec![p - u, q - u, q - v, p - v]) {
                        forbidden.push(parallelogram);
                    }
                }
                // A hole vertex swallowed by the part.
                if ring_index > 0 {
                    let swept: Vec<Point> = part.iter().map(|&b| ring[i] - b).collect();
                    if let Ok(poly) = Polygon::new(swept) {
                        forbidden.push(poly);
                    }
                }
            }
        }

        let blocked = self.clipper.union_all(&forbidden);
        let allowed = self
            .clipper
            .execute(std::slice::from_ref(&base), &blocked, BooleanKind::Difference);
        Nfp::from_polygons(allowed)
    }
}

/// Closed-form inner fit of `inner` bounds in a rectangular container.
fn rectangle_fit(outer: crate::geometry::Bounds, inner: crate::geometry::Bounds) -> Nfp {
    let x0 = outer.x - inner.x;
    let y0 = outer.y - inner.y;
    let x1 = outer.max_x() - inner.max_x();
    let y1 = outer.max_y() - inner.max_y();
    let (x1, y1) = (x1.max(x0), y1.max(y0));

    if x1 - x0 > TOLERANCE && y1 - y0 > TOLERANCE {
        return Polygon::new(vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
        .map(|p| Nfp::from_polygons(vec![p.ensure_orientation(true)]))
        .unwrap_or_default();
    }

    // Zero slack on at least one axis: a segment or a single point.
    let mut points = vec![Point::new(x0, y0)];
    let far = Point::new(x1, y1);
    if !far.almost_eq(points[0], TOLERANCE) {
        points.push(far);
    }
    Nfp::from_points(points)
}

/// Orbital-sliding NFP of ring `b` around ring `a`.
///
/// Both rings must have negative [`Polygon::area`]. Returned loop vertices
/// are translations of `b`. With `search_edges`, further disjoint loops are
/// traced from start points found by [`search_start_point`]. A loop that
/// does not close within `step_limit * (|a| + |b|)` steps ends the trace
/// with `degraded` set.
pub fn no_fit_polygon(a: &[Point], b: &[Point], search_edges: bool, step_limit: usize) -> Trace {
    if a.len() < 3 || b.len() < 3 {
        return Trace::default();
    }

    let mut visited = vec![false; a.len()];
    let min_a = index_by(a, |p, q| p.y < q.y);
    let max_b = index_by(b, |p, q| p.y > q.y);

    // b's lowest point on a's highest point: touching, never overlapping.
    let mut start = Some(a[min_a] - b[max_b]);
    let max_steps = step_limit.saturating_mul(a.len() + b.len());
    let mut trace = Trace::default();

    while let Some(offset) = start {
        let (points, closed) = trace_loop(a, b, offset, &mut visited, max_steps);
        if !closed {
            trace.degraded = true;
        }
        if !points.is_empty() {
            trace.loops.push(points);
        }
        if !search_edges || trace.degraded {
            break;
        }
        start = search_start_point(a, b, false, &mut visited, &trace.loops);
    }
    trace
}

fn index_by<F>(points: &[Point], better: F) -> usize
where
    F: Fn(Point, Point) -> bool,
{
    let mut best = 0;
    for (i, &p) in points.iter().enumerate().skip(1) {
        if better(p, points[best]) {
            best = i;
        }
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Vertex {
    A(usize),
    B(usize),
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    vector: Point,
    start: Vertex,
    end: Vertex,
}

#[derive(Debug, Clone, Copy)]
enum Touch {
    /// Vertex of `a` on vertex of `b`.
    Vertices { a: usize, b: usize },
    /// Vertex of `b` on the edge ending at `a`.
    BOnEdgeOfA { a: usize, b: usize },
    /// Vertex of `a` on the edge of `b` ending at `b`.
    AOnEdgeOfB { a: usize, b: usize },
}

fn find_touching(a: &[Point], moved: &[Point]) -> Vec<Touch> {
    let (n, m) = (a.len(), moved.len());
    let mut touching = Vec::new();
    for i in 0..n {
        let next_i = (i + 1) % n;
        for j in 0..m {
            let next_j = (j + 1) % m;
            if util::almost_equal_points(a[i], moved[j], TOLERANCE) {
                touching.push(Touch::Vertices { a: i, b: j });
            } else if on_segment(a[i], a[next_i], moved[j]) {
                touching.push(Touch::BOnEdgeOfA { a: next_i, b: j });
            } else if on_segment(moved[j], moved[next_j], a[i]) {
                touching.push(Touch::AOnEdgeOfB { a: i, b: next_j });
            }
        }
    }
    touching
}

fn candidates(a: &[Point], b: &[Point], offset: Point, touching: &[Touch], visited: &mut [bool]) -> Vec<Candidate> {
    let (n, m) = (a.len(), b.len());
    let mut out = Vec::with_capacity(touching.len() * 4);
    for touch in touching {
        let (ia, ib) = match *touch {
            Touch::Vertices { a, b } | Touch::BOnEdgeOfA { a, b } | Touch::AOnEdgeOfB { a, b } => (a, b),
        };
        visited[ia] = true;

        let (prev_a, next_a) = ((ia + n - 1) % n, (ia + 1) % n);
        let (prev_b, next_b) = ((ib + m - 1) % m, (ib + 1) % m);
        let vertex_a = a[ia];
        let vertex_b = b[ib];

        match touch {
            Touch::Vertices { .. } => {
                out.push(Candidate {
                    vector: a[prev_a] - vertex_a,
                    start: Vertex::A(ia),
                    end: Vertex::A(prev_a),
                });
                out.push(Candidate {
                    vector: a[next_a] - vertex_a,
                    start: Vertex::A(ia),
                    end: Vertex::A(next_a),
                });
                // b's edges are traversed backwards relative to a.
                out.push(Candidate {
                    vector: vertex_b - b[prev_b],
                    start: Vertex::B(prev_b),
                    end: Vertex::B(ib),
                });
                out.push(Candidate {
                    vector: vertex_b - b[next_b],
                    start: Vertex::B(next_b),
                    end: Vertex::B(ib),
                });
            }
            Touch::BOnEdgeOfA { .. } => {
                out.push(Candidate {
                    vector: vertex_a - (vertex_b + offset),
                    start: Vertex::A(prev_a),
                    end: Vertex::A(ia),
                });
                out.push(Candidate {
                    vector: a[prev_a] - (vertex_b + offset),
                    start: Vertex::A(ia),
                    end: Vertex::A(prev_a),
                });
            }
            Touch::AOnEdgeOfB { .. } => {
                out.push(Candidate {
                    vector: vertex_a - (vertex_b + offset),
                    start: Vertex::B(prev_b),
                    end: Vertex::B(ib),
                });
                out.push(Candidate {
                    vector: vertex_a - (b[prev_b] + offset),
                    start: Vertex::B(ib),
                    end: Vertex::B(prev_b),
                });
            }
        }
    }
    out
}

/// True if `v` doubles back along `prev`.
fn reverses(v: Point, prev: Point) -> bool {
    if v.dot(prev) >= 0.0 {
        return false;
    }
    let unit_v = util::normalize_vector(v);
    let unit_prev = util::normalize_vector(prev);
    unit_v.cross(unit_prev).abs() < 1e-4
}

/// Traces one loop from `start`. Returns the loop and whether it closed.
fn trace_loop(a: &[Point], b: &[Point], start: Point, visited: &mut [bool], max_steps: usize) -> (Vec<Point>, bool) {
    let mut offset = start;
    let mut nfp = vec![start];
    let mut prev_vector: Option<Point> = None;

    for _ in 0..max_steps {
        let moved: Vec<Point> = b.iter().map(|&p| p + offset).collect();
        let touching = find_touching(a, &moved);
        let options = candidates(a, b, offset, &touching, visited);

        let mut chosen: Option<Candidate> = None;
        let mut max_d = 0.0;
        for candidate in options {
            let v = candidate.vector;
            if util::almost_equal_points(v, Point::ORIGIN, TOLERANCE) {
                continue;
            }
            if prev_vector.map_or(false, |prev| reverses(v, prev)) {
                continue;
            }
            let len_sq = v.length_squared();
            let d = match touching_slide_distance(a, &moved, v) {
                Some(d) if d * d <= len_sq => d,
                _ => len_sq.sqrt(),
            };
            if d > max_d {
                max_d = d;
                chosen = Some(candidate);
            }
        }

        let Some(step) = chosen.filter(|_| !util::almost_equal(max_d, 0.0, TOLERANCE)) else {
            return (nfp, false);
        };
        for vertex in [step.start, step.end] {
            if let Vertex::A(i) = vertex {
                visited[i] = true;
            }
        }
        prev_vector = Some(step.vector);

        let mut translate = step.vector;
        let len_sq = translate.length_squared();
        if max_d * max_d < len_sq && !util::almost_equal(max_d * max_d, len_sq, TOLERANCE) {
            translate = translate * (max_d * max_d / len_sq).sqrt();
        }
        offset = offset + translate;

        if util::almost_equal_points(offset, start, TOLERANCE) {
            return (nfp, true);
        }
        // Starting on a shared horizontal edge, the trace may rejoin
        // the loop somewhere other than its start.
        let looped = nfp[..nfp.len() - 1]
            .iter()
            .any(|&p| util::almost_equal_points(offset, p, TOLERANCE));
        if looped {
            return (nfp, true);
        }
        nfp.push(offset);
    }
    (nfp, false)
}

/// Finds a translation of `b` touching `a` that lies on none of the
/// `existing` loops.
///
/// Each unvisited vertex of `a` is tried against every vertex of `b`, first
/// directly, then after sliding along the edge leaving that vertex. With
/// `inside` the position must put `b` inside `a`, otherwise outside.
pub fn search_start_point(
    a: &[Point],
    b: &[Point],
    inside: bool,
    visited: &mut [bool],
    existing: &[Vec<Point>],
) -> Option<Point> {
    let n = a.len();
    for i in 0..n {
        if visited.get(i).copied().unwrap_or(true) {
            continue;
        }
        visited[i] = true;

        for &bj in b {
            let mut offset = a[i] - bj;
            let moved: Vec<Point> = b.iter().map(|&p| p + offset).collect();

            // Every vertex on a's boundary: the rings coincide here.
            let Some(b_inside) = first_definite(&moved, a) else {
                continue;
            };
            if b_inside == inside && !polygons_overlap(a, &moved) && !on_loops(offset, existing) {
                return Some(offset);
            }

            let mut v = a[(i + 1) % n] - a[i];
            let d1 = polygon_projection_distance(a, &moved, v);
            let d2 = polygon_projection_distance(&moved, a, -v);
            let d = match (d1, d2) {
                (None, None) => None,
                (Some(d), None) | (None, Some(d)) => Some(d),
                (Some(d1), Some(d2)) => Some(d1.min(d2)),
            };
            let Some(d) = d.filter(|&d| d > 0.0 && !util::almost_equal(d, 0.0, TOLERANCE)) else {
                continue;
            };

            let vd2 = v.length_squared();
            if d * d < vd2 && !util::almost_equal(d * d, vd2, TOLERANCE) {
                v = v * (d / vd2.sqrt());
            }
            offset = offset + v;

            let moved: Vec<Point> = b.iter().map(|&p| p + offset).collect();
            let b_inside = first_definite(&moved, a).unwrap_or(b_inside);
            if b_inside == inside && !polygons_overlap(a, &moved) && !on_loops(offset, existing) {
                return Some(offset);
            }
        }
    }
    None
}

/// Inside/outside status of the first vertex of `ring` not on `polygon`'s boundary.
fn first_definite(ring: &[Point], polygon: &[Point]) -> Option<bool> {
    ring.iter()
        .find_map(|&p| point_in_polygon(p, polygon).as_option())
}

fn on_loops(p: Point, loops: &[Vec<Point>]) -> bool {
    loops
        .iter()
        .flatten()
        .any(|&q| util::almost_equal_points(p, q, TOLERANCE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Polygon {
        Polygon::rectangle(w, h).unwrap().translate(x, y)
    }

    fn overlaps(a: &Polygon, b: &Polygon) -> bool {
        util::polygons_overlap(a.points(), b.points())
    }

    #[test]
    fn test_square_nfp_bounds() {
        let calc = NfpCalculator::default();
        let nfp = calc.outer(&rect(0.0, 0.0, 10.0, 10.0), &rect(0.0, 0.0, 5.0, 5.0));
        assert!(!nfp.degraded);
        assert_eq!(nfp.polygons.len(), 1);
        let bounds = nfp.polygons[0].bounds();
        assert_relative_eq!(bounds.x, -5.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.y, -5.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.width, 15.0, epsilon = 1e-9);
        assert_relative_eq!(nfp.area(), 225.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nfp_separates_positions() {
        let calc = NfpCalculator::default();
        let a = rect(0.0, 0.0, 4.0, 4.0);
        let b = Polygon::from_xy(&[(0.0, 0.0), (2.0, 0.0), (1.0, 2.0)]).unwrap();
        let nfp = calc.outer(&a, &b);
        assert!(!nfp.degraded);
        let region = &nfp.polygons[0];

        for &(x, y) in &[(-5.0, 0.0), (6.0, 1.0), (1.0, -3.0), (1.0, 7.0), (1.0, 1.0), (3.0, 3.0)] {
            let t = Point::new(x, y);
            let placed = b.translate(x, y);
            match region.contains_point(t) {
                util::PointInPolygon::Outside => assert!(!overlaps(&a, &placed), "overlap at {t:?}"),
                util::PointInPolygon::Inside => assert!(overlaps(&a, &placed), "no overlap at {t:?}"),
                util::PointInPolygon::OnBoundary => {}
            }
        }
    }

    #[test]
    fn test_hole_produces_child_loop() {
        let hole = rect(2.0, 2.0, 6.0, 6.0);
        let a = rect(0.0, 0.0, 10.0, 10.0).with_child(hole);
        let nfp = NfpCalculator::default().outer(&a, &rect(0.0, 0.0, 2.0, 2.0));
        assert_eq!(nfp.polygons.len(), 1);
        let children = nfp.polygons[0].children();
        assert_eq!(children.len(), 1);
        let inner = children[0].bounds();
        assert_relative_eq!(inner.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(inner.width, 4.0, epsilon = 1e-9);
        assert_relative_eq!(nfp.area(), 144.0 - 16.0, epsilon = 1e-6);
    }

    #[test]
    fn test_explore_concave_on_convex_pair_finds_one_loop() {
        let calc = NfpCalculator::default().with_explore_concave(true);
        let nfp = calc.outer(&rect(0.0, 0.0, 3.0, 3.0), &rect(0.0, 0.0, 1.0, 1.0));
        assert_eq!(nfp.polygons.len(), 1);
        assert!(nfp.polygons[0].children().is_empty());
    }

    #[test]
    fn test_rotated_parts_orbit_a_u_shape() {
        let u = Polygon::from_xy(&[
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 20.0),
            (14.0, 20.0),
            (14.0, 6.0),
            (6.0, 6.0),
            (6.0, 20.0),
            (0.0, 20.0),
        ])
        .unwrap();
        let triangle = Polygon::from_xy(&[(0.0, 0.0), (6.0, 0.0), (0.0, 5.0)]).unwrap();
        let square = rect(0.0, 0.0, 4.0, 4.0);
        let calc = NfpCalculator::default();

        for (part, angle) in [(&triangle, 30.0), (&triangle, 45.0), (&triangle, 180.0), (&square, 45.0)] {
            let nfp = calc.outer(&u, &part.rotate(angle));
            assert!(!nfp.degraded, "trace did not close at {angle} degrees");
            assert_eq!(nfp.polygons.len(), 1);
        }

        // The square turned 45 degrees sits in the notch.
        let diamond = square.rotate(45.0);
        let nfp = calc.outer(&u, &diamond);
        let t = Point::new(10.0, 10.0);
        assert_eq!(nfp.polygons[0].contains_point(t), util::PointInPolygon::Outside);
        assert!(!overlaps(&u, &diamond.translate(t.x, t.y)));
    }

    #[test]
    fn test_search_start_point_skips_coincident_candidate() {
        // The first candidate puts b exactly on top of a.
        let a = rect(0.0, 0.0, 4.0, 4.0);
        let mut visited = vec![false; a.len()];
        let start = search_start_point(a.points(), a.points(), false, &mut visited, &[]).unwrap();
        assert_ne!(start, Point::ORIGIN);
        assert!(!overlaps(&a, &a.translate(start.x, start.y)));
    }

    #[test]
    fn test_step_limit_degrades() {
        let a = rect(0.0, 0.0, 3.0, 3.0);
        let b = rect(0.0, 0.0, 1.0, 1.0);
        let trace = no_fit_polygon(a.points(), b.points(), false, 0);
        assert!(trace.degraded);
        assert_eq!(trace.loops.len(), 1);
        assert_eq!(trace.loops[0].len(), 1);

        let nfp = NfpCalculator::new(Clipper::default(), 0).outer(&a, &b);
        assert!(nfp.degraded);
        assert!(nfp.polygons.is_empty());
    }

    #[test]
    fn test_rectangle_inner_fit() {
        let calc = NfpCalculator::default();
        let ifp = calc.inner(&rect(0.0, 0.0, 10.0, 8.0), &rect(1.0, 1.0, 2.0, 3.0));
        let bounds = ifp.polygons[0].bounds();
        assert_relative_eq!(bounds.x, -1.0);
        assert_relative_eq!(bounds.y, -1.0);
        assert_relative_eq!(bounds.width, 8.0);
        assert_relative_eq!(bounds.height, 5.0);
    }

    #[test]
    fn test_exact_fit_is_a_point() {
        let calc = NfpCalculator::default();
        let ifp = calc.inner(&rect(0.0, 0.0, 10.0, 10.0), &rect(0.0, 0.0, 10.0, 10.0));
        assert!(ifp.polygons.is_empty());
        assert_eq!(ifp.points, vec![Point::new(0.0, 0.0)]);

        let ifp = calc.inner(&rect(0.0, 0.0, 10.0, 10.0), &rect(0.0, 0.0, 4.0, 10.0));
        assert_eq!(ifp.points.len(), 2);

        assert!(calc.inner(&rect(0.0, 0.0, 5.0, 5.0), &rect(0.0, 0.0, 6.0, 1.0)).is_empty());
    }

    #[test]
    fn test_general_inner_fit_matches_rectangle() {
        // A square with an extra collinear vertex skips the closed form.
        let container =
            Polygon::from_xy(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap();
        let ifp = NfpCalculator::default().inner(&container, &rect(0.0, 0.0, 2.0, 2.0));
        assert_relative_eq!(ifp.area(), 64.0, epsilon = 1e-6);
    }

    #[test]
    fn test_l_shaped_inner_fit() {
        let container = Polygon::from_xy(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 5.0),
            (5.0, 5.0),
            (5.0, 10.0),
            (0.0, 10.0),
        ])
        .unwrap();
        let ifp = NfpCalculator::default().inner(&container, &rect(0.0, 0.0, 2.0, 2.0));
        assert_relative_eq!(ifp.area(), 39.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nfp_serde() {
        let nfp = Nfp {
            polygons: vec![rect(0.0, 0.0, 1.0, 1.0)],
            points: vec![Point::new(1.0, 2.0)],
            degraded: true,
        };
        let json = serde_json::to_string(&nfp).unwrap();
        let back: Nfp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, nfp);
    }
}
