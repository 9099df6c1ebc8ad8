//! 2D geometry types.
//!
//! Coordinates follow the SVG convention (y axis pointing down). In that frame
//! a ring whose [`Polygon::area`] is negative runs clockwise. Outer rings
//! produced by boolean operations are clockwise and holes counter-clockwise.

use crate::boolean::{BooleanKind, Clipper};
use crate::util::{self, PointInPolygon};
use geo::{ConvexHull, Coord, MultiPoint};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use sheetnest_core::robust;
use sheetnest_core::{Error, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::OnceLock;

/// A 2D point. Equality is exact; use [`Point::almost_eq`] for proximity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product.
    #[inline]
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    /// True if both coordinates differ by less than `tolerance`.
    #[inline]
    pub fn almost_eq(self, other: Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance && (self.y - other.y).abs() < tolerance
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub(crate) fn as_tuple(self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounds of a point set, or `None` if it is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Self::new(x, y, max_x - x, max_y - y)
    }

    /// True if the boxes share interior or boundary.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x <= other.max_x()
            && other.x <= self.max_x()
            && self.y <= other.max_y()
            && other.y <= self.max_y()
    }

    /// True if `other` has room inside `self` (sizes only).
    pub fn can_contain(&self, other: &Bounds, tolerance: f64) -> bool {
        other.width <= self.width + tolerance && other.height <= self.height + tolerance
    }
}

/// A polygon: an outer ring plus owned child polygons representing holes.
///
/// Polygons are immutable once built; every transform returns a new value.
/// `area`, `bounds`, `centroid` and `perimeter` are computed on first use and
/// cached for the lifetime of the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "PolygonRecord", try_from = "PolygonRecord")]
pub struct Polygon {
    points: Vec<Point>,
    children: Vec<Polygon>,
    id: Option<i64>,
    source: Option<i64>,
    area: OnceLock<f64>,
    bounds: OnceLock<Bounds>,
    centroid: OnceLock<Point>,
    perimeter: OnceLock<f64>,
}

/// Plain serialized form of a [`Polygon`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PolygonRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<i64>,
}

impl From<Polygon> for PolygonRecord {
    fn from(polygon: Polygon) -> Self {
        Self {
            points: polygon.points,
            children: polygon.children.into_iter().map(Into::into).collect(),
            id: polygon.id,
            source: polygon.source,
        }
    }
}

impl TryFrom<PolygonRecord> for Polygon {
    type Error = Error;

    fn try_from(record: PolygonRecord) -> Result<Self> {
        let children = record
            .children
            .into_iter()
            .map(Polygon::try_from)
            .collect::<Result<Vec<_>>>()?;
        let mut polygon = Polygon::new(record.points)?.with_children(children);
        polygon.id = record.id;
        polygon.source = record.source;
        Ok(polygon)
    }
}

impl PartialEq for Polygon {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points && self.children == other.children
    }
}

/// A boolean operation applied by [`Polygon::batch_operations`].
#[derive(Debug, Clone, Copy)]
pub enum BooleanOp<'a> {
    Union(&'a Polygon),
    Intersection(&'a Polygon),
    Difference(&'a Polygon),
    Xor(&'a Polygon),
}

impl Polygon {
    /// Creates a polygon from its outer ring.
    ///
    /// A trailing point equal to the first is dropped. Fails with
    /// [`Error::InvalidGeometry`] for fewer than 3 points, non-finite
    /// coordinates or fully collinear points.
    pub fn new(mut points: Vec<Point>) -> Result<Self> {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return Err(Error::InvalidGeometry(format!(
                "polygon needs at least 3 points, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidGeometry("non-finite coordinate".into()));
        }
        let tuples: Vec<(f64, f64)> = points.iter().map(|p| p.as_tuple()).collect();
        if robust::all_collinear(&tuples) {
            return Err(Error::InvalidGeometry("all points are collinear".into()));
        }
        Ok(Self::from_ring_unchecked(points))
    }

    /// Creates a polygon from `(x, y)` pairs.
    pub fn from_xy(points: &[(f64, f64)]) -> Result<Self> {
        Self::new(points.iter().copied().map(Point::from).collect())
    }

    /// Axis-aligned rectangle with its corner at the origin.
    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        Self::from_xy(&[(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)])
    }

    pub(crate) fn from_ring_unchecked(points: Vec<Point>) -> Self {
        Self {
            points,
            children: Vec::new(),
            id: None,
            source: None,
            area: OnceLock::new(),
            bounds: OnceLock::new(),
            centroid: OnceLock::new(),
            perimeter: OnceLock::new(),
        }
    }

    /// Replaces the children (holes).
    pub fn with_children(mut self, children: Vec<Polygon>) -> Self {
        self.children = children;
        self
    }

    /// Adds a child (hole).
    pub fn with_child(mut self, child: Polygon) -> Self {
        self.children.push(child);
        self
    }

    /// Sets the provenance id.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the provenance source tag.
    pub fn with_source(mut self, source: i64) -> Self {
        self.source = Some(source);
        self
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn children(&self) -> &[Polygon] {
        &self.children
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn source(&self) -> Option<i64> {
        self.source
    }

    /// Number of vertices of the outer ring.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed polygon; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// At least 3 finite points, not all collinear, children valid too.
    pub fn is_valid(&self) -> bool {
        let tuples: Vec<(f64, f64)> = self.points.iter().map(|p| p.as_tuple()).collect();
        self.points.len() >= 3
            && self.points.iter().all(|p| p.is_finite())
            && !robust::all_collinear(&tuples)
            && self.children.iter().all(Polygon::is_valid)
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Signed area of the outer ring; negative when clockwise (y down).
    pub fn area(&self) -> f64 {
        *self.area.get_or_init(|| util::polygon_area(&self.points))
    }

    /// Outer area minus hole areas, always non-negative.
    pub fn net_area(&self) -> f64 {
        let holes: f64 = self.children.iter().map(|c| c.area().abs()).sum();
        (self.area().abs() - holes).max(0.0)
    }

    pub fn bounds(&self) -> Bounds {
        *self.bounds.get_or_init(|| {
            Bounds::from_points(self.points.iter().copied())
                .unwrap_or_else(|| Bounds::new(0.0, 0.0, 0.0, 0.0))
        })
    }

    /// Area centroid of the outer ring.
    pub fn centroid(&self) -> Point {
        *self.centroid.get_or_init(|| {
            let n = self.points.len();
            let mut twice_area = 0.0;
            let mut cx = 0.0;
            let mut cy = 0.0;
            for i in 0..n {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                let cross = p.x * q.y - q.x * p.y;
                twice_area += cross;
                cx += (p.x + q.x) * cross;
                cy += (p.y + q.y) * cross;
            }
            if twice_area.abs() < 1e-12 {
                let sum = self.points.iter().fold(Point::ORIGIN, |acc, &p| acc + p);
                return sum * (1.0 / n.max(1) as f64);
            }
            Point::new(cx / (3.0 * twice_area), cy / (3.0 * twice_area))
        })
    }

    /// Length of the outer ring.
    pub fn perimeter(&self) -> f64 {
        *self.perimeter.get_or_init(|| {
            let n = self.points.len();
            (0..n)
                .map(|i| self.points[i].distance(self.points[(i + 1) % n]))
                .sum()
        })
    }

    /// True if the outer ring runs clockwise (negative area).
    pub fn is_clockwise(&self) -> bool {
        self.area() < 0.0
    }

    pub fn is_convex(&self) -> bool {
        let tuples: Vec<(f64, f64)> = self.points.iter().map(|p| p.as_tuple()).collect();
        robust::is_convex(&tuples)
    }

    pub fn is_rectangle(&self, tolerance: f64) -> bool {
        util::is_rectangle(&self.points, tolerance)
    }

    /// Containment test that honours holes.
    pub fn contains_point(&self, p: Point) -> PointInPolygon {
        match util::point_in_polygon(p, &self.points) {
            PointInPolygon::Inside => {
                for child in &self.children {
                    match util::point_in_polygon(p, &child.points) {
                        PointInPolygon::Inside => return PointInPolygon::Outside,
                        PointInPolygon::OnBoundary => return PointInPolygon::OnBoundary,
                        PointInPolygon::Outside => {}
                    }
                }
                PointInPolygon::Inside
            }
            other => other,
        }
    }

    /// Stable content hash of the ring coordinates and children.
    ///
    /// Equal geometry yields equal signatures within one build of the crate.
    pub fn signature(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_geometry(&mut hasher);
        hasher.finish()
    }

    fn hash_geometry<H: Hasher>(&self, state: &mut H) {
        self.points.len().hash(state);
        for p in &self.points {
            p.x.to_bits().hash(state);
            p.y.to_bits().hash(state);
        }
        self.children.len().hash(state);
        for child in &self.children {
            child.hash_geometry(state);
        }
    }

    // ========================================================================
    // Orientation
    // ========================================================================

    /// Reverses the winding of the whole tree.
    pub fn reverse(&self) -> Polygon {
        let mut points = self.points.clone();
        points.reverse();
        let mut out = self.rebuilt(points);
        out.children = self.children.iter().map(Polygon::reverse).collect();
        out
    }

    /// Orients the outer ring as requested and every hole the opposite way.
    pub fn ensure_orientation(&self, clockwise: bool) -> Polygon {
        let outer = if self.is_clockwise() == clockwise {
            self.rebuilt(self.points.clone())
        } else {
            let mut points = self.points.clone();
            points.reverse();
            self.rebuilt(points)
        };
        let children = self
            .children
            .iter()
            .map(|c| c.ensure_orientation(!clockwise))
            .collect();
        outer.with_children(children)
    }

    /// Copies id/source onto a new outer ring; children are dropped.
    fn rebuilt(&self, points: Vec<Point>) -> Polygon {
        let mut out = Polygon::from_ring_unchecked(points);
        out.id = self.id;
        out.source = self.source;
        out
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    fn map_points<F>(&self, f: &F) -> Polygon
    where
        F: Fn(Point) -> Point,
    {
        let mut out = self.rebuilt(self.points.iter().map(|&p| f(p)).collect());
        out.children = self.children.iter().map(|c| c.map_points(f)).collect();
        out
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Polygon {
        self.map_points(&|p| Point::new(p.x + dx, p.y + dy))
    }

    /// Rotates about the origin by `degrees`.
    pub fn rotate(&self, degrees: f64) -> Polygon {
        self.rotate_around(degrees, Point::ORIGIN)
    }

    pub fn rotate_around(&self, degrees: f64, pivot: Point) -> Polygon {
        let (sin, cos) = util::sin_cos_degrees(degrees);
        self.map_points(&|p| {
            let d = p - pivot;
            Point::new(pivot.x + d.x * cos - d.y * sin, pivot.y + d.x * sin + d.y * cos)
        })
    }

    /// Scales about the origin. Zero factors would collapse the ring and are rejected.
    pub fn scale(&self, sx: f64, sy: f64) -> Result<Polygon> {
        self.scale_around(sx, sy, Point::ORIGIN)
    }

    pub fn scale_around(&self, sx: f64, sy: f64, pivot: Point) -> Result<Polygon> {
        if sx == 0.0 || sy == 0.0 || !sx.is_finite() || !sy.is_finite() {
            return Err(Error::InvalidGeometry(format!(
                "degenerate scale factors ({sx}, {sy})"
            )));
        }
        Ok(self.map_points(&|p| {
            Point::new(pivot.x + (p.x - pivot.x) * sx, pivot.y + (p.y - pivot.y) * sy)
        }))
    }

    /// Applies a homogeneous 2D affine matrix.
    pub fn transform(&self, matrix: &Matrix3<f64>) -> Result<Polygon> {
        let det = matrix[(0, 0)] * matrix[(1, 1)] - matrix[(0, 1)] * matrix[(1, 0)];
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return Err(Error::InvalidGeometry("singular transform".into()));
        }
        Ok(self.map_points(&|p| {
            Point::new(
                matrix[(0, 0)] * p.x + matrix[(0, 1)] * p.y + matrix[(0, 2)],
                matrix[(1, 0)] * p.x + matrix[(1, 1)] * p.y + matrix[(1, 2)],
            )
        }))
    }

    // ========================================================================
    // Derived shapes
    // ========================================================================

    /// Convex hull of the outer ring, clockwise.
    pub fn convex_hull(&self) -> Polygon {
        let hull = convex_hull_of(self.points.iter().copied());
        match Polygon::new(hull) {
            Ok(p) => {
                let mut p = p.ensure_orientation(true);
                p.id = self.id;
                p.source = self.source;
                p
            }
            Err(_) => self.rebuilt(self.points.clone()),
        }
    }

    /// Removes near-duplicate vertices and vertices within `tolerance` of the
    /// line through their neighbours. Returns a clone if cleaning would
    /// leave fewer than 3 points.
    pub fn cleaned(&self, tolerance: f64) -> Polygon {
        let ring = clean_ring(&self.points, tolerance);
        let mut out = if ring.len() >= 3 {
            self.rebuilt(ring)
        } else {
            self.rebuilt(self.points.clone())
        };
        out.children = self.children.iter().map(|c| c.cleaned(tolerance)).collect();
        out
    }

    /// Offsets the polygon outward (`delta > 0`) or inward (`delta < 0`).
    ///
    /// Each ring edge is swept by a disc approximated within `tolerance`;
    /// the swept hulls are added to (or removed from) the polygon.
    pub fn offset(&self, delta: f64, tolerance: f64, clipper: &Clipper) -> Vec<Polygon> {
        if delta.abs() < util::TOLERANCE {
            return vec![self.clone()];
        }
        let disc = disc_points(delta.abs(), tolerance);
        let mut sweeps = Vec::new();
        let mut rings: Vec<&[Point]> = vec![&self.points];
        rings.extend(self.children.iter().map(|c| c.points()));
        for ring in rings {
            let n = ring.len();
            for i in 0..n {
                let (p, q) = (ring[i], ring[(i + 1) % n]);
                let hull = convex_hull_of(disc.iter().map(|&d| p + d).chain(disc.iter().map(|&d| q + d)));
                if let Ok(poly) = Polygon::new(hull) {
                    sweeps.push(poly);
                }
            }
        }
        let kind = if delta > 0.0 {
            BooleanKind::Union
        } else {
            BooleanKind::Difference
        };
        clipper.execute(std::slice::from_ref(self), &sweeps, kind)
    }

    // ========================================================================
    // Boolean operations
    // ========================================================================

    pub fn union(&self, other: &Polygon) -> Vec<Polygon> {
        self.union_with(other, &Clipper::default())
    }

    pub fn intersection(&self, other: &Polygon) -> Vec<Polygon> {
        self.intersection_with(other, &Clipper::default())
    }

    pub fn difference(&self, other: &Polygon) -> Vec<Polygon> {
        self.difference_with(other, &Clipper::default())
    }

    pub fn xor(&self, other: &Polygon) -> Vec<Polygon> {
        self.xor_with(other, &Clipper::default())
    }

    pub fn minkowski_sum(&self, other: &Polygon) -> Vec<Polygon> {
        self.minkowski_sum_with(other, &Clipper::default())
    }

    pub fn union_with(&self, other: &Polygon, clipper: &Clipper) -> Vec<Polygon> {
        if !other.is_valid() {
            return vec![self.clone()];
        }
        let result = clipper.execute(std::slice::from_ref(self), std::slice::from_ref(other), BooleanKind::Union);
        if result.is_empty() {
            vec![self.clone()]
        } else {
            result
        }
    }

    pub fn intersection_with(&self, other: &Polygon, clipper: &Clipper) -> Vec<Polygon> {
        if !other.is_valid() || !self.bounds().intersects(&other.bounds()) {
            return Vec::new();
        }
        clipper.execute(
            std::slice::from_ref(self),
            std::slice::from_ref(other),
            BooleanKind::Intersection,
        )
    }

    pub fn difference_with(&self, other: &Polygon, clipper: &Clipper) -> Vec<Polygon> {
        if !other.is_valid() {
            return vec![self.clone()];
        }
        clipper.execute(
            std::slice::from_ref(self),
            std::slice::from_ref(other),
            BooleanKind::Difference,
        )
    }

    pub fn xor_with(&self, other: &Polygon, clipper: &Clipper) -> Vec<Polygon> {
        if !other.is_valid() {
            return vec![self.clone()];
        }
        clipper.execute(std::slice::from_ref(self), std::slice::from_ref(other), BooleanKind::Xor)
    }

    /// Minkowski sum of the outer rings (holes are ignored).
    pub fn minkowski_sum_with(&self, other: &Polygon, clipper: &Clipper) -> Vec<Polygon> {
        if !other.is_valid() {
            return vec![self.clone()];
        }
        let result = crate::minkowski::minkowski_sum(&self.points, &other.points, clipper);
        if result.is_empty() {
            vec![self.clone()]
        } else {
            result
        }
    }

    /// Applies operations left to right on the running result set.
    ///
    /// Returns an empty list as soon as an intermediate result is empty.
    pub fn batch_operations(&self, operations: &[BooleanOp<'_>]) -> Vec<Polygon> {
        self.batch_operations_with(operations, &Clipper::default())
    }

    pub fn batch_operations_with(
        &self,
        operations: &[BooleanOp<'_>],
        clipper: &Clipper,
    ) -> Vec<Polygon> {
        let mut current = vec![self.clone()];
        for op in operations {
            let (other, kind) = match *op {
                BooleanOp::Union(p) => (p, BooleanKind::Union),
                BooleanOp::Intersection(p) => (p, BooleanKind::Intersection),
                BooleanOp::Difference(p) => (p, BooleanKind::Difference),
                BooleanOp::Xor(p) => (p, BooleanKind::Xor),
            };
            if !other.is_valid() {
                if kind == BooleanKind::Intersection {
                    return Vec::new();
                }
                continue;
            }
            current = clipper.execute(&current, std::slice::from_ref(other), kind);
            if current.is_empty() {
                return Vec::new();
            }
        }
        current
    }
}

/// Convex hull of a point set via `geo`; the closing point is dropped.
pub(crate) fn convex_hull_of<I>(points: I) -> Vec<Point>
where
    I: IntoIterator<Item = Point>,
{
    let coords: Vec<Coord<f64>> = points.into_iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    if coords.len() < 3 {
        return coords.into_iter().map(|c| Point::new(c.x, c.y)).collect();
    }
    let hull = MultiPoint::from(coords).convex_hull();
    let ring: Vec<Point> = hull.exterior().coords().map(|c| Point::new(c.x, c.y)).collect();
    let keep = ring.len().saturating_sub(1);
    ring.into_iter().take(keep).collect()
}

/// Polygon circumscribing a disc of `radius` with sagitta within `tolerance`.
///
/// The segment count is a multiple of 4 and the vertices sit half a step off
/// the axes, so axis-aligned edges offset by exactly `radius`.
fn disc_points(radius: f64, tolerance: f64) -> Vec<Point> {
    let tolerance = tolerance.max(radius * 1e-3);
    let ratio = (1.0 - tolerance / radius).clamp(-1.0, 1.0);
    let segments = ((std::f64::consts::PI / ratio.acos()).ceil() as usize).clamp(8, 64);
    let segments = segments.div_ceil(4) * 4;
    let step = std::f64::consts::TAU / segments as f64;
    let outer = radius / (step / 2.0).cos();
    (0..segments)
        .map(|i| {
            let a = (i as f64 + 0.5) * step;
            Point::new(outer * a.cos(), outer * a.sin())
        })
        .collect()
}

fn clean_ring(points: &[Point], tolerance: f64) -> Vec<Point> {
    let mut ring: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last().map_or(true, |&last: &Point| !last.almost_eq(p, tolerance)) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring[0].almost_eq(ring[ring.len() - 1], tolerance) {
        ring.pop();
    }

    // Drop vertices lying on the segment joining their neighbours.
    let mut changed = true;
    while changed && ring.len() > 3 {
        changed = false;
        let n = ring.len();
        for i in 0..n {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            if util::point_segment_distance(ring[i], prev, next) < tolerance {
                ring.remove(i);
                changed = true;
                break;
            }
        }
    }
    ring
}
