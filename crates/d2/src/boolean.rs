//! Boolean polygon operations backed by `i_overlay`.
//!
//! Coordinates are snapped to a grid of `1 / scale` before clipping, which
//! keeps nearly coincident edges from producing slivers. Results come back
//! with clockwise outer rings (negative [`Polygon::area`]) and
//! counter-clockwise holes.

use crate::geometry::{Point, Polygon};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

/// Default integer scale applied before clipping.
pub const DEFAULT_CLIPPER_SCALE: f64 = 10_000_000.0;

/// The set operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    Union,
    Intersection,
    Difference,
    Xor,
}

impl BooleanKind {
    fn rule(self) -> OverlayRule {
        match self {
            BooleanKind::Union => OverlayRule::Union,
            BooleanKind::Intersection => OverlayRule::Intersect,
            BooleanKind::Difference => OverlayRule::Difference,
            BooleanKind::Xor => OverlayRule::Xor,
        }
    }
}

/// Boolean operation backend.
#[derive(Debug, Clone, Copy)]
pub struct Clipper {
    scale: f64,
}

impl Default for Clipper {
    fn default() -> Self {
        Self::new(DEFAULT_CLIPPER_SCALE)
    }
}

type Contour = Vec<[f64; 2]>;

impl Clipper {
    pub fn new(scale: f64) -> Self {
        let scale = if scale.is_finite() && scale >= 1.0 {
            scale
        } else {
            DEFAULT_CLIPPER_SCALE
        };
        Self { scale }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Snaps a coordinate to the clipping grid.
    #[inline]
    pub fn snap(&self, v: f64) -> f64 {
        (v * self.scale).round() / self.scale
    }

    /// Applies `kind` between the subject set and the clip set.
    ///
    /// Each input polygon contributes its outer ring and its holes.
    pub fn execute(&self, subject: &[Polygon], clip: &[Polygon], kind: BooleanKind) -> Vec<Polygon> {
        if subject.is_empty() {
            return match kind {
                BooleanKind::Union | BooleanKind::Xor => self.normalize(clip),
                BooleanKind::Intersection | BooleanKind::Difference => Vec::new(),
            };
        }
        if clip.is_empty() {
            return match kind {
                BooleanKind::Intersection => Vec::new(),
                _ => self.normalize(subject),
            };
        }

        let subject_contours = self.contours(subject);
        let clip_contours = self.contours(clip);
        let shapes = subject_contours.overlay(&clip_contours, kind.rule(), FillRule::NonZero);

        let tag = subject.first().map(|p| (p.id(), p.source()));
        self.collect(shapes, tag)
    }

    /// Union of every polygon in the set.
    pub fn union_all(&self, polygons: &[Polygon]) -> Vec<Polygon> {
        match polygons {
            [] => Vec::new(),
            [single] => self.normalize(std::slice::from_ref(single)),
            [first, rest @ ..] => self.execute(std::slice::from_ref(first), rest, BooleanKind::Union),
        }
    }

    /// Resolves self-overlaps within one set of polygons.
    fn normalize(&self, polygons: &[Polygon]) -> Vec<Polygon> {
        if polygons.is_empty() {
            return Vec::new();
        }
        let contours = self.contours(polygons);
        let shapes = contours.overlay(&Vec::<Contour>::new(), OverlayRule::Subject, FillRule::NonZero);
        let tag = polygons.first().map(|p| (p.id(), p.source()));
        self.collect(shapes, tag)
    }

    /// Flattens polygon trees into snapped contours, outer rings
    /// counter-clockwise in the mathematical frame and holes clockwise.
    fn contours(&self, polygons: &[Polygon]) -> Vec<Contour> {
        let mut out = Vec::new();
        for polygon in polygons {
            let oriented = polygon.ensure_orientation(true);
            out.push(self.snap_ring(oriented.points()));
            for hole in oriented.children() {
                out.push(self.snap_ring(hole.points()));
            }
        }
        out
    }

    fn snap_ring(&self, points: &[Point]) -> Contour {
        points.iter().map(|p| [self.snap(p.x), self.snap(p.y)]).collect()
    }

    fn collect(&self, shapes: Vec<Vec<Contour>>, tag: Option<(Option<i64>, Option<i64>)>) -> Vec<Polygon> {
        let min_area = 1.0 / self.scale;
        let mut out = Vec::with_capacity(shapes.len());
        for shape in shapes {
            let mut rings = shape.into_iter().filter_map(|contour| {
                let points = contour
                    .into_iter()
                    .map(|[x, y]| Point::new(self.snap(x), self.snap(y)))
                    .collect();
                Polygon::new(points).ok().filter(|p| p.area().abs() > min_area)
            });
            let Some(outer) = rings.next() else {
                continue;
            };
            let mut polygon = outer.with_children(rings.collect());
            if let Some((id, source)) = tag {
                if let Some(id) = id {
                    polygon = polygon.with_id(id);
                }
                if let Some(source) = source {
                    polygon = polygon.with_source(source);
                }
            }
            out.push(polygon.ensure_orientation(true));
        }
        out
    }
}
