//! Placement engine: turns an ordered, rotated part list into a layout.
//!
//! Sheets are filled one copy at a time. For each part in gene order the
//! feasible region on the current sheet is the part's inner-fit region minus
//! the NFPs of everything already placed there; the placement heuristic picks
//! one vertex of that region. Parts that fit nowhere on the sheet wait for
//! the next one, and whatever is left after the last sheet is unplaced.

use crate::boolean::BooleanKind;
use crate::context::NestContext;
use crate::geometry::{convex_hull_of, Bounds, Point, Polygon};
use crate::merge::merged_length;
use crate::part::PreparedSheet;
use crate::util::{self, PointInPolygon};
use rayon::prelude::*;
use sheetnest_core::{NestResult, PermutationChromosome, Placement, PlacementType, SheetPlacement, UnplacedPart};

/// Penalty weight of unplaced area relative to total sheet area.
const UNPLACED_WEIGHT: f64 = 1e8;

/// One part instance with its chosen rotation option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Item {
    part: usize,
    instance: usize,
    option: usize,
}

#[derive(Debug, Clone)]
struct Placed {
    item: Item,
    position: Point,
}

/// State of the sheet being filled.
struct SheetLayout<'a> {
    sheet: &'a PreparedSheet,
    placed: Vec<Placed>,
    bounds: Option<Bounds>,
    hull: Vec<Point>,
}

impl<'a> SheetLayout<'a> {
    fn new(sheet: &'a PreparedSheet) -> Self {
        Self {
            sheet,
            placed: Vec::new(),
            bounds: None,
            hull: Vec::new(),
        }
    }

    fn commit(&mut self, item: Item, position: Point, shape: Polygon) {
        let b = shape.bounds();
        self.bounds = Some(self.bounds.map_or(b, |current| current.union(&b)));
        self.hull = convex_hull_of(self.hull.iter().copied().chain(shape.points().iter().copied()));
        self.placed.push(Placed { item, position });
    }
}

/// Lays out `individual` and scores the result.
///
/// `on_progress` receives the fraction of part instances processed.
pub fn place_individual<F>(ctx: &NestContext, individual: &PermutationChromosome, mut on_progress: F) -> NestResult
where
    F: FnMut(f64),
{
    let config = ctx.config();
    let mut remaining: Vec<Item> = individual
        .genes
        .iter()
        .filter_map(|&gene| {
            let instance = ctx.instances().get(gene)?;
            let part = &ctx.parts()[instance.part];
            let option = individual.rotations.get(gene).copied().unwrap_or(0) % part.shapes.len();
            Some(Item {
                part: instance.part,
                instance: instance.instance,
                option,
            })
        })
        .collect();

    let total = remaining.len().max(1) as f64;
    let mut done = 0usize;
    let mut tick = || {
        done += 1;
        on_progress(done as f64 / total);
    };

    let mut result = NestResult::empty();
    let mut fitness = 0.0;
    let mut perimeter = 0.0;
    let max_merge_distance = config.scaled_spacing() + config.scaled_curve_tolerance();

    'sheets: for sheet in ctx.sheets() {
        for copy in 0..sheet.quantity {
            if remaining.is_empty() {
                break 'sheets;
            }
            let layout = fill_sheet(ctx, sheet, &mut remaining, &mut tick);
            if layout.placed.is_empty() {
                // Further copies of this sheet would stay empty too.
                continue 'sheets;
            }

            result.area += sheet.area;
            fitness += sheet.area;
            perimeter += sheet.perimeter;
            if let Some(bounds) = layout.bounds {
                fitness += bounds.area() / sheet.area;
            }

            if config.merge_lines {
                let rings: Vec<Vec<Point>> = layout
                    .placed
                    .iter()
                    .map(|p| {
                        let part = &ctx.parts()[p.item.part];
                        part.original
                            .rotate(part.rotation(p.item.option))
                            .translate(p.position.x, p.position.y)
                            .points()
                            .to_vec()
                    })
                    .collect();
                result.merged_length += merged_length(&rings, max_merge_distance);
            }

            let mut placements = Vec::with_capacity(layout.placed.len());
            for p in &layout.placed {
                let part = &ctx.parts()[p.item.part];
                result.total_area += part.area;
                placements.push(Placement::new(
                    p.item.part,
                    p.item.instance,
                    sheet.index,
                    p.position.x,
                    p.position.y,
                    part.rotation(p.item.option),
                ));
            }
            result.placements.push(SheetPlacement {
                sheet_id: sheet.index,
                sheet_instance: copy,
                placements,
            });
        }
    }

    let unplaced_area: f64 = remaining.iter().map(|item| ctx.parts()[item.part].area).sum();
    if ctx.total_sheet_area() > 0.0 {
        fitness += UNPLACED_WEIGHT * unplaced_area / ctx.total_sheet_area();
    }
    if config.merge_lines && perimeter > 0.0 {
        fitness -= config.time_ratio * result.merged_length / perimeter;
    }
    result.unplaced = remaining
        .iter()
        .map(|item| UnplacedPart {
            part_id: item.part,
            instance: item.instance,
        })
        .collect();
    for _ in 0..remaining.len() {
        tick();
    }

    result.fitness = fitness;
    result.utilisation = if result.area > 0.0 {
        result.total_area / result.area
    } else {
        0.0
    };
    result
}

/// Places as many of `remaining` as fit on one copy of `sheet`, in order.
fn fill_sheet<'a>(
    ctx: &NestContext,
    sheet: &'a PreparedSheet,
    remaining: &mut Vec<Item>,
    tick: &mut dyn FnMut(),
) -> SheetLayout<'a> {
    let mut layout = SheetLayout::new(sheet);
    let mut left = Vec::new();
    for item in remaining.drain(..) {
        match find_position(ctx, &layout, item) {
            Some(position) => {
                let shape = ctx.parts()[item.part]
                    .shape(item.option)
                    .translate(position.x, position.y);
                layout.commit(item, position, shape);
                tick();
            }
            None => left.push(item),
        }
    }
    *remaining = left;
    layout
}

/// Best translation for `item` on the layout, if any exists.
fn find_position(ctx: &NestContext, layout: &SheetLayout<'_>, item: Item) -> Option<Point> {
    let ifp = ctx.inner_nfp(layout.sheet, item.part, item.option);
    if ifp.is_empty() {
        return None;
    }

    let mut candidates: Vec<Point> = Vec::new();
    if layout.placed.is_empty() {
        for polygon in &ifp.polygons {
            push_vertices(polygon, &mut candidates);
        }
        candidates.extend(ifp.points.iter().copied());
    } else {
        let nfps = ctx.install(|| {
            layout
                .placed
                .par_iter()
                .map(|p| ctx.outer_nfp(p.item.part, p.item.option, item.part, item.option))
                .collect::<Vec<_>>()
        });
        let forbidden: Vec<Polygon> = nfps
            .iter()
            .zip(&layout.placed)
            .flat_map(|(nfp, p)| {
                nfp.polygons
                    .iter()
                    .map(move |poly| poly.translate(p.position.x, p.position.y))
            })
            .collect();

        let feasible = ctx
            .clipper()
            .execute(&ifp.polygons, &forbidden, BooleanKind::Difference);
        for polygon in &feasible {
            push_vertices(polygon, &mut candidates);
        }
        candidates.extend(touch_candidates(&ifp.points, &forbidden));
    }

    let shape = ctx.parts()[item.part].shape(item.option);
    let heuristic = ctx.config().placement;
    let mut best: Option<(Point, [f64; 3])> = None;
    for candidate in candidates {
        let key = score(heuristic, layout, shape, candidate);
        if best.as_ref().map_or(true, |(_, best_key)| better(&key, best_key)) {
            best = Some((candidate, key));
        }
    }
    best.map(|(p, _)| p)
}

/// Free positions on a degenerate inner-fit region (a point or a segment).
///
/// Along a segment the candidates are its ends and every crossing with an
/// obstacle boundary.
fn touch_candidates(points: &[Point], forbidden: &[Polygon]) -> Vec<Point> {
    let mut candidates = points.to_vec();
    if let [a, b] = *points {
        for polygon in forbidden {
            let mut rings = vec![polygon.points()];
            rings.extend(polygon.children().iter().map(|c| c.points()));
            for ring in rings {
                let n = ring.len();
                for i in 0..n {
                    let (p, q) = (ring[i], ring[(i + 1) % n]);
                    candidates.extend(util::line_intersect(a, b, p, q, false));
                    if util::point_segment_distance(p, a, b) < util::TOLERANCE {
                        candidates.push(p);
                    }
                }
            }
        }
    }
    candidates.retain(|&p| {
        !forbidden
            .iter()
            .any(|f| f.contains_point(p) == PointInPolygon::Inside)
    });
    candidates
}

fn push_vertices(polygon: &Polygon, out: &mut Vec<Point>) {
    out.extend_from_slice(polygon.points());
    for hole in polygon.children() {
        out.extend_from_slice(hole.points());
    }
}

/// Lexicographic key of a candidate; smaller is better.
fn score(heuristic: PlacementType, layout: &SheetLayout<'_>, shape: &Polygon, at: Point) -> [f64; 3] {
    match heuristic {
        PlacementType::Gravity => [at.y, at.x, 0.0],
        PlacementType::BoundingBox => {
            let b = shape.bounds().translate(at.x, at.y);
            let grown = layout.bounds.map_or(b, |current| current.union(&b));
            [grown.area(), at.y, at.x]
        }
        PlacementType::ConvexHull => {
            let moved = shape.points().iter().map(|&p| Point::new(p.x + at.x, p.y + at.y));
            let hull = convex_hull_of(layout.hull.iter().copied().chain(moved));
            [util::polygon_area(&hull).abs(), at.y, at.x]
        }
    }
}

fn better(a: &[f64; 3], b: &[f64; 3]) -> bool {
    for (x, y) in a.iter().zip(b) {
        let scale = x.abs().max(y.abs()).max(1.0);
        if (x - y).abs() > util::TOLERANCE * scale {
            return x < y;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{Part, Sheet};
    use approx::assert_relative_eq;
    use sheetnest_core::Config;

    fn ctx(parts: Vec<Part>, sheets: Vec<Sheet>, config: Config) -> NestContext {
        NestContext::new(&parts, &sheets, config.with_threads(2)).unwrap()
    }

    fn identity(n: usize) -> PermutationChromosome {
        PermutationChromosome::from_parts((0..n).collect(), vec![0; n])
    }

    fn square_part(size: f64, quantity: usize) -> Part {
        Part::new(Polygon::rectangle(size, size).unwrap(), quantity)
    }

    #[test]
    fn test_gravity_fills_rows() {
        let c = ctx(
            vec![square_part(10.0, 3)],
            vec![Sheet::rectangle(25.0, 25.0).unwrap()],
            Config::new().with_rotations(1),
        );
        let result = place_individual(&c, &identity(3), |_| {});
        assert!(result.all_placed());
        let positions: Vec<(f64, f64)> = result.iter_placements().map(|p| (p.x, p.y)).collect();
        assert_relative_eq!(positions[0].0, 0.0, epsilon = 1e-6);
        assert_relative_eq!(positions[0].1, 0.0, epsilon = 1e-6);
        assert_relative_eq!(positions[1].0, 10.0, epsilon = 1e-6);
        assert_relative_eq!(positions[1].1, 0.0, epsilon = 1e-6);
        // The third square no longer fits the first row.
        assert_relative_eq!(positions[2].0, 0.0, epsilon = 1e-6);
        assert_relative_eq!(positions[2].1, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_second_sheet_opened() {
        let c = ctx(
            vec![square_part(10.0, 2)],
            vec![Sheet::rectangle(12.0, 12.0).unwrap().with_quantity(2)],
            Config::new().with_rotations(1),
        );
        let result = place_individual(&c, &identity(2), |_| {});
        assert!(result.all_placed());
        assert_eq!(result.sheets_used(), 2);
        assert_eq!(result.placements[1].sheet_instance, 1);
        assert_relative_eq!(result.area, 288.0);
        assert_relative_eq!(result.utilisation, 200.0 / 288.0);
    }

    #[test]
    fn test_unplaced_dominates_fitness() {
        let c = ctx(
            vec![square_part(10.0, 2)],
            vec![Sheet::rectangle(12.0, 12.0).unwrap()],
            Config::new().with_rotations(1),
        );
        let result = place_individual(&c, &identity(2), |_| {});
        assert_eq!(result.placed_count(), 1);
        assert_eq!(result.unplaced.len(), 1);
        assert!(result.fitness > 1e7);
    }

    #[test]
    fn test_oversized_part_unplaced_without_opening_sheets() {
        let c = ctx(
            vec![square_part(30.0, 1)],
            vec![Sheet::rectangle(12.0, 12.0).unwrap().with_quantity(3)],
            Config::new().with_rotations(1),
        );
        let result = place_individual(&c, &identity(1), |_| {});
        assert_eq!(result.sheets_used(), 0);
        assert_eq!(result.unplaced.len(), 1);
        assert_eq!(result.utilisation, 0.0);
    }

    #[test]
    fn test_progress_reaches_one() {
        let c = ctx(
            vec![square_part(10.0, 3)],
            vec![Sheet::rectangle(25.0, 12.0).unwrap()],
            Config::new().with_rotations(1),
        );
        let mut seen = Vec::new();
        place_individual(&c, &identity(3), |f| seen.push(f));
        assert_eq!(seen.len(), 3);
        assert_relative_eq!(*seen.last().unwrap(), 1.0);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_heuristics_keep_parts_inside() {
        for heuristic in [PlacementType::BoundingBox, PlacementType::ConvexHull] {
            let c = ctx(
                vec![square_part(10.0, 4), Part::new(Polygon::rectangle(20.0, 5.0).unwrap(), 2)],
                vec![Sheet::rectangle(40.0, 40.0).unwrap()],
                Config::new().with_rotations(2).with_placement(heuristic),
            );
            let result = place_individual(&c, &identity(6), |_| {});
            assert!(result.all_placed(), "{heuristic:?}");
            for p in result.iter_placements() {
                assert!(p.x >= -1e-6 && p.y >= -1e-6, "{heuristic:?} {p:?}");
            }
        }
    }

    #[test]
    fn test_merge_lines_reward() {
        let config = Config::new().with_rotations(1).with_merge_lines(true, 1.0);
        let c = ctx(vec![square_part(10.0, 2)], vec![Sheet::rectangle(30.0, 10.0).unwrap()], config);
        let result = place_individual(&c, &identity(2), |_| {});
        assert_relative_eq!(result.merged_length, 10.0, epsilon = 1e-6);

        let plain = ctx(
            vec![square_part(10.0, 2)],
            vec![Sheet::rectangle(30.0, 10.0).unwrap()],
            Config::new().with_rotations(1),
        );
        let baseline = place_individual(&plain, &identity(2), |_| {});
        assert!(result.fitness < baseline.fitness);
    }

    #[test]
    fn test_better_is_lexicographic() {
        assert!(better(&[1.0, 5.0, 0.0], &[2.0, 0.0, 0.0]));
        assert!(better(&[1.0, 0.0, 0.0], &[1.0, 1.0, 0.0]));
        assert!(!better(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]));
    }
}
