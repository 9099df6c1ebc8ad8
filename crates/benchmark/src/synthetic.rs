//! Synthetic job generator for stress and edge case runs.
//!
//! Each job carries one square sheet type with enough material for every
//! part instance at roughly 50% utilisation.

use crate::job::{Job, Limits};
use rand::prelude::*;
use sheetnest_core::{Config, Result};
use sheetnest_d2::{Part, Polygon, Sheet};
use std::f64::consts::PI;

/// Generator for synthetic nesting jobs.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a generator with a fixed seed for reproducible jobs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Regular convex polygons of 3 to 8 sides.
    pub fn convex_only(&mut self, count: usize) -> Result<Job> {
        let mut parts = Vec::with_capacity(count);
        for id in 0..count {
            let sides = self.rng.gen_range(3..=8);
            let radius = self.rng.gen_range(5.0..20.0);
            let quantity = self.rng.gen_range(1..=5);
            parts.push(Part::new(regular_polygon(sides, radius)?, quantity).with_name(format!("convex_{}", id)));
        }
        finish_job("synthetic_convex", parts, Config::new())
    }

    /// Stars and L, T and cross shapes.
    pub fn concave_complex(&mut self, count: usize) -> Result<Job> {
        let mut parts = Vec::with_capacity(count);
        for id in 0..count {
            let polygon = match self.rng.gen_range(0..4) {
                0 => {
                    let points = self.rng.gen_range(5..=8);
                    self.star_polygon(points)?
                }
                1 => self.l_shape()?,
                2 => self.t_shape()?,
                _ => self.cross_shape()?,
            };
            let quantity = self.rng.gen_range(1..=3);
            parts.push(Part::new(polygon, quantity).with_name(format!("concave_{}", id)));
        }
        finish_job("synthetic_concave", parts, Config::new())
    }

    /// Regular polygons with a regular hole, mixed with small squares that
    /// fit inside the holes.
    pub fn with_holes(&mut self, count: usize) -> Result<Job> {
        let mut parts = Vec::with_capacity(count + 1);
        let mut smallest_hole = f64::INFINITY;
        for id in 0..count {
            let outer_radius = self.rng.gen_range(15.0..30.0);
            let hole_radius = self.rng.gen_range(outer_radius * 0.3..outer_radius * 0.5);
            let outer_sides = self.rng.gen_range(4..=8);
            let hole_sides = self.rng.gen_range(4..=6);
            let quantity = self.rng.gen_range(1..=3);
            smallest_hole = smallest_hole.min(hole_radius);

            let polygon = regular_polygon(outer_sides, outer_radius)?.with_child(regular_polygon(hole_sides, hole_radius)?);
            parts.push(Part::new(polygon, quantity).with_name(format!("holed_{}", id)));
        }
        if smallest_hole.is_finite() {
            // Small enough to sit inside the smallest hole.
            let inner = smallest_hole * (PI / 4.0).cos() * 0.5;
            parts.push(Part::new(Polygon::rectangle(inner, inner)?, count.max(1)).with_name("filler"));
        }
        finish_job("synthetic_with_holes", parts, Config::new())
    }

    /// Long thin and short wide rectangles, restricted to two rotations.
    pub fn extreme_aspect(&mut self, count: usize) -> Result<Job> {
        let mut parts = Vec::with_capacity(count);
        for id in 0..count {
            let thin = self.rng.gen_range(2.0..5.0);
            let long = self.rng.gen_range(40.0..80.0);
            let polygon = if self.rng.gen_bool(0.5) {
                Polygon::rectangle(thin, long)?
            } else {
                Polygon::rectangle(long, thin)?
            };
            let quantity = self.rng.gen_range(1..=3);
            parts.push(Part::new(polygon, quantity).with_name(format!("aspect_{}", id)));
        }
        finish_job("synthetic_extreme_aspect", parts, Config::new().with_rotations(2))
    }

    /// A mix of rectangles, regular polygons and L shapes, one of each
    /// instance, with spacing and merged cut lines enabled.
    pub fn mixed(&mut self, count: usize) -> Result<Job> {
        let mut parts = Vec::with_capacity(count);
        for id in 0..count {
            let polygon = match self.rng.gen_range(0..3) {
                0 => {
                    let sides = self.rng.gen_range(3..=6);
                    let radius = self.rng.gen_range(5.0..15.0);
                    regular_polygon(sides, radius)?
                }
                1 => {
                    let w = self.rng.gen_range(5.0..20.0);
                    let h = self.rng.gen_range(5.0..20.0);
                    Polygon::rectangle(w, h)?
                }
                _ => self.l_shape()?,
            };
            parts.push(Part::new(polygon, 1).with_name(format!("mixed_{}", id)));
        }
        let config = Config::new().with_spacing(1.0).with_merge_lines(true, 0.5);
        finish_job("synthetic_mixed", parts, config)
    }

    fn star_polygon(&mut self, points: usize) -> Result<Polygon> {
        let outer_radius = self.rng.gen_range(15.0..25.0);
        let inner_radius = outer_radius * self.rng.gen_range(0.3..0.5);

        let vertices: Vec<(f64, f64)> = (0..points * 2)
            .map(|i| {
                let angle = PI * i as f64 / points as f64 - PI / 2.0;
                let radius = if i % 2 == 0 { outer_radius } else { inner_radius };
                (radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        Polygon::from_xy(&vertices)
    }

    fn l_shape(&mut self) -> Result<Polygon> {
        let w = self.rng.gen_range(15.0..25.0);
        let h = self.rng.gen_range(15.0..25.0);
        let notch_w = w * self.rng.gen_range(0.4..0.6);
        let notch_h = h * self.rng.gen_range(0.4..0.6);

        Polygon::from_xy(&[
            (0.0, 0.0),
            (w, 0.0),
            (w, h - notch_h),
            (w - notch_w, h - notch_h),
            (w - notch_w, h),
            (0.0, h),
        ])
    }

    fn t_shape(&mut self) -> Result<Polygon> {
        let w = self.rng.gen_range(20.0..30.0);
        let h = self.rng.gen_range(20.0..30.0);
        let stem_w = w * 0.3;
        let stem_h = h * 0.6;
        let left = (w - stem_w) / 2.0;

        Polygon::from_xy(&[
            (0.0, h - stem_h),
            (left, h - stem_h),
            (left, 0.0),
            (left + stem_w, 0.0),
            (left + stem_w, h - stem_h),
            (w, h - stem_h),
            (w, h),
            (0.0, h),
        ])
    }

    fn cross_shape(&mut self) -> Result<Polygon> {
        let size = self.rng.gen_range(20.0..30.0);
        let arm = size * 0.3;
        let c = (size - arm) / 2.0;

        Polygon::from_xy(&[
            (c, 0.0),
            (c + arm, 0.0),
            (c + arm, c),
            (size, c),
            (size, c + arm),
            (c + arm, c + arm),
            (c + arm, size),
            (c, size),
            (c, c + arm),
            (0.0, c + arm),
            (0.0, c),
            (c, c),
        ])
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn regular_polygon(sides: usize, radius: f64) -> Result<Polygon> {
    let points: Vec<(f64, f64)> = (0..sides)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / sides as f64 - PI / 2.0;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    Polygon::from_xy(&points)
}

/// Sizes a square sheet to about twice the part area, never smaller than
/// the largest part in any rotation.
fn finish_job(name: &str, parts: Vec<Part>, config: Config) -> Result<Job> {
    let part_area: f64 = parts.iter().map(|p| p.area() * p.quantity as f64).sum();
    let largest = parts
        .iter()
        .map(|p| {
            let b = p.polygon.bounds();
            b.width.hypot(b.height)
        })
        .fold(0.0_f64, f64::max);
    let side = (2.0 * part_area).sqrt().max(largest * 1.1).ceil();

    let sheets = vec![Sheet::rectangle(side, side)?.with_name("stock")];
    let limits = Limits {
        max_generations: Some(10),
        time_limit_secs: Some(60),
    };
    Ok(Job::new(name, parts, sheets).with_config(config).with_limits(limits))
}

/// Predefined synthetic jobs.
pub struct SyntheticJobs;

impl SyntheticJobs {
    /// Generates every standard synthetic job.
    pub fn all(seed: u64) -> Result<Vec<Job>> {
        let mut gen = SyntheticGenerator::with_seed(seed);
        Ok(vec![
            gen.convex_only(12)?,
            gen.concave_complex(10)?,
            gen.with_holes(6)?,
            gen.extreme_aspect(12)?,
            gen.mixed(40)?,
        ])
    }

    pub fn names() -> &'static [&'static str] {
        &[
            "synthetic_convex",
            "synthetic_concave",
            "synthetic_with_holes",
            "synthetic_extreme_aspect",
            "synthetic_mixed",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_all_jobs_are_valid() {
        let jobs = SyntheticJobs::all(42).unwrap();
        let names: Vec<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, SyntheticJobs::names());
        for job in &jobs {
            assert!(job.validate().is_ok(), "{} is invalid", job.name);
            assert!(job.total_instances() > 0);
        }
    }

    #[test]
    fn test_sheet_holds_twice_the_part_area() {
        let mut gen = SyntheticGenerator::with_seed(1);
        let job = gen.convex_only(8).unwrap();
        let sheet_area = job.sheets[0].area();
        assert!(sheet_area >= 2.0 * job.total_part_area() - 1e-9);
    }

    #[test]
    fn test_reproducibility() {
        let a = SyntheticGenerator::with_seed(123).concave_complex(6).unwrap();
        let b = SyntheticGenerator::with_seed(123).concave_complex(6).unwrap();
        for (pa, pb) in a.parts.iter().zip(&b.parts) {
            assert_eq!(pa.quantity, pb.quantity);
            assert_relative_eq!(pa.area(), pb.area());
        }
    }

    #[test]
    fn test_holes_are_subtracted() {
        let job = SyntheticGenerator::with_seed(9).with_holes(3).unwrap();
        let holed = &job.parts[0];
        assert_eq!(holed.polygon.children().len(), 1);
        assert!(holed.area() < holed.polygon.area().abs());
        assert_eq!(job.parts.last().and_then(|p| p.name.as_deref()), Some("filler"));
    }

    #[test]
    fn test_extreme_aspect_uses_two_rotations() {
        let job = SyntheticGenerator::with_seed(5).extreme_aspect(4).unwrap();
        assert_eq!(job.config.rotations, 2);
    }
}
