//! Nesting configuration.

use crate::{Error, Result};
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Heuristic used to pick a point inside the feasible placement region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PlacementType {
    /// Lowest, then left-most feasible point (bottom-left fill).
    #[default]
    Gravity,
    /// Point minimizing the growth of the placed set's bounding box.
    #[cfg_attr(feature = "serde", serde(alias = "box"))]
    BoundingBox,
    /// Point minimizing the convex hull area of the placed set.
    ConvexHull,
}

impl PlacementType {
    /// Parses the short names used by job files and the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gravity" => Some(Self::Gravity),
            "box" | "boundingbox" => Some(Self::BoundingBox),
            "convexhull" | "hull" => Some(Self::ConvexHull),
            _ => None,
        }
    }
}

/// Configuration for a nesting session.
///
/// Build with [`Config::new`] and the `with_*` methods, then call
/// [`Config::validate`]; sessions refuse configurations that do not validate.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Geometry units per measurement unit. Spacing, margins and the curve
    /// tolerance are given in measurement units and multiplied by this.
    pub scale: f64,

    /// Minimum distance between parts.
    pub spacing: f64,

    /// Maximum deviation allowed when flattening curves and cleaning outlines.
    pub curve_tolerance: f64,

    /// Integer scale applied to coordinates before boolean clipping.
    pub clipper_scale: f64,

    /// Number of evenly spaced rotations over 360 degrees.
    pub rotations: u32,

    /// GA population size.
    pub population_size: usize,

    /// Per-gene mutation probability (0.0 - 1.0).
    pub mutation_rate: f64,

    /// Number of worker threads.
    pub threads: usize,

    /// Placement heuristic.
    pub placement: PlacementType,

    /// Reward layouts that share cut edges between adjacent parts.
    pub merge_lines: bool,

    /// Weight of merged cut length against material usage.
    pub time_ratio: f64,

    /// Nest convex hulls instead of exact outlines.
    pub simplify: bool,

    /// Search for additional NFP loops (interlocking positions).
    pub explore_concave: bool,

    /// Seed for deterministic runs (None = entropy).
    pub seed: Option<u64>,

    /// Stop after this many generations (None = run until stopped).
    pub max_generations: Option<u32>,

    /// Directory for the on-disk NFP cache (None = memory only).
    pub cache_dir: Option<PathBuf>,

    /// Upper bound on sliding steps per NFP loop, multiplied by the total
    /// vertex count of the pair.
    pub nfp_step_limit: usize,

    /// Number of best results retained by a session.
    pub result_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale: 1.0,
            spacing: 0.0,
            curve_tolerance: 0.3,
            clipper_scale: 10_000_000.0,
            rotations: 4,
            population_size: 10,
            mutation_rate: 0.1,
            threads: 4,
            placement: PlacementType::Gravity,
            merge_lines: false,
            time_ratio: 0.5,
            simplify: false,
            explore_concave: false,
            seed: None,
            max_generations: None,
            cache_dir: None,
            nfp_step_limit: 10,
            result_history: 10,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the measurement scale.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the spacing between parts.
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets the curve tolerance.
    pub fn with_curve_tolerance(mut self, tolerance: f64) -> Self {
        self.curve_tolerance = tolerance;
        self
    }

    /// Sets the clipping scale.
    pub fn with_clipper_scale(mut self, scale: f64) -> Self {
        self.clipper_scale = scale;
        self
    }

    /// Sets the number of allowed rotations.
    pub fn with_rotations(mut self, rotations: u32) -> Self {
        self.rotations = rotations;
        self
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    /// Sets the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the placement heuristic.
    pub fn with_placement(mut self, placement: PlacementType) -> Self {
        self.placement = placement;
        self
    }

    /// Enables merged-line scoring with the given time ratio.
    pub fn with_merge_lines(mut self, enabled: bool, time_ratio: f64) -> Self {
        self.merge_lines = enabled;
        self.time_ratio = time_ratio;
        self
    }

    /// Enables convex hull approximation of parts.
    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    /// Enables the search for additional NFP loops.
    pub fn with_explore_concave(mut self, explore: bool) -> Self {
        self.explore_concave = explore;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Limits the number of generations.
    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.max_generations = Some(generations);
        self
    }

    /// Enables the on-disk NFP cache.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Sets how many best results a session keeps.
    pub fn with_result_history(mut self, count: usize) -> Self {
        self.result_history = count;
        self
    }

    /// Checks the configuration for invalid values and combinations.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl Into<String>) -> Result<()> {
            Err(Error::InvalidConfig(msg.into()))
        }

        if !(self.scale.is_finite() && self.scale > 0.0) {
            return invalid(format!("scale must be positive, got {}", self.scale));
        }
        if !(self.spacing.is_finite() && self.spacing >= 0.0) {
            return invalid(format!("spacing must be non-negative, got {}", self.spacing));
        }
        if !(self.curve_tolerance.is_finite() && self.curve_tolerance > 0.0) {
            return invalid(format!(
                "curve tolerance must be positive, got {}",
                self.curve_tolerance
            ));
        }
        if !(self.clipper_scale.is_finite() && self.clipper_scale >= 1.0) {
            return invalid(format!(
                "clipper scale must be at least 1, got {}",
                self.clipper_scale
            ));
        }
        if self.rotations == 0 {
            return invalid("rotations must be at least 1");
        }
        if self.population_size < 2 {
            return invalid(format!(
                "population size must be at least 2, got {}",
                self.population_size
            ));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return invalid(format!(
                "mutation rate must be within [0, 1], got {}",
                self.mutation_rate
            ));
        }
        if self.threads == 0 {
            return invalid("threads must be at least 1");
        }
        if !(self.time_ratio.is_finite() && self.time_ratio >= 0.0) {
            return invalid(format!(
                "time ratio must be non-negative, got {}",
                self.time_ratio
            ));
        }
        if self.nfp_step_limit == 0 {
            return invalid("NFP step limit must be at least 1");
        }
        if self.max_generations == Some(0) {
            return invalid("max generations must be at least 1 when set");
        }
        Ok(())
    }

    /// Spacing in geometry units.
    pub fn scaled_spacing(&self) -> f64 {
        self.spacing * self.scale
    }

    /// Curve tolerance in geometry units.
    pub fn scaled_curve_tolerance(&self) -> f64 {
        self.curve_tolerance * self.scale
    }

    /// Evenly spaced rotation angles in degrees.
    pub fn rotation_angles(&self) -> Vec<f64> {
        let step = 360.0 / self.rotations.max(1) as f64;
        (0..self.rotations.max(1)).map(|k| k as f64 * step).collect()
    }

    /// The subset of settings that changes computed geometry.
    ///
    /// Two configurations with equal fingerprints produce identical NFPs,
    /// so a cache built under one stays valid under the other.
    pub fn geometry_fingerprint(&self) -> GeometryFingerprint {
        GeometryFingerprint {
            scale: self.scale.to_bits(),
            spacing: self.spacing.to_bits(),
            curve_tolerance: self.curve_tolerance.to_bits(),
            clipper_scale: self.clipper_scale.to_bits(),
            simplify: self.simplify,
        }
    }
}

/// Bitwise identity of the geometry-affecting configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryFingerprint {
    scale: u64,
    spacing: u64,
    curve_tolerance: u64,
    clipper_scale: u64,
    simplify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = Config::new().with_threads(0).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::new().with_population_size(1).validate().is_err());
        assert!(Config::new().with_mutation_rate(1.5).validate().is_err());
        assert!(Config::new().with_rotations(0).validate().is_err());
        assert!(Config::new().with_spacing(-1.0).validate().is_err());
        assert!(Config::new().with_curve_tolerance(0.0).validate().is_err());
        assert!(Config::new().with_clipper_scale(0.5).validate().is_err());
        assert!(Config::new().with_merge_lines(true, -0.1).validate().is_err());
        assert!(Config::new().with_max_generations(0).validate().is_err());
    }

    #[test]
    fn test_rotation_angles() {
        let config = Config::new().with_rotations(4);
        assert_eq!(config.rotation_angles(), vec![0.0, 90.0, 180.0, 270.0]);

        let config = Config::new().with_rotations(1);
        assert_eq!(config.rotation_angles(), vec![0.0]);
    }

    #[test]
    fn test_geometry_fingerprint() {
        let a = Config::new();
        let b = Config::new().with_population_size(40).with_threads(8);
        assert_eq!(a.geometry_fingerprint(), b.geometry_fingerprint());

        let c = Config::new().with_spacing(2.0);
        assert_ne!(a.geometry_fingerprint(), c.geometry_fingerprint());

        let d = Config::new().with_curve_tolerance(0.1);
        assert_ne!(a.geometry_fingerprint(), d.geometry_fingerprint());
    }

    #[test]
    fn test_placement_type_names() {
        assert_eq!(PlacementType::from_name("gravity"), Some(PlacementType::Gravity));
        assert_eq!(PlacementType::from_name("Box"), Some(PlacementType::BoundingBox));
        assert_eq!(
            PlacementType::from_name("convexhull"),
            Some(PlacementType::ConvexHull)
        );
        assert_eq!(PlacementType::from_name("random"), None);
    }

    #[test]
    fn test_scaled_values() {
        let config = Config::new().with_scale(72.0).with_spacing(0.5);
        assert_eq!(config.scaled_spacing(), 36.0);
    }
}
