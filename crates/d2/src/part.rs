//! Parts, sheets, and their nesting-ready forms.
//!
//! Callers describe parts and sheets in their own geometry. Before a run
//! they are prepared once: parts are grown by half the spacing (or replaced
//! by their hull when simplifying) and rotated into every allowed angle,
//! sheets are shrunk to the region usable after margins.

use crate::boolean::Clipper;
use crate::geometry::{Bounds, Polygon};
use serde::{Deserialize, Serialize};
use sheetnest_core::{Config, Error, Result};

fn one() -> usize {
    1
}

/// A part to nest, with its holes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub polygon: Polygon,
    #[serde(default = "one")]
    pub quantity: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Part {
    pub fn new(polygon: Polygon, quantity: usize) -> Self {
        Self {
            polygon,
            quantity,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Material area (holes excluded).
    pub fn area(&self) -> f64 {
        self.polygon.net_area()
    }
}

/// A material sheet. Its outline need not be rectangular.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub polygon: Polygon,
    /// Distance kept clear along the sheet boundary, in measurement units.
    #[serde(default)]
    pub margin: f64,
    #[serde(default = "one")]
    pub quantity: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Sheet {
    pub fn new(polygon: Polygon, quantity: usize) -> Self {
        Self {
            polygon,
            margin: 0.0,
            quantity,
            name: None,
        }
    }

    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        Polygon::rectangle(width, height)
            .map(|p| Self::new(p, 1))
            .map_err(|e| Error::InvalidSheet(e.to_string()))
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_quantity(mut self, quantity: usize) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn width(&self) -> f64 {
        self.polygon.bounds().width
    }

    pub fn height(&self) -> f64 {
        self.polygon.bounds().height
    }

    pub fn area(&self) -> f64 {
        self.polygon.net_area()
    }
}

/// A part in nesting form.
#[derive(Debug, Clone)]
pub struct PreparedPart {
    /// Position in the caller's part list.
    pub index: usize,
    pub quantity: usize,
    /// Nesting outline in the part's own frame (unrotated).
    pub outline: Polygon,
    /// Outer ring of the caller's geometry, for merged-line detection.
    pub original: Polygon,
    /// Signature of `outline`; identical outlines share NFPs.
    pub signature: u64,
    /// Material area of one instance.
    pub area: f64,
    /// Rotation angle of each option, in degrees.
    pub rotations: Vec<f64>,
    /// `outline` rotated by each option.
    pub shapes: Vec<Polygon>,
    /// Options whose rotated bounds fit at least one sheet.
    pub fitting: Vec<usize>,
}

impl PreparedPart {
    pub fn shape(&self, option: usize) -> &Polygon {
        &self.shapes[option % self.shapes.len()]
    }

    pub fn rotation(&self, option: usize) -> f64 {
        self.rotations[option % self.rotations.len()]
    }
}

/// A sheet in nesting form.
#[derive(Debug, Clone)]
pub struct PreparedSheet {
    pub index: usize,
    pub quantity: usize,
    /// Region available to part outlines.
    pub region: Polygon,
    pub signature: u64,
    /// Area of the full sheet.
    pub area: f64,
    /// Perimeter of the full sheet.
    pub perimeter: f64,
}

impl PreparedSheet {
    pub fn bounds(&self) -> Bounds {
        self.region.bounds()
    }
}

/// Keeps the largest piece of an offset result.
fn largest(polygons: Vec<Polygon>) -> Option<Polygon> {
    polygons
        .into_iter()
        .max_by(|a, b| a.net_area().total_cmp(&b.net_area()))
}

pub fn prepare_sheets(sheets: &[Sheet], config: &Config, clipper: &Clipper) -> Result<Vec<PreparedSheet>> {
    if sheets.is_empty() {
        return Err(Error::InvalidSheet("no sheets given".into()));
    }
    let tolerance = config.scaled_curve_tolerance();
    let mut prepared = Vec::with_capacity(sheets.len());

    for (index, sheet) in sheets.iter().enumerate() {
        if !sheet.polygon.is_valid() {
            return Err(Error::InvalidSheet(format!("sheet {index} has invalid geometry")));
        }
        if !sheet.margin.is_finite() {
            return Err(Error::InvalidSheet(format!("sheet {index} has a non-finite margin")));
        }
        if sheet.quantity == 0 {
            log::warn!("sheet {} has quantity 0 and will not be used", index);
            continue;
        }

        let inset = sheet.margin * config.scale - config.scaled_spacing() / 2.0;
        let base = sheet.polygon.ensure_orientation(true);
        let region = largest(base.offset(-inset, tolerance, clipper))
            .map(|r| r.cleaned(tolerance.min(1e-6 * config.scale)))
            .ok_or_else(|| Error::InvalidSheet(format!("sheet {index} has no usable area after margins")))?;

        prepared.push(PreparedSheet {
            index,
            quantity: sheet.quantity,
            signature: region.signature(),
            region,
            area: sheet.polygon.net_area(),
            perimeter: sheet.polygon.perimeter(),
        });
    }

    if prepared.is_empty() {
        return Err(Error::InvalidSheet("every sheet has quantity 0".into()));
    }
    Ok(prepared)
}

pub fn prepare_parts(
    parts: &[Part],
    sheets: &[PreparedSheet],
    config: &Config,
    clipper: &Clipper,
) -> Result<Vec<PreparedPart>> {
    let tolerance = config.scaled_curve_tolerance();
    let angles = config.rotation_angles();
    let mut prepared = Vec::with_capacity(parts.len());

    for (index, part) in parts.iter().enumerate() {
        if !part.polygon.is_valid() {
            return Err(Error::InvalidGeometry(format!("part {index} has invalid geometry")));
        }

        let base = part.polygon.ensure_orientation(true);
        let base = if config.simplify {
            base.convex_hull()
        } else {
            base.cleaned(tolerance)
        };
        let outline = largest(base.offset(config.scaled_spacing() / 2.0, tolerance, clipper))
            .ok_or_else(|| Error::InvalidGeometry(format!("part {index} vanished when offset")))?
            .ensure_orientation(true);

        let shapes: Vec<Polygon> = angles.iter().map(|&a| outline.rotate(a)).collect();
        let mut fitting: Vec<usize> = shapes
            .iter()
            .enumerate()
            .filter(|(_, shape)| {
                let b = shape.bounds();
                sheets.iter().any(|s| s.bounds().can_contain(&b, 1e-9))
            })
            .map(|(i, _)| i)
            .collect();
        if fitting.is_empty() {
            log::warn!("part {} fits no sheet in any rotation", index);
            fitting = (0..shapes.len()).collect();
        }

        prepared.push(PreparedPart {
            index,
            quantity: part.quantity,
            signature: outline.signature(),
            original: Polygon::from_ring_unchecked(part.polygon.points().to_vec()),
            outline,
            area: part.area(),
            rotations: angles.clone(),
            shapes,
            fitting,
        });
    }
    Ok(prepared)
}
