//! Nest result representation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The committed location of one part instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    /// Index of the part in the session's part list.
    pub part_id: usize,

    /// Instance index (0-based) when the part has a quantity above one.
    pub instance: usize,

    /// Index of the sheet in the session's sheet list.
    pub sheet_id: usize,

    /// Translation applied to the rotated part.
    pub x: f64,
    pub y: f64,

    /// Rotation in degrees, applied about the part's local origin before translating.
    pub rotation: f64,
}

impl Placement {
    /// Creates a new placement.
    pub fn new(part_id: usize, instance: usize, sheet_id: usize, x: f64, y: f64, rotation: f64) -> Self {
        Self {
            part_id,
            instance,
            sheet_id,
            x,
            y,
            rotation,
        }
    }
}

/// Placements on one opened sheet instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SheetPlacement {
    /// Index of the sheet in the session's sheet list.
    pub sheet_id: usize,

    /// Which copy of that sheet (0-based, bounded by its quantity).
    pub sheet_instance: usize,

    /// Parts placed on this sheet, in placement order.
    pub placements: Vec<Placement>,
}

/// A part instance that could not be placed on any sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnplacedPart {
    pub part_id: usize,
    pub instance: usize,
}

/// One candidate solution. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NestResult {
    /// Lower is better.
    pub fitness: f64,

    /// Total area of the opened sheets.
    pub area: f64,

    /// Total area of the placed parts.
    pub total_area: f64,

    /// `total_area / area`, or 0 when no sheet was opened.
    pub utilisation: f64,

    /// Total length of cut edges shared between adjacent parts.
    pub merged_length: f64,

    /// Per-sheet placements.
    pub placements: Vec<SheetPlacement>,

    /// Part instances that fit nowhere.
    pub unplaced: Vec<UnplacedPart>,
}

impl NestResult {
    /// Creates a result with no sheets opened.
    pub fn empty() -> Self {
        Self {
            fitness: f64::INFINITY,
            area: 0.0,
            total_area: 0.0,
            utilisation: 0.0,
            merged_length: 0.0,
            placements: Vec::new(),
            unplaced: Vec::new(),
        }
    }

    /// Returns true if every part instance was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Number of placed part instances.
    pub fn placed_count(&self) -> usize {
        self.placements.iter().map(|s| s.placements.len()).sum()
    }

    /// Number of opened sheets.
    pub fn sheets_used(&self) -> usize {
        self.placements.len()
    }

    /// Iterates over all placements across sheets.
    pub fn iter_placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.iter().flat_map(|s| s.placements.iter())
    }

    /// Returns utilisation as a percentage string.
    pub fn utilisation_percent(&self) -> String {
        format!("{:.1}%", self.utilisation * 100.0)
    }
}

impl Default for NestResult {
    fn default() -> Self {
        Self::empty()
    }
}
