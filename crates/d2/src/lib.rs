//! # sheetnest 2D
//!
//! 2D sheet nesting for the sheetnest engine: packing irregular parts onto
//! sheets of material with as little waste as possible.
//!
//! ## Features
//!
//! - Polygon geometry with holes, affine transforms and curve linearization
//! - Boolean operations and offsetting on an integer grid (`i_overlay`)
//! - No-fit polygons by orbital sliding, with inner-fit regions for sheets
//! - A shared NFP cache, in memory or on disk
//! - Gravity, bounding-box and convex-hull placement heuristics
//! - Merged cut-line detection for laser/knife time savings
//! - A genetic algorithm driven by a pool of evaluation workers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sheetnest_d2::{Config, NestCallbacks, NestSession, Part, Polygon, Sheet};
//!
//! let parts = vec![
//!     Part::new(Polygon::rectangle(100.0, 50.0)?, 5),
//!     Part::new(Polygon::from_xy(&[(0.0, 0.0), (60.0, 0.0), (30.0, 40.0)])?, 4),
//! ];
//! let sheets = vec![Sheet::rectangle(500.0, 300.0)?.with_margin(5.0)];
//!
//! let config = Config::new()
//!     .with_spacing(2.0)
//!     .with_rotations(4)
//!     .with_max_generations(50);
//!
//! let mut session = NestSession::new(parts, sheets, config)?;
//! session.start(NestCallbacks::new().on_result(|r| {
//!     println!("{} placed, utilisation {}", r.placed_count(), r.utilisation_percent());
//! }))?;
//! session.wait()?;
//! # Ok::<(), sheetnest_d2::Error>(())
//! ```
//!
//! ## Geometry
//!
//! ```rust
//! use sheetnest_d2::Polygon;
//!
//! let square = Polygon::from_xy(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]).unwrap();
//! assert_eq!(square.area(), -100.0);
//! assert_eq!(square.perimeter(), 40.0);
//!
//! let frame = square.with_child(Polygon::from_xy(&[(2.0, 2.0), (2.0, 8.0), (8.0, 8.0), (8.0, 2.0)]).unwrap());
//! assert_eq!(frame.net_area(), 64.0);
//! ```

pub mod boolean;
pub mod context;
pub mod curve;
pub mod ga_nesting;
pub mod geometry;
pub mod merge;
pub mod minkowski;
pub mod nester;
pub mod nfp;
pub mod nfp_cache;
pub mod part;
pub mod placement;
pub mod util;
pub mod worker;

// Re-exports
pub use boolean::{BooleanKind, Clipper};
pub use context::NestContext;
pub use curve::{Arc, CubicBezier, Curve, QuadraticBezier};
pub use ga_nesting::NestingProblem;
pub use geometry::{BooleanOp, Bounds, Point, Polygon};
pub use nester::{NestCallbacks, NestSession, RunSummary, SessionState};
pub use nfp::{Nfp, NfpCalculator};
pub use nfp_cache::{NfpCache, NfpKey};
pub use part::{Part, Sheet};
pub use placement::place_individual;
pub use util::PointInPolygon;
pub use worker::{WorkerMessage, WorkerPool, WorkerTask};
pub use sheetnest_core::{
    CancellationToken, Config, Error, NestResult, Placement, PlacementType, ProgressEvent, Result, SheetPlacement,
    UnplacedPart, PROGRESS_DONE,
};
