//! # sheetnest core
//!
//! Dimension-independent building blocks for the sheetnest engine.
//!
//! ## Core Components
//!
//! - **Configuration**: [`Config`], [`PlacementType`] - typed, validated session settings
//! - **GA framework**: [`GaRunner`], [`GaProblem`], [`Individual`] - minimizing genetic algorithm
//! - **Cancellation**: [`CancellationToken`] - cooperative stop checked at safe points
//! - **Results**: [`NestResult`], [`Placement`], [`SheetPlacement`]
//! - **Progress**: [`ProgressEvent`] and the callback types used by sessions
//! - **Predicates**: [`robust`] - exact orientation tests
//!
//! ## Configuration
//!
//! ```rust
//! use sheetnest_core::{Config, PlacementType};
//!
//! let config = Config::new()
//!     .with_spacing(2.0)
//!     .with_rotations(4)
//!     .with_placement(PlacementType::Gravity)
//!     .with_threads(2);
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod cancel;
pub mod config;
pub mod error;
pub mod ga;
pub mod progress;
pub mod result;
pub mod robust;

// Re-exports
pub use cancel::CancellationToken;
pub use config::{Config, GeometryFingerprint, PlacementType};
pub use error::{Error, Result};
pub use ga::{GaConfig, GaProblem, GaProgress, GaResult, GaRunner, Individual, PermutationChromosome};
pub use progress::{ProgressCallback, ProgressEvent, ResultCallback, PROGRESS_DONE};
pub use result::{NestResult, Placement, SheetPlacement, UnplacedPart};
