//! Progress reporting.

use crate::result::NestResult;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Progress value a worker reports when its current unit of work is complete.
pub const PROGRESS_DONE: f64 = -1.0;

/// A progress event emitted while a generation is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgressEvent {
    /// Index of the reporting worker.
    pub worker_index: usize,

    /// Fraction of the worker's current unit in [0, 1], or [`PROGRESS_DONE`].
    pub progress: f64,

    /// Generation being evaluated.
    pub generation: u32,

    /// Fraction of the generation's individuals evaluated so far.
    pub overall: f64,
}

impl ProgressEvent {
    /// Creates a new progress event.
    pub fn new(worker_index: usize, progress: f64) -> Self {
        Self {
            worker_index,
            progress,
            ..Default::default()
        }
    }

    /// Sets the generation number.
    pub fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    /// Sets the overall fraction.
    pub fn with_overall(mut self, overall: f64) -> Self {
        self.overall = overall.clamp(0.0, 1.0);
        self
    }

    /// Returns true if this event marks the end of a worker's unit.
    pub fn is_done(&self) -> bool {
        self.progress < 0.0
    }
}

/// Callback receiving progress events.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Callback receiving every new best result.
pub type ResultCallback = Box<dyn Fn(&NestResult) + Send + Sync>;
