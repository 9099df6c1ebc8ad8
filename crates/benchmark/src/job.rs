//! Job files: the parts, sheets and settings of one nesting run.
//!
//! A job is plain JSON:
//!
//! ```json
//! {
//!   "name": "brackets",
//!   "parts": [{ "polygon": { "points": [{"x": 0, "y": 0}, {"x": 40, "y": 0}, {"x": 0, "y": 30}] }, "quantity": 6 }],
//!   "sheets": [{ "polygon": { "points": [...] }, "margin": 5, "quantity": 2 }],
//!   "config": { "spacing": 2, "rotations": 4, "placement": "gravity" },
//!   "limits": { "max_generations": 50, "time_limit_secs": 30 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use sheetnest_core::Config;
use sheetnest_d2::{Part, Sheet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors while reading or writing job files.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid job: {0}")]
    Invalid(String),
}

/// When a headless run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_generations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<u64>,
}

/// One nesting job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub parts: Vec<Part>,
    pub sheets: Vec<Sheet>,
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub limits: Limits,
}

impl Job {
    pub fn new(name: impl Into<String>, parts: Vec<Part>, sheets: Vec<Sheet>) -> Self {
        Self {
            name: name.into(),
            parts,
            sheets,
            config: Config::default(),
            limits: Limits::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Reads and checks a job file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JobError> {
        let json = fs::read_to_string(path)?;
        let job: Job = serde_json::from_str(&json)?;
        job.validate()?;
        Ok(job)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), JobError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Number of part instances to place.
    pub fn total_instances(&self) -> usize {
        self.parts.iter().map(|p| p.quantity).sum()
    }

    /// Total material area of all part instances.
    pub fn total_part_area(&self) -> f64 {
        self.parts.iter().map(|p| p.area() * p.quantity as f64).sum()
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.parts.is_empty() {
            return Err(JobError::Invalid(format!("job '{}' has no parts", self.name)));
        }
        if self.sheets.is_empty() {
            return Err(JobError::Invalid(format!("job '{}' has no sheets", self.name)));
        }
        self.config
            .validate()
            .map_err(|e| JobError::Invalid(e.to_string()))
    }
}
