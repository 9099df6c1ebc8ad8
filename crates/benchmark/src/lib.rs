//! Headless runner for sheetnest
//!
//! This crate provides:
//! - JSON job files (parts, sheets, config and run limits)
//! - A runner that drives a nesting session under generation and time limits
//! - Synthetic job generation for edge case testing

mod job;
mod runner;
mod synthetic;

pub use job::{Job, JobError, Limits};
pub use runner::{run_job, RunOptions, RunReport, DEFAULT_GENERATIONS};
pub use synthetic::{SyntheticGenerator, SyntheticJobs};
