//! Headless job runner.

use crate::job::Job;
use serde::Serialize;
use sheetnest_core::{NestResult, Result};
use sheetnest_d2::{NestCallbacks, NestSession};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Generation cap used when a job sets neither a generation nor a time limit.
pub const DEFAULT_GENERATIONS: u32 = 20;

/// Command-line overrides for a job's own settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_generations: Option<u32>,
    pub time_limit: Option<Duration>,
    pub threads: Option<usize>,
    pub seed: Option<u64>,
}

/// Outcome of one job run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub job: String,
    pub fitness: f64,
    pub placed: usize,
    pub unplaced: usize,
    pub sheets_used: usize,
    pub utilisation: f64,
    pub merged_length: f64,
    pub generations: u32,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    pub result: Option<NestResult>,
}

impl RunReport {
    pub fn print_summary(&self) {
        println!("\n{:=<80}", "");
        println!("NEST RESULT: {}", self.job);
        println!("{:=<80}", "");
        println!(
            "{:<12} {:>8} {:>10} {:>8} {:>10} {:>10} {:>10}",
            "Fitness", "Placed", "Unplaced", "Sheets", "Util%", "Merged", "Time(ms)"
        );
        println!("{:-<80}", "");
        println!(
            "{:<12.2} {:>8} {:>10} {:>8} {:>10.1} {:>10.2} {:>10}",
            self.fitness,
            self.placed,
            self.unplaced,
            self.sheets_used,
            self.utilisation * 100.0,
            self.merged_length,
            self.elapsed_ms
        );
        println!(
            "\n{} generations{}",
            self.generations,
            if self.cancelled { " (stopped by time limit)" } else { "" }
        );
        println!("{:=<80}\n", "");
    }
}

/// Runs a job to completion and reports the best layout found.
///
/// Command-line options take precedence over the job's own limits. A run
/// with no limit at all stops after [`DEFAULT_GENERATIONS`].
pub fn run_job(job: &Job, options: &RunOptions) -> Result<RunReport> {
    let mut config = job.config.clone();
    if let Some(threads) = options.threads {
        config.threads = threads;
    }
    if let Some(seed) = options.seed {
        config.seed = Some(seed);
    }

    let time_limit = options
        .time_limit
        .or(job.limits.time_limit_secs.map(Duration::from_secs));
    config.max_generations = options
        .max_generations
        .or(job.limits.max_generations)
        .or(config.max_generations);
    if config.max_generations.is_none() && time_limit.is_none() {
        config.max_generations = Some(DEFAULT_GENERATIONS);
    }

    log::info!(
        "Running job '{}': {} instances, {} sheet types, {} threads",
        job.name,
        job.total_instances(),
        job.sheets.len(),
        config.threads
    );

    let start = Instant::now();
    let mut session = NestSession::new(job.parts.clone(), job.sheets.clone(), config)?;
    session.start(NestCallbacks::new().on_result(|result| {
        log::info!(
            "Improved layout: fitness {:.2}, {} placed, {} sheets, {}",
            result.fitness,
            result.placed_count(),
            result.sheets_used(),
            result.utilisation_percent()
        );
    }))?;

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let timer = time_limit.map(|limit| {
        let cancel = session.cancel_handle();
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(limit) {
                log::info!("Time limit of {:?} reached, stopping", limit);
                cancel.cancel();
            }
        })
    });

    let summary = session.wait();
    drop(done_tx);
    if let Some(timer) = timer {
        let _ = timer.join();
    }
    let summary = summary?;

    let best = session.best();
    let (generations, cancelled) = summary.map_or((0, false), |s| (s.generations, s.cancelled));
    Ok(RunReport {
        job: job.name.clone(),
        fitness: best.as_ref().map_or(f64::INFINITY, |r| r.fitness),
        placed: best.as_ref().map_or(0, NestResult::placed_count),
        unplaced: best.as_ref().map_or(job.total_instances(), |r| r.unplaced.len()),
        sheets_used: best.as_ref().map_or(0, NestResult::sheets_used),
        utilisation: best.as_ref().map_or(0.0, |r| r.utilisation),
        merged_length: best.as_ref().map_or(0.0, |r| r.merged_length),
        generations,
        cancelled,
        elapsed_ms: start.elapsed().as_millis() as u64,
        result: best,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Limits;
    use sheetnest_core::Config;
    use sheetnest_d2::{Part, Polygon, Sheet};

    fn squares_job() -> Job {
        Job::new(
            "squares",
            vec![Part::new(Polygon::rectangle(10.0, 10.0).unwrap(), 4)],
            vec![Sheet::rectangle(50.0, 50.0).unwrap()],
        )
        .with_config(Config::new().with_threads(2).with_seed(7))
    }

    #[test]
    fn test_run_places_everything() {
        let options = RunOptions {
            max_generations: Some(2),
            ..Default::default()
        };
        let report = run_job(&squares_job(), &options).unwrap();

        assert_eq!(report.placed, 4);
        assert_eq!(report.unplaced, 0);
        assert_eq!(report.sheets_used, 1);
        assert!(report.result.is_some());
        assert!(!report.cancelled);
    }

    #[test]
    fn test_job_limits_apply() {
        let job = squares_job().with_limits(Limits {
            max_generations: Some(1),
            time_limit_secs: None,
        });
        let report = run_job(&job, &RunOptions::default()).unwrap();
        assert!(report.generations <= 1);
    }

    #[test]
    fn test_time_limit_stops_run() {
        let job = squares_job().with_config(Config::new().with_threads(1));
        let options = RunOptions {
            time_limit: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let report = run_job(&job, &options).unwrap();
        assert!(report.cancelled);
        assert!(report.elapsed_ms < 30_000);
    }

    #[test]
    fn test_report_serializes() {
        let options = RunOptions {
            max_generations: Some(1),
            ..Default::default()
        };
        let report = run_job(&squares_job(), &options).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["job"], "squares");
        assert_eq!(json["placed"], 4);
    }
}
