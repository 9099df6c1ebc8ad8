//! Nesting session: the outward lifecycle of a run.
//!
//! A [`NestSession`] owns the input geometry, the configuration and the NFP
//! cache. [`NestSession::start`] spawns one coordinator thread running the
//! genetic algorithm; evaluation happens on the session's worker pool. The
//! caller observes the run through callbacks and through the bounded history
//! of best results, and ends it with [`NestSession::stop`].

use crate::boolean::Clipper;
use crate::context::NestContext;
use crate::ga_nesting::NestingProblem;
use crate::nfp_cache::NfpCache;
use crate::part::{prepare_parts, prepare_sheets, Part, Sheet};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sheetnest_core::{
    CancellationToken, Config, Error, GaConfig, GaRunner, Individual, NestResult, ProgressCallback, ProgressEvent,
    Result, ResultCallback,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    /// A stop was requested; the current generation is being finished.
    Stopping,
}

/// Observers for one run.
#[derive(Default)]
pub struct NestCallbacks {
    progress: Option<ProgressCallback>,
    result: Option<ResultCallback>,
}

impl NestCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives per-worker progress, including the done sentinel.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Receives each new best result as soon as it is produced.
    pub fn on_result<F>(mut self, callback: F) -> Self
    where
        F: Fn(&NestResult) + Send + Sync + 'static,
    {
        self.result = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for NestCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestCallbacks")
            .field("progress", &self.progress.is_some())
            .field("result", &self.result.is_some())
            .finish()
    }
}

/// How a finished run went.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub generations: u32,
    pub elapsed: Duration,
    pub cancelled: bool,
    pub best_fitness: Option<f64>,
}

/// State shared with the coordinator thread.
#[derive(Debug)]
struct Shared {
    state: Mutex<SessionState>,
    results: Mutex<VecDeque<NestResult>>,
}

impl Shared {
    fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn push_result(&self, result: NestResult, cap: usize) {
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        results.push_back(result);
        while results.len() > cap {
            results.pop_front();
        }
    }

    fn results(&self) -> Vec<NestResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn best(&self) -> Option<NestResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    fn clear_results(&self) {
        self.results.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// A nesting session over fixed parts and sheets.
///
/// ```no_run
/// use sheetnest_core::Config;
/// use sheetnest_d2::{NestCallbacks, NestSession, Part, Polygon, Sheet};
///
/// let parts = vec![Part::new(Polygon::rectangle(40.0, 20.0)?, 6)];
/// let sheets = vec![Sheet::rectangle(100.0, 100.0)?];
/// let config = Config::new().with_spacing(1.0).with_max_generations(20).with_seed(1);
///
/// let mut session = NestSession::new(parts, sheets, config)?;
/// session.start(NestCallbacks::new().on_result(|r| println!("fitness {}", r.fitness)))?;
/// session.wait()?;
/// let best = session.best();
/// # Ok::<(), sheetnest_core::Error>(())
/// ```
pub struct NestSession {
    parts: Vec<Part>,
    sheets: Vec<Sheet>,
    config: Config,
    cache: Arc<NfpCache>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<Result<RunSummary>>>,
}

impl std::fmt::Debug for NestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestSession")
            .field("parts", &self.parts.len())
            .field("sheets", &self.sheets.len())
            .field("state", &self.state())
            .finish()
    }
}

fn open_cache(config: &Config) -> Arc<NfpCache> {
    Arc::new(match &config.cache_dir {
        Some(dir) => NfpCache::with_dir(dir),
        None => NfpCache::new(),
    })
}

impl NestSession {
    /// Validates the configuration and the geometry.
    pub fn new(parts: Vec<Part>, sheets: Vec<Sheet>, config: Config) -> Result<Self> {
        config.validate()?;
        if parts.iter().all(|p| p.quantity == 0) {
            return Err(Error::InvalidGeometry("no part instances to nest".into()));
        }
        let clipper = Clipper::new(config.clipper_scale);
        let prepared = prepare_sheets(&sheets, &config, &clipper)?;
        prepare_parts(&parts, &prepared, &config, &clipper)?;

        Ok(Self {
            parts,
            sheets,
            cache: open_cache(&config),
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                results: Mutex::new(VecDeque::new()),
            }),
            cancel: CancellationToken::new(),
            handle: None,
        })
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<NfpCache> {
        &self.cache
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Token that stops the current run when cancelled, usable from any thread.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Best results of the current or last run, oldest first.
    pub fn results(&self) -> Vec<NestResult> {
        self.shared.results()
    }

    pub fn best(&self) -> Option<NestResult> {
        self.shared.best()
    }

    /// Starts a run on a coordinator thread.
    ///
    /// Clears the NFP cache and the result history first. Fails with
    /// `Error::InvalidState` while a run is active.
    pub fn start(&mut self, callbacks: NestCallbacks) -> Result<()> {
        if self.state() != SessionState::Idle {
            return Err(Error::InvalidState("a run is already active".into()));
        }
        if let Err(e) = self.finish() {
            log::warn!("previous run ended with an error: {}", e);
        }

        self.cache.clear();
        self.shared.clear_results();
        let ctx = NestContext::with_cache(&self.parts, &self.sheets, self.config.clone(), Arc::clone(&self.cache))?;
        log::info!(
            "starting session: {} instances, {} sheet types, {} threads",
            ctx.instances().len(),
            ctx.sheets().len(),
            self.config.threads
        );

        let shared = Arc::clone(&self.shared);
        let cap = self.config.result_history.max(1);
        let user_result = callbacks.result;
        let on_result: ResultCallback = Box::new(move |result: &NestResult| {
            shared.push_result(result.clone(), cap);
            if let Some(callback) = &user_result {
                callback(result);
            }
        });
        let mut problem = NestingProblem::new(Arc::new(ctx))?.with_result_callback(on_result);
        if let Some(progress) = callbacks.progress {
            problem = problem.with_progress_callback(progress);
        }

        self.cancel = CancellationToken::new();
        let runner = GaRunner::with_cancellation(GaConfig::from(&self.config), problem, self.cancel.clone());
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        self.shared.set_state(SessionState::Running);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("sheetnest-ga".into())
            .spawn(move || {
                let outcome = runner.run_with_rng(&mut rng);
                shared.set_state(SessionState::Idle);
                match outcome {
                    Ok(run) => {
                        let summary = RunSummary {
                            generations: run.generations,
                            elapsed: run.elapsed,
                            cancelled: run.cancelled,
                            best_fitness: run.best.as_ref().and_then(Individual::fitness),
                        };
                        log::info!(
                            "session finished after {} generations in {:.2?}{}",
                            summary.generations,
                            summary.elapsed,
                            if summary.cancelled { " (stopped)" } else { "" }
                        );
                        Ok(summary)
                    }
                    Err(e) => {
                        log::error!("session failed: {}", e);
                        Err(e)
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(SessionState::Idle);
                Err(e.into())
            }
        }
    }

    /// Requests a stop and waits for the current generation to finish.
    ///
    /// Results produced so far are kept. Returns the run's error if it
    /// failed; stopping an idle session does nothing.
    pub fn stop(&mut self) -> Result<()> {
        if self.handle.is_some() {
            if self.state() == SessionState::Running {
                self.shared.set_state(SessionState::Stopping);
                log::info!("stop requested");
            }
            self.cancel.cancel();
        }
        self.finish().map(|_| ())
    }

    /// Blocks until the run ends on its own (generation limit, error, or a
    /// cancelled [`NestSession::cancel_handle`]).
    pub fn wait(&mut self) -> Result<Option<RunSummary>> {
        self.finish()
    }

    /// Stops any run, then drops the result history and the NFP cache.
    pub fn reset(&mut self) -> Result<()> {
        let stopped = self.stop();
        self.shared.clear_results();
        self.cache.clear();
        stopped
    }

    /// Replaces the configuration between runs.
    ///
    /// The NFP cache is cleared when geometry-affecting settings change and
    /// reopened when the cache directory changes.
    pub fn set_config(&mut self, config: Config) -> Result<()> {
        config.validate()?;
        if self.state() != SessionState::Idle {
            return Err(Error::InvalidState("cannot change configuration while running".into()));
        }
        if config.cache_dir != self.config.cache_dir {
            self.cache = open_cache(&config);
        } else if config.geometry_fingerprint() != self.config.geometry_fingerprint() {
            log::debug!("geometry settings changed; clearing NFP cache");
            self.cache.clear();
        }
        self.config = config;
        Ok(())
    }

    fn finish(&mut self) -> Result<Option<RunSummary>> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        let outcome = handle
            .join()
            .map_err(|_| Error::Internal("GA coordinator thread panicked".into()));
        self.shared.set_state(SessionState::Idle);
        outcome?.map(Some)
    }
}

impl Drop for NestSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
