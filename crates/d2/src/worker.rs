//! Worker threads evaluating individuals.
//!
//! Each worker owns a task channel; all workers report on one shared message
//! channel. The coordinator hands out one individual per idle worker, folds
//! per-worker progress into an overall fraction for the generation, and stops
//! handing out work once cancellation is requested. Work already started is
//! always finished and its result kept.

use crate::context::NestContext;
use crate::placement::place_individual;
use sheetnest_core::{CancellationToken, Error, NestResult, PermutationChromosome, ProgressEvent, Result, PROGRESS_DONE};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Instructions sent to one worker.
#[derive(Debug)]
pub enum WorkerTask {
    /// Lay out `individual`; `slot` is its position in the population.
    Evaluate {
        generation: u32,
        slot: usize,
        individual: PermutationChromosome,
    },
    /// Acknowledge once the current unit is finished.
    Stop,
    /// Leave the worker loop.
    Shutdown,
}

/// Reports from workers to the coordinator.
#[derive(Debug)]
pub enum WorkerMessage {
    Progress(ProgressEvent),
    Result {
        worker: usize,
        generation: u32,
        slot: usize,
        result: Box<NestResult>,
    },
    Error {
        worker: usize,
        generation: u32,
        slot: usize,
        error: Error,
    },
    StopAck {
        worker: usize,
    },
}

/// A fixed set of evaluation threads.
pub struct WorkerPool {
    tasks: Vec<Sender<WorkerTask>>,
    messages: Mutex<Receiver<WorkerMessage>>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("workers", &self.tasks.len()).finish()
    }
}

impl WorkerPool {
    /// Starts `workers` threads sharing `ctx`.
    pub fn new(ctx: Arc<NestContext>, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidConfig("worker count must be at least 1".into()));
        }
        let (out, messages) = mpsc::channel();
        let mut tasks = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let (task_tx, task_rx) = mpsc::channel();
            let ctx = Arc::clone(&ctx);
            let out = out.clone();
            let handle = thread::Builder::new()
                .name(format!("sheetnest-worker-{index}"))
                .spawn(move || worker_loop(index, &ctx, &task_rx, &out))?;
            tasks.push(task_tx);
            handles.push(handle);
        }
        log::debug!("started {} evaluation workers", workers);

        Ok(Self {
            tasks,
            messages: Mutex::new(messages),
            handles,
        })
    }

    pub fn workers(&self) -> usize {
        self.tasks.len()
    }

    /// Evaluates `jobs` (population slot and individual) across the workers.
    ///
    /// `on_result` runs on the calling thread for every finished unit, in
    /// completion order. Once `cancel` is observed no further units are
    /// handed out; the call waits for every worker to acknowledge the stop
    /// and then returns `Err(Error::Cancelled)`. A failed unit stops the
    /// dispatch the same way and its error is returned.
    pub fn evaluate(
        &self,
        generation: u32,
        jobs: Vec<(usize, PermutationChromosome)>,
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(ProgressEvent),
        on_result: &mut dyn FnMut(usize, NestResult),
    ) -> Result<()> {
        let total = jobs.len();
        if total == 0 {
            return Ok(());
        }
        cancel.check()?;

        let messages = self
            .messages
            .lock()
            .map_err(|_| Error::Internal("worker message channel poisoned".into()))?;
        let mut queue: VecDeque<_> = jobs.into();
        // Progress of the unit each worker is busy with.
        let mut busy: Vec<Option<f64>> = vec![None; self.tasks.len()];
        let mut completed = 0usize;
        let mut pending_acks = 0usize;
        let mut stopping = false;
        let mut failure: Option<Error> = None;

        for worker in 0..self.tasks.len() {
            self.dispatch(worker, generation, &mut queue, &mut busy)?;
        }

        while pending_acks > 0 || busy.iter().any(Option::is_some) {
            let message = messages
                .recv()
                .map_err(|_| Error::Worker("all workers disconnected".into()))?;
            match message {
                WorkerMessage::Progress(event) => {
                    if event.generation != generation {
                        continue;
                    }
                    if let Some(Some(fraction)) = busy.get_mut(event.worker_index) {
                        *fraction = if event.is_done() { 1.0 } else { event.progress };
                    }
                    let in_flight: f64 = busy.iter().flatten().sum();
                    on_progress(event.with_overall((completed as f64 + in_flight) / total as f64));
                }
                WorkerMessage::Result {
                    worker,
                    generation: g,
                    slot,
                    result,
                } => {
                    if g != generation {
                        continue;
                    }
                    busy[worker] = None;
                    completed += 1;
                    on_result(slot, *result);

                    if stopping || failure.is_some() {
                        continue;
                    }
                    if cancel.is_cancelled() && !queue.is_empty() {
                        stopping = true;
                        pending_acks = self.broadcast_stop();
                    } else {
                        self.dispatch(worker, generation, &mut queue, &mut busy)?;
                    }
                }
                WorkerMessage::Error {
                    worker,
                    generation: g,
                    slot,
                    error,
                } => {
                    if g != generation {
                        continue;
                    }
                    log::error!("worker {} failed on individual {}: {}", worker, slot, error);
                    busy[worker] = None;
                    completed += 1;
                    failure.get_or_insert(error);
                }
                WorkerMessage::StopAck { worker } => {
                    log::debug!("worker {} acknowledged stop", worker);
                    pending_acks = pending_acks.saturating_sub(1);
                }
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }
        if stopping {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn dispatch(
        &self,
        worker: usize,
        generation: u32,
        queue: &mut VecDeque<(usize, PermutationChromosome)>,
        busy: &mut [Option<f64>],
    ) -> Result<()> {
        let Some((slot, individual)) = queue.pop_front() else {
            return Ok(());
        };
        self.tasks[worker]
            .send(WorkerTask::Evaluate {
                generation,
                slot,
                individual,
            })
            .map_err(|_| Error::Worker(format!("worker {worker} is gone")))?;
        busy[worker] = Some(0.0);
        Ok(())
    }

    /// Sends `Stop` to every worker; returns how many acknowledgements to await.
    fn broadcast_stop(&self) -> usize {
        self.tasks
            .iter()
            .filter(|tx| tx.send(WorkerTask::Stop).is_ok())
            .count()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for tx in &self.tasks {
            let _ = tx.send(WorkerTask::Shutdown);
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("an evaluation worker exited abnormally");
            }
        }
    }
}

fn worker_loop(index: usize, ctx: &NestContext, tasks: &Receiver<WorkerTask>, out: &Sender<WorkerMessage>) {
    while let Ok(task) = tasks.recv() {
        let message = match task {
            WorkerTask::Evaluate {
                generation,
                slot,
                individual,
            } => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    place_individual(ctx, &individual, |fraction| {
                        let event = ProgressEvent::new(index, fraction).with_generation(generation);
                        let _ = out.send(WorkerMessage::Progress(event));
                    })
                }));
                let done = ProgressEvent::new(index, PROGRESS_DONE).with_generation(generation);
                let _ = out.send(WorkerMessage::Progress(done));
                match outcome {
                    Ok(result) => WorkerMessage::Result {
                        worker: index,
                        generation,
                        slot,
                        result: Box::new(result),
                    },
                    Err(payload) => WorkerMessage::Error {
                        worker: index,
                        generation,
                        slot,
                        error: Error::Worker(format!("worker {index} panicked: {}", panic_message(&*payload))),
                    },
                }
            }
            WorkerTask::Stop => WorkerMessage::StopAck { worker: index },
            WorkerTask::Shutdown => break,
        };
        if out.send(message).is_err() {
            break;
        }
    }
    log::debug!("worker {} exiting", index);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
