//! Task dispatch across isolated workers.
//!
//! ```text
//! [chunk queue] --Vec<FrameTask>--> [worker 0..n] --ClassificationResult--> [coordinator]
//!                                    (own WorkerContext)                     (progress)
//! ```
//!
//! Workers share no mutable state. Each builds its own `WorkerContext` on start,
//! pulls chunks from a crossbeam queue until it is drained, and sends one result
//! per task back to the coordinating thread. Results arrive in completion order.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::unbounded;

use crate::detect::ResolvedDetector;
use crate::frame::{ClassificationResult, FrameTask};
use crate::model::ModelResource;
use crate::progress::ProgressReporter;
use crate::worker::WorkerContext;

/// Chunks queued per worker, to balance load against dispatch overhead.
const CHUNKS_PER_WORKER: usize = 4;

/// Work executed by one worker thread.
pub type WorkerJob = Box<dyn FnOnce() + Send + 'static>;

/// Starts worker threads for the dispatcher.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self, worker_id: usize, job: WorkerJob) -> io::Result<JoinHandle<()>>;
}

/// Spawns named OS threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSpawner;

impl WorkerSpawner for ThreadSpawner {
    fn spawn(&self, worker_id: usize, job: WorkerJob) -> io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(format!("framescan-worker-{}", worker_id))
            .spawn(job)
    }
}

/// Failure of the worker pool as a whole.
///
/// Individual task failures never surface here; they are absorbed by the
/// detector boundary.
#[derive(Debug)]
pub enum PoolError {
    /// A worker thread could not be started.
    Spawn { worker_id: usize, source: io::Error },
    /// A worker thread terminated abnormally.
    WorkerPanicked { worker_id: usize, message: String },
    /// Workers exited without producing a result for every task.
    Incomplete { expected: usize, received: usize },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Spawn { worker_id, source } => {
                write!(f, "failed to start worker {}: {}", worker_id, source)
            }
            PoolError::WorkerPanicked { worker_id, message } => {
                write!(f, "worker {} panicked: {}", worker_id, message)
            }
            PoolError::Incomplete { expected, received } => write!(
                f,
                "worker pool returned {} of {} results",
                received, expected
            ),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Tasks per dispatched chunk: `max(1, total / (concurrency * 4))`.
pub fn chunk_size(total: usize, concurrency: usize) -> usize {
    (total / concurrency.max(1).saturating_mul(CHUNKS_PER_WORKER)).max(1)
}

/// Classify `tasks` on up to `concurrency` worker threads.
///
/// Blocks until every worker has been joined. Returns results in completion
/// order; the caller restores the original order.
pub fn run_parallel(
    tasks: &[FrameTask],
    threshold: f32,
    concurrency: usize,
    detector: &ResolvedDetector,
    resource: &Arc<ModelResource>,
    spawner: &dyn WorkerSpawner,
    progress: &mut ProgressReporter,
) -> Result<Vec<ClassificationResult>, PoolError> {
    let total = tasks.len();
    let chunk = chunk_size(total, concurrency);

    let (work_tx, work_rx) = unbounded::<Vec<FrameTask>>();
    let mut chunks = 0usize;
    for batch in tasks.chunks(chunk) {
        // The receiver is alive for the whole function.
        let _ = work_tx.send(batch.to_vec());
        chunks += 1;
    }
    drop(work_tx);

    let worker_count = concurrency.min(chunks).max(1);
    log::debug!(
        "dispatching {} tasks in {} chunks of {} to {} workers",
        total,
        chunks,
        chunk,
        worker_count
    );

    let (result_tx, result_rx) = unbounded::<ClassificationResult>();
    let mut handles: Vec<(usize, JoinHandle<()>)> = Vec::with_capacity(worker_count);

    for worker_id in 0..worker_count {
        let queue = work_rx.clone();
        let results = result_tx.clone();
        let detector = detector.clone();
        let resource = Arc::clone(resource);
        let job: WorkerJob = Box::new(move || {
            let mut ctx = WorkerContext::init(worker_id, &detector, &resource);
            for batch in queue.iter() {
                for task in batch {
                    let result = ctx.process(task, threshold);
                    if results.send(result).is_err() {
                        return;
                    }
                }
            }
        });

        match spawner.spawn(worker_id, job) {
            Ok(handle) => handles.push((worker_id, handle)),
            Err(source) => {
                // Drain the queue so already started workers stop, then
                // reap them before reporting.
                while work_rx.try_recv().is_ok() {}
                drop(result_tx);
                drop(result_rx);
                for (_, handle) in handles {
                    let _ = handle.join();
                }
                return Err(PoolError::Spawn { worker_id, source });
            }
        }
    }
    drop(result_tx);
    drop(work_rx);

    let mut results = Vec::with_capacity(total);
    for result in result_rx.iter() {
        progress.record_completion();
        results.push(result);
    }

    let mut failure = None;
    for (worker_id, handle) in handles {
        if let Err(payload) = handle.join() {
            let message = crate::detect::panic_message(payload.as_ref());
            log::error!("worker {} terminated abnormally: {}", worker_id, message);
            failure.get_or_insert(PoolError::WorkerPanicked { worker_id, message });
        }
    }
    if let Some(err) = failure {
        return Err(err);
    }

    if results.len() != total {
        return Err(PoolError::Incomplete {
            expected: total,
            received: results.len(),
        });
    }
    Ok(results)
}

/// Classify `tasks` one at a time, in order, with a single worker context.
pub fn run_sequential(
    tasks: &[FrameTask],
    threshold: f32,
    detector: &ResolvedDetector,
    resource: &ModelResource,
    progress: &mut ProgressReporter,
) -> Vec<ClassificationResult> {
    let mut ctx = WorkerContext::init(0, detector, resource);
    tasks
        .iter()
        .map(|task| {
            let result = ctx.process(task.clone(), threshold);
            progress.record_completion();
            result
        })
        .collect()
}
