//! Per-worker state.
//!
//! A `WorkerContext` is built exactly once when a worker starts and is then used
//! for every task that worker processes. Nothing in it is shared with other workers.

use std::panic::{self, AssertUnwindSafe};

use crate::detect::{panic_message, Detector, ResolvedDetector};
use crate::frame::{ClassificationResult, FrameTask};
use crate::model::ModelResource;

#[derive(Debug)]
pub struct WorkerContext {
    worker_id: usize,
    detector: Detector,
}

impl WorkerContext {
    /// Build the worker's detector from the shared model resource.
    ///
    /// Initialization failures (errors, panics, failed warm-up) degrade the
    /// worker to a detector that never flags. The worker itself keeps running.
    pub fn init(worker_id: usize, resolved: &ResolvedDetector, resource: &ModelResource) -> Self {
        let built = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut backend = resolved.build(resource)?;
            backend.warm_up()?;
            Ok::<_, anyhow::Error>(backend)
        }));
        let detector = match built {
            Ok(Ok(backend)) => {
                log::debug!(
                    "worker {} initialized {} detector ({})",
                    worker_id,
                    resolved.kind(),
                    backend.name()
                );
                Detector::new(backend)
            }
            Ok(Err(err)) => {
                log::warn!(
                    "worker {} failed to initialize {} detector, frames will not be flagged: {:#}",
                    worker_id,
                    resolved.kind(),
                    err
                );
                Detector::noop()
            }
            Err(payload) => {
                log::warn!(
                    "worker {} panicked initializing {} detector, frames will not be flagged: {}",
                    worker_id,
                    resolved.kind(),
                    panic_message(payload.as_ref())
                );
                Detector::noop()
            }
        };
        Self {
            worker_id,
            detector,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Classify one task. Always yields exactly one result for the task.
    pub fn process(&mut self, task: FrameTask, threshold: f32) -> ClassificationResult {
        let flagged = self.detector.classify(&task.path, threshold);
        task.into_result(flagged)
    }
}
