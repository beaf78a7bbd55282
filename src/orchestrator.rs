//! Batch supervisor.
//!
//! ```text
//! Idle -> ParallelAttempt -> Done
//!              |
//!              +-- pool failure --> FallbackSequential -> Done
//! Idle -> FallbackSequential -> Done          (threads == 1)
//! ```
//!
//! A pool-level failure discards every result of the parallel attempt and the
//! whole batch is reprocessed sequentially, so no task can be dropped.
//! Per-task failures never cause a transition; the detector boundary absorbs them.
//!
//! The final progress write belongs to the outcome, not the state machine: it
//! happens once the results artifact is on disk (`BatchOutcome::write_results`)
//! or when the caller explicitly completes the batch (`BatchOutcome::finish`).

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::aggregate::{self, order_results};
use crate::config::BatchJob;
use crate::detect::DetectorRegistry;
use crate::dispatch::{self, ThreadSpawner, WorkerSpawner};
use crate::frame::ClassificationResult;
use crate::model::ModelResource;
use crate::progress::ProgressReporter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    ParallelAttempt,
    FallbackSequential,
    Done,
}

/// Which path produced the final results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionPath {
    Parallel,
    Sequential { fell_back: bool },
}

#[derive(Debug)]
pub struct BatchOutcome {
    /// One result per frame, ascending by index.
    pub results: Vec<ClassificationResult>,
    pub path: ExecutionPath,
    progress: ProgressReporter,
}

impl BatchOutcome {
    /// Write the results artifact, then report the batch as complete.
    ///
    /// On failure the progress counter is left below the frame total.
    pub fn write_results(mut self, output: &Path) -> Result<u64> {
        let size = aggregate::write_results(output, &self.results, self.progress.total())?;
        self.progress.finish();
        Ok(size)
    }

    /// Report the batch as complete without writing an artifact.
    pub fn finish(mut self) -> Vec<ClassificationResult> {
        self.progress.finish();
        self.results
    }
}

pub struct Orchestrator {
    registry: DetectorRegistry,
    spawner: Arc<dyn WorkerSpawner>,
}

impl Orchestrator {
    pub fn new(registry: DetectorRegistry) -> Self {
        Self {
            registry,
            spawner: Arc::new(ThreadSpawner),
        }
    }

    /// Replace the thread spawner used for parallel attempts.
    pub fn with_spawner(mut self, spawner: impl WorkerSpawner + 'static) -> Self {
        self.spawner = Arc::new(spawner);
        self
    }

    /// Run a batch, reporting progress to the job's progress path.
    pub fn run(&self, job: &BatchJob) -> Result<BatchOutcome> {
        let progress = ProgressReporter::for_path(job.progress_path.as_deref(), job.frames.len());
        self.run_with_progress(job, progress)
    }

    /// Run a batch with a caller-built progress reporter.
    ///
    /// Fails only when the model resource cannot be resolved; classification
    /// itself always yields a complete outcome.
    pub fn run_with_progress(
        &self,
        job: &BatchJob,
        progress: ProgressReporter,
    ) -> Result<BatchOutcome> {
        let resource = Arc::new(ModelResource::resolve(job.model_path.as_deref())?);
        Ok(self.execute(job, resource, progress))
    }

    /// Drive the state machine with an already resolved model resource.
    pub fn execute(
        &self,
        job: &BatchJob,
        resource: Arc<ModelResource>,
        mut progress: ProgressReporter,
    ) -> BatchOutcome {
        let detector = self.registry.resolve(&job.detector);
        let mut state = ExecutionState::Idle;
        let mut results = Vec::new();
        let mut path = ExecutionPath::Sequential { fell_back: false };
        let mut fell_back = false;

        loop {
            log::debug!("batch state: {:?}", state);
            state = match state {
                ExecutionState::Idle => {
                    progress.start();
                    if job.frames.is_empty() {
                        ExecutionState::Done
                    } else if job.threads > 1 {
                        ExecutionState::ParallelAttempt
                    } else {
                        ExecutionState::FallbackSequential
                    }
                }
                ExecutionState::ParallelAttempt => {
                    match dispatch::run_parallel(
                        &job.frames,
                        job.threshold,
                        job.threads,
                        &detector,
                        &resource,
                        self.spawner.as_ref(),
                        &mut progress,
                    ) {
                        Ok(parallel) => {
                            results = parallel;
                            path = ExecutionPath::Parallel;
                            ExecutionState::Done
                        }
                        Err(err) => {
                            log::warn!(
                                "parallel classification failed ({}); reprocessing all {} frames sequentially",
                                err,
                                job.frames.len()
                            );
                            fell_back = true;
                            progress.restart_pass();
                            ExecutionState::FallbackSequential
                        }
                    }
                }
                ExecutionState::FallbackSequential => {
                    results = dispatch::run_sequential(
                        &job.frames,
                        job.threshold,
                        &detector,
                        &resource,
                        &mut progress,
                    );
                    path = ExecutionPath::Sequential { fell_back };
                    ExecutionState::Done
                }
                ExecutionState::Done => break,
            };
        }

        let flagged = results.iter().filter(|r| r.flagged).count();
        log::info!(
            "classified {} frames via {:?}: {} flagged",
            results.len(),
            path,
            flagged
        );

        BatchOutcome {
            results: order_results(results),
            path,
            progress,
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(DetectorRegistry::with_builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DetectorKind, FrameClassifier, StubDetector};
    use crate::frame::FrameTask;

    fn orchestrator() -> Orchestrator {
        let mut registry = DetectorRegistry::new();
        registry.register(DetectorKind::Stub, |_: &ModelResource| {
            Ok(Box::new(StubDetector::new("b")) as Box<dyn FrameClassifier>)
        });
        Orchestrator::new(registry)
    }

    fn three_frames() -> BatchJob {
        BatchJob::new(vec![
            FrameTask::new(0, 0.0, "a"),
            FrameTask::new(1, 1.0, "b"),
            FrameTask::new(2, 2.0, "c"),
        ])
        .with_detector(DetectorKind::Stub)
    }

    #[test]
    fn single_thread_skips_parallel_attempt() {
        let job = three_frames().with_threads(1);
        let outcome = orchestrator().execute(
            &job,
            Arc::new(ModelResource::none()),
            ProgressReporter::new(3),
        );
        assert_eq!(outcome.path, ExecutionPath::Sequential { fell_back: false });
        assert_eq!(outcome.results.len(), 3);
    }

    #[test]
    fn multi_thread_runs_parallel() {
        let job = three_frames().with_threads(4);
        let outcome = orchestrator().execute(
            &job,
            Arc::new(ModelResource::none()),
            ProgressReporter::new(3),
        );
        assert_eq!(outcome.path, ExecutionPath::Parallel);
        let flags: Vec<bool> = outcome.results.iter().map(|r| r.flagged).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[derive(Clone, Default)]
    struct Recorder(std::sync::Arc<std::sync::Mutex<Vec<usize>>>);

    impl crate::progress::ProgressSink for Recorder {
        fn write(&mut self, completed: usize) -> std::io::Result<()> {
            self.0.lock().unwrap().push(completed);
            Ok(())
        }
    }

    #[test]
    fn total_is_reported_only_when_outcome_completes() {
        let recorder = Recorder::default();
        let job = three_frames().with_threads(2);
        let outcome = orchestrator().execute(
            &job,
            Arc::new(ModelResource::none()),
            ProgressReporter::new(3).with_sink(recorder.clone()),
        );
        assert_eq!(*recorder.0.lock().unwrap(), vec![0]);

        let results = outcome.finish();
        assert_eq!(results.len(), 3);
        assert_eq!(*recorder.0.lock().unwrap(), vec![0, 3]);
    }

    #[test]
    fn failed_artifact_write_leaves_progress_incomplete() {
        let recorder = Recorder::default();
        let dir = tempfile::tempdir().unwrap();
        let outcome = orchestrator().execute(
            &three_frames(),
            Arc::new(ModelResource::none()),
            ProgressReporter::new(3).with_sink(recorder.clone()),
        );
        assert!(outcome
            .write_results(&dir.path().join("missing/results.json"))
            .is_err());
        assert_eq!(*recorder.0.lock().unwrap(), vec![0]);
    }

    #[test]
    fn empty_batch_is_done_immediately() {
        let job = BatchJob::new(Vec::new()).with_detector(DetectorKind::Stub);
        let outcome = orchestrator().execute(
            &job,
            Arc::new(ModelResource::none()),
            ProgressReporter::new(0),
        );
        assert!(outcome.results.is_empty());
    }
}
