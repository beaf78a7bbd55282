//! framescan
//!
//! Batch classification of decoded media frames with pluggable detector backends.
//!
//! # Architecture
//!
//! A batch flows through four stages:
//!
//! 1. **Configuration** (`config`): the job descriptor becomes a validated `BatchJob`.
//! 2. **Supervision** (`orchestrator`): the model resource is resolved once, then the
//!    batch runs in parallel, falling back to a sequential rerun of the whole batch
//!    if the worker pool fails.
//! 3. **Dispatch** (`dispatch`, `worker`): isolated workers, each with its own
//!    detector built once at startup, classify chunks of frames.
//! 4. **Aggregation** (`aggregate`): results are ordered by frame index and written
//!    atomically.
//!
//! Detectors (`detect`) never fail: backend errors and panics become "not flagged".
//! Progress (`progress`) is a best-effort side channel that never fails the batch.

pub mod aggregate;
pub mod config;
pub mod console;
pub mod detect;
pub mod dispatch;
pub mod frame;
pub mod model;
pub mod orchestrator;
pub mod progress;
pub mod worker;

pub use config::BatchJob;
pub use detect::{Detector, DetectorKind, DetectorRegistry, FrameClassifier};
pub use dispatch::{PoolError, ThreadSpawner, WorkerSpawner};
pub use frame::{ClassificationResult, FrameTask};
pub use model::ModelResource;
pub use orchestrator::{BatchOutcome, ExecutionPath, ExecutionState, Orchestrator};
pub use progress::{FileProgressSink, ProgressReporter, ProgressSink};
pub use worker::WorkerContext;
