//! Frame tasks and classification results.
//!
//! - `FrameTask`: one decoded frame handed to the orchestrator (index, timestamp, path).
//! - `ClassificationResult`: the verdict for exactly one `FrameTask`.
//!
//! A result always carries the task's `index`, `timestamp` and `path` verbatim.
//! Only `flagged` depends on what the detector said (or failed to say).

use serde::{Deserialize, Serialize};

/// One frame to classify. Produced by media decoding, immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameTask {
    /// Unique within a batch; defines the original order.
    pub index: u64,
    /// Position of the frame in the source media, in seconds.
    pub timestamp: f64,
    /// Location of the decoded frame on disk.
    pub path: String,
}

impl FrameTask {
    pub fn new(index: u64, timestamp: f64, path: impl Into<String>) -> Self {
        Self {
            index,
            timestamp,
            path: path.into(),
        }
    }

    /// Build the result for this task.
    pub fn into_result(self, flagged: bool) -> ClassificationResult {
        ClassificationResult {
            index: self.index,
            timestamp: self.timestamp,
            path: self.path,
            flagged,
        }
    }
}

/// Verdict for a single frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub index: u64,
    pub timestamp: f64,
    pub path: String,
    pub flagged: bool,
}
