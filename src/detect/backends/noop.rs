use anyhow::Result;

use crate::detect::backend::FrameClassifier;

/// Backend that never flags a frame.
///
/// Used for unknown detector kinds and as the degraded detector of a worker
/// whose backend failed to initialize.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDetector;

impl FrameClassifier for NoopDetector {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn classify(&mut self, _path: &str, _threshold: f32) -> Result<bool> {
        Ok(false)
    }
}
