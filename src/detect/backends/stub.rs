use anyhow::Result;

use crate::detect::backend::FrameClassifier;

/// Marker used by the registered `stub` detector kind.
pub const DEFAULT_STUB_MARKER: &str = "flagged";

/// Stub backend for testing. Flags every frame whose path contains a marker.
///
/// The frame itself is never opened, so the stub works on synthetic paths.
#[derive(Clone, Debug)]
pub struct StubDetector {
    marker: String,
}

impl StubDetector {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::new(DEFAULT_STUB_MARKER)
    }
}

impl FrameClassifier for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&mut self, path: &str, _threshold: f32) -> Result<bool> {
        Ok(!self.marker.is_empty() && path.contains(&self.marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_flags_marked_paths_only() {
        let mut stub = StubDetector::new("b");
        assert!(!stub.classify("a", 0.6).unwrap());
        assert!(stub.classify("b", 0.6).unwrap());
        assert!(!StubDetector::new("").classify("b", 0.6).unwrap());
    }
}
