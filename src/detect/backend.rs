use std::panic::{self, AssertUnwindSafe};

use anyhow::Result;

use super::backends::NoopDetector;

/// Frame classifier backend trait.
///
/// Backends are free to fail: unreadable frames, malformed model output and
/// inference errors all come back as `Err`. Callers never see these errors
/// directly; every backend is wrapped in a [`Detector`] before use.
pub trait FrameClassifier: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Decide whether the frame at `path` is flagged under `threshold`.
    fn classify(&mut self, path: &str, threshold: f32) -> Result<bool>;

    /// Optional warm-up hook, run once when a worker initializes the backend.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Infallible detector capability.
///
/// `classify` always returns a verdict. Backend errors and backend panics are
/// logged and collapse to `false`; control flow of the caller never changes.
pub struct Detector {
    inner: Box<dyn FrameClassifier>,
}

impl Detector {
    pub fn new(inner: Box<dyn FrameClassifier>) -> Self {
        Self { inner }
    }

    /// Detector that never flags anything.
    pub fn noop() -> Self {
        Self::new(Box::new(NoopDetector))
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    pub fn classify(&mut self, path: &str, threshold: f32) -> bool {
        let inner = &mut self.inner;
        match panic::catch_unwind(AssertUnwindSafe(|| inner.classify(path, threshold))) {
            Ok(Ok(flagged)) => flagged,
            Ok(Err(err)) => {
                log::warn!(
                    "{} failed to classify {}: {:#}",
                    self.inner.name(),
                    path,
                    err
                );
                false
            }
            Err(payload) => {
                log::warn!(
                    "{} panicked while classifying {}: {}",
                    self.inner.name(),
                    path,
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("backend", &self.inner.name())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
