//! Detector capability, backends and the kind registry.
//!
//! Backends implement the fallible [`FrameClassifier`]; workers only ever hold
//! the infallible [`Detector`] wrapper.

mod backend;
pub mod backends;
mod kind;
pub mod policy;
mod registry;

pub use backend::{Detector, FrameClassifier};
pub use backends::{NoopDetector, StubDetector};
pub use kind::DetectorKind;
pub use policy::ScorePolicy;
pub use registry::{DetectorFactory, DetectorRegistry, ResolvedDetector};

pub(crate) use backend::panic_message;
