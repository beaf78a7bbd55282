pub mod noop;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use noop::NoopDetector;
pub use stub::StubDetector;

#[cfg(feature = "backend-tract")]
pub use tract::TractClassifier;
