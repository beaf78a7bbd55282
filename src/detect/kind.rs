use std::fmt;

use serde::{Deserialize, Serialize};

use super::policy::ScorePolicy;

/// Detector kind named by a batch job.
///
/// Unrecognised tags are preserved in `Other` and resolve to the no-op detector
/// at registry lookup; they are never a configuration error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DetectorKind {
    /// Per-label region scores compared against the threshold.
    #[default]
    Primary,
    /// Weighted sum over explicit category probabilities.
    CategoryScores,
    /// Positive prompt similarity contrasted with safe prompt similarity.
    PromptContrast,
    /// Path-marker detector for tests and dry runs.
    Stub,
    Other(String),
}

impl DetectorKind {
    pub fn as_str(&self) -> &str {
        match self {
            DetectorKind::Primary => "primary",
            DetectorKind::CategoryScores => "nsfw_model",
            DetectorKind::PromptContrast => "clip_interrogator",
            DetectorKind::Stub => "stub",
            DetectorKind::Other(tag) => tag,
        }
    }

    /// Scoring policy of the built-in model-backed kinds.
    ///
    /// `Stub` and unknown kinds have none and accept any finite threshold.
    pub fn score_policy(&self) -> Option<ScorePolicy> {
        match self {
            DetectorKind::Primary => Some(ScorePolicy::label_threshold()),
            DetectorKind::CategoryScores => Some(ScorePolicy::CategorySum),
            DetectorKind::PromptContrast => Some(ScorePolicy::prompt_contrast()),
            DetectorKind::Stub | DetectorKind::Other(_) => None,
        }
    }
}

impl From<&str> for DetectorKind {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "primary" | "nudenet" => DetectorKind::Primary,
            "nsfw_model" => DetectorKind::CategoryScores,
            "clip_interrogator" | "clip" => DetectorKind::PromptContrast,
            "stub" => DetectorKind::Stub,
            _ => DetectorKind::Other(tag.to_string()),
        }
    }
}

impl From<String> for DetectorKind {
    fn from(tag: String) -> Self {
        DetectorKind::from(tag.as_str())
    }
}

impl From<DetectorKind> for String {
    fn from(kind: DetectorKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
