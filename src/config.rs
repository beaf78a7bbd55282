use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::detect::DetectorKind;
use crate::frame::FrameTask;

const DEFAULT_DETECTOR: &str = "primary";
const DEFAULT_THRESHOLD: f32 = 0.6;
const DEFAULT_THREADS: usize = 4;

#[derive(Debug, Deserialize, Default)]
struct BatchJobFile {
    frames: Option<Vec<FrameTask>>,
    detector: Option<String>,
    threshold: Option<f32>,
    threads: Option<usize>,
    progress_path: Option<String>,
    model_path: Option<PathBuf>,
}

/// One classification batch, fully defaulted and validated.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub frames: Vec<FrameTask>,
    pub detector: DetectorKind,
    pub threshold: f32,
    pub threads: usize,
    pub progress_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
}

impl BatchJob {
    /// Job with default detector, threshold and concurrency.
    pub fn new(frames: Vec<FrameTask>) -> Self {
        Self {
            frames,
            detector: DetectorKind::from(DEFAULT_DETECTOR),
            threshold: DEFAULT_THRESHOLD,
            threads: DEFAULT_THREADS,
            progress_path: None,
            model_path: None,
        }
    }

    pub fn with_detector(mut self, detector: impl Into<DetectorKind>) -> Self {
        self.detector = detector.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_progress_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.progress_path = Some(path.into());
        self
    }

    /// Load a job descriptor, apply environment overrides and an optional
    /// threshold override (which wins over everything else), then validate.
    pub fn load(path: &Path, threshold_override: Option<f32>) -> Result<Self> {
        let file = read_job_file(path)?;
        let mut job = Self::from_file(file);
        job.apply_env()?;
        if let Some(threshold) = threshold_override {
            job.threshold = threshold;
        }
        job.validate()?;
        Ok(job)
    }

    fn from_file(file: BatchJobFile) -> Self {
        let detector = DetectorKind::from(
            file.detector
                .as_deref()
                .filter(|tag| !tag.trim().is_empty())
                .unwrap_or(DEFAULT_DETECTOR),
        );
        Self {
            frames: file.frames.unwrap_or_default(),
            detector,
            threshold: file.threshold.unwrap_or(DEFAULT_THRESHOLD),
            threads: file.threads.unwrap_or(DEFAULT_THREADS),
            progress_path: non_empty_path(file.progress_path),
            model_path: file.model_path.filter(|p| !p.as_os_str().is_empty()),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(detector) = std::env::var("FRAMESCAN_DETECTOR") {
            if !detector.trim().is_empty() {
                self.detector = DetectorKind::from(detector);
            }
        }
        if let Ok(threads) = std::env::var("FRAMESCAN_THREADS") {
            self.threads = threads
                .trim()
                .parse()
                .map_err(|_| anyhow!("FRAMESCAN_THREADS must be a positive integer"))?;
        }
        if let Ok(threshold) = std::env::var("FRAMESCAN_THRESHOLD") {
            self.threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("FRAMESCAN_THRESHOLD must be a number"))?;
        }
        if let Ok(path) = std::env::var("FRAMESCAN_PROGRESS_PATH") {
            if !path.trim().is_empty() {
                self.progress_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("FRAMESCAN_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(anyhow!("threads must be at least 1"));
        }
        if !self.threshold.is_finite() {
            return Err(anyhow!("threshold must be a finite number, got {}", self.threshold));
        }
        if let Some(policy) = self.detector.score_policy() {
            let range = policy.threshold_range();
            if !range.contains(&self.threshold) {
                return Err(anyhow!(
                    "threshold for detector '{}' must be between {} and {}, got {}",
                    self.detector,
                    range.start(),
                    range.end(),
                    self.threshold
                ));
            }
        }
        let mut seen = HashSet::with_capacity(self.frames.len());
        for frame in &self.frames {
            if !seen.insert(frame.index) {
                return Err(anyhow!("duplicate frame index {}", frame.index));
            }
        }
        Ok(())
    }
}

fn read_job_file(path: &Path) -> Result<BatchJobFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read job descriptor {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let file = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid job descriptor {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid job descriptor {}: {}", path.display(), e))?
    };
    Ok(file)
}

fn non_empty_path(value: Option<String>) -> Option<PathBuf> {
    value
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let job = BatchJob::from_file(BatchJobFile::default());
        assert!(job.frames.is_empty());
        assert_eq!(job.detector, DetectorKind::Primary);
        assert_eq!(job.threshold, 0.6);
        assert_eq!(job.threads, 4);
        assert!(job.progress_path.is_none());
        assert!(job.model_path.is_none());
        job.validate().unwrap();
    }

    #[test]
    fn empty_progress_path_means_none() {
        let job = BatchJob::from_file(BatchJobFile {
            progress_path: Some("  ".to_string()),
            detector: Some(String::new()),
            ..BatchJobFile::default()
        });
        assert!(job.progress_path.is_none());
        assert_eq!(job.detector, DetectorKind::Primary);
    }

    #[test]
    fn rejects_zero_threads() {
        let err = BatchJob::new(Vec::new()).with_threads(0).validate().unwrap_err();
        assert!(err.to_string().contains("threads"));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        assert!(BatchJob::new(Vec::new()).with_threshold(1.5).validate().is_err());
        assert!(BatchJob::new(Vec::new()).with_threshold(f32::NAN).validate().is_err());
        BatchJob::new(Vec::new()).with_threshold(0.0).validate().unwrap();
    }

    #[test]
    fn threshold_range_depends_on_detector() {
        let clip = BatchJob::new(Vec::new()).with_detector(DetectorKind::PromptContrast);
        clip.clone().with_threshold(-0.5).validate().unwrap();
        assert!(clip.with_threshold(1.5).validate().is_err());

        BatchJob::new(Vec::new())
            .with_detector(DetectorKind::Stub)
            .with_threshold(3.0)
            .validate()
            .unwrap();
        assert!(BatchJob::new(Vec::new())
            .with_detector("custom")
            .with_threshold(f32::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn rejects_duplicate_indices() {
        let job = BatchJob::new(vec![FrameTask::new(1, 0.0, "a"), FrameTask::new(1, 1.0, "b")]);
        let err = job.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate frame index 1"));
    }
}
