//! Model resource handle.
//!
//! Resolved once per batch, before any worker starts, then shared read-only
//! (`Arc<ModelResource>`) with every worker's one-time detector initializer.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};

/// Extension of the optional label sidecar next to a model file.
const LABELS_EXTENSION: &str = "labels";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelResource {
    model_path: Option<PathBuf>,
    labels: Vec<String>,
    digest: Option<String>,
}

impl ModelResource {
    /// Handle with no model; backends fall back to their own defaults.
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve a configured model path.
    ///
    /// A configured path must exist. Labels are read from `<model>.labels`
    /// (one per line) when present.
    pub fn resolve(model_path: Option<&Path>) -> Result<Self> {
        let Some(path) = model_path else {
            return Ok(Self::none());
        };
        if !path.is_file() {
            return Err(anyhow!("model file does not exist: {}", path.display()));
        }

        let digest = file_digest(path)?;
        let labels_path = path.with_extension(LABELS_EXTENSION);
        let labels = if labels_path.is_file() {
            let raw = std::fs::read_to_string(&labels_path).map_err(|e| {
                anyhow!("failed to read labels {}: {}", labels_path.display(), e)
            })?;
            parse_labels(&raw)
        } else {
            Vec::new()
        };

        log::info!(
            "model resource {} sha256={} labels={}",
            path.display(),
            digest,
            labels.len()
        );

        Ok(Self {
            model_path: Some(path.to_path_buf()),
            labels,
            digest: Some(digest),
        })
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Hex SHA-256 of the model file, for diagnostics.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

fn file_digest(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open model {}", path.display()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to read model {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

fn parse_labels(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
