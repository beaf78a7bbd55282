//! Result ordering and the batch output artifact.

use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tempfile::NamedTempFile;

use crate::frame::ClassificationResult;

/// Restore original frame order. Arrival order is irrelevant.
pub fn order_results(mut results: Vec<ClassificationResult>) -> Vec<ClassificationResult> {
    results.sort_by_key(|result| result.index);
    results
}

/// Write the ordered results as a JSON array at `path`.
///
/// The artifact is written to a temporary file next to `path` and renamed into
/// place, so a failed write leaves no partial artifact. Returns the artifact size.
pub fn write_results(path: &Path, results: &[ClassificationResult], expected: usize) -> Result<u64> {
    if results.len() != expected {
        return Err(anyhow!(
            "refusing to write {} results for {} frames",
            results.len(),
            expected
        ));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create results file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, results)
            .with_context(|| format!("failed to serialize results for {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to write results for {}", path.display()))?;
    }
    let file = tmp
        .persist(path)
        .map_err(|e| anyhow!("failed to write results {}: {}", path.display(), e.error))?;
    let size = file
        .metadata()
        .with_context(|| format!("failed to stat results {}", path.display()))?
        .len();
    Ok(size)
}
