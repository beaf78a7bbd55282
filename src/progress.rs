//! Progress side channel.
//!
//! The reporter turns completion signals into counter writes:
//! - `0` at batch start, always, and the frame total once the results are written;
//! - the running count after every `REPORT_EVERY` completions, best-effort.
//!
//! Reporting is advisory. Write failures are discarded on purpose and never
//! reach the batch. Written values never decrease, including when a failed
//! parallel attempt is followed by a sequential rerun.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Completions between periodic writes.
pub const REPORT_EVERY: usize = 5;

/// Destination for the completion counter.
pub trait ProgressSink {
    fn write(&mut self, completed: usize) -> io::Result<()>;
}

/// Overwrites a plain text file with the decimal counter.
#[derive(Clone, Debug)]
pub struct FileProgressSink {
    path: PathBuf,
}

impl FileProgressSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProgressSink for FileProgressSink {
    fn write(&mut self, completed: usize) -> io::Result<()> {
        std::fs::write(&self.path, completed.to_string())
    }
}

pub struct ProgressReporter {
    sinks: Vec<Box<dyn ProgressSink>>,
    total: usize,
    completed: usize,
    high_water: Option<usize>,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            sinks: Vec::new(),
            total,
            completed: 0,
            high_water: None,
        }
    }

    /// Reporter writing to `path` when one is configured.
    pub fn for_path(path: Option<&Path>, total: usize) -> Self {
        let reporter = Self::new(total);
        match path {
            Some(path) => reporter.with_sink(FileProgressSink::new(path)),
            None => reporter,
        }
    }

    pub fn with_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Completions counted in the current pass.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Mandatory initial write.
    pub fn start(&mut self) {
        self.completed = 0;
        self.emit(0);
    }

    /// Signal one completed task.
    pub fn record_completion(&mut self) {
        self.completed += 1;
        let above_high_water = self.high_water.map_or(true, |hw| self.completed > hw);
        if self.completed % REPORT_EVERY == 0 && above_high_water {
            self.emit(self.completed);
        }
    }

    /// Begin counting a rerun of the batch from zero.
    ///
    /// Periodic writes stay suppressed until the new count passes the highest
    /// value already written.
    pub fn restart_pass(&mut self) {
        self.completed = 0;
    }

    /// Mandatory final write of the frame total.
    ///
    /// Called once the batch's results are durable, never before.
    pub fn finish(&mut self) {
        self.completed = self.total;
        self.emit(self.total);
    }

    fn emit(&mut self, value: usize) {
        self.high_water = Some(self.high_water.map_or(value, |hw| hw.max(value)));
        for sink in &mut self.sinks {
            // Best-effort: a missing directory or permission error must not
            // affect the batch.
            if let Err(err) = sink.write(value) {
                log::debug!("progress write of {} discarded: {}", value, err);
            }
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("sinks", &self.sinks.len())
            .field("total", &self.total)
            .field("completed", &self.completed)
            .field("high_water", &self.high_water)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<usize>>>);

    impl ProgressSink for Recorder {
        fn write(&mut self, completed: usize) -> io::Result<()> {
            self.0.lock().unwrap().push(completed);
            Ok(())
        }
    }

    struct Broken;

    impl ProgressSink for Broken {
        fn write(&mut self, _completed: usize) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn writes_start_every_fifth_and_end() {
        let recorder = Recorder::default();
        let mut reporter = ProgressReporter::new(12).with_sink(recorder.clone());
        reporter.start();
        for _ in 0..12 {
            reporter.record_completion();
        }
        reporter.finish();
        assert_eq!(*recorder.0.lock().unwrap(), vec![0, 5, 10, 12]);
    }

    #[test]
    fn rerun_never_writes_lower_values() {
        let recorder = Recorder::default();
        let mut reporter = ProgressReporter::new(12).with_sink(recorder.clone());
        reporter.start();
        for _ in 0..10 {
            reporter.record_completion();
        }
        reporter.restart_pass();
        for _ in 0..12 {
            reporter.record_completion();
        }
        reporter.finish();

        let written = recorder.0.lock().unwrap().clone();
        assert_eq!(written, vec![0, 5, 10, 12]);
        assert!(written.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn write_failures_are_discarded() {
        let recorder = Recorder::default();
        let mut reporter = ProgressReporter::new(5)
            .with_sink(Broken)
            .with_sink(recorder.clone());
        reporter.start();
        for _ in 0..5 {
            reporter.record_completion();
        }
        reporter.finish();
        assert_eq!(*recorder.0.lock().unwrap(), vec![0, 5, 5]);
    }

    #[test]
    fn file_sink_overwrites_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.txt");
        let mut reporter = ProgressReporter::for_path(Some(&path), 7);
        reporter.start();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");
        for _ in 0..7 {
            reporter.record_completion();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "5");
        reporter.finish();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "7");
    }

    #[test]
    fn missing_directory_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/progress.txt");
        let mut reporter = ProgressReporter::for_path(Some(&path), 1);
        reporter.start();
        reporter.record_completion();
        reporter.finish();
        assert!(!path.exists());
    }
}
