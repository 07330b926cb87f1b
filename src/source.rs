use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::error::ImportOutcome;
use crate::progress::ProgressTracker;

/// The file (or stream) being imported
///
/// Shared between the import worker, the packet handlers and any observer. Path and size
/// never change; progress is written by the worker side only; the started and complete
/// flags are set once each.
#[derive(Debug)]
pub struct CaptureSource {
    path: PathBuf,
    size: u64,
    progress: ProgressTracker,
    started: AtomicBool,
    completed: AtomicBool,
    outcome: OnceLock<ImportOutcome>,
}

impl CaptureSource {
    pub fn new<P: Into<PathBuf>>(path: P, size: u64) -> CaptureSource {
        CaptureSource {
            path: path.into(),
            size,
            progress: ProgressTracker::new(size),
            started: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            outcome: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total size in bytes, as known when the import was created
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Throttled progress, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.progress.fraction()
    }

    pub fn progress_tracker(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Account for `bytes` bytes of input processed
    pub fn record_progress(&self, bytes: u64) {
        self.progress.record(bytes);
    }

    /// Flag the import as started. Returns `false` if it already was.
    pub fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Publish the final outcome and flag the import as complete
    ///
    /// Only the first call has an effect; it returns `false` afterwards.
    pub fn complete(&self, outcome: ImportOutcome) -> bool {
        if self.outcome.set(outcome).is_err() {
            return false;
        }
        self.completed.store(true, Ordering::Release);
        true
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// The outcome, once the import is complete
    pub fn outcome(&self) -> Option<&ImportOutcome> {
        self.outcome.get()
    }
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}, ({}{:.6}%)",
            self.path.display(),
            if self.is_complete() { "COMPLETE / " } else { "" },
            100.0 * self.progress()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;

    #[test]
    fn lifecycle_flags_are_set_once() {
        let source = CaptureSource::new("/tmp/capture.pcap", 400);
        assert!(!source.is_started());
        assert!(source.mark_started());
        assert!(!source.mark_started());
        assert!(source.is_started());

        assert!(!source.is_complete());
        assert!(source.complete(ImportOutcome::Failed(ImportError::UnexpectedEof(12))));
        assert!(!source.complete(ImportOutcome::Completed));
        assert!(source.is_complete());
        assert!(matches!(
            source.outcome(),
            Some(ImportOutcome::Failed(ImportError::UnexpectedEof(12)))
        ));
    }

    #[test]
    fn display() {
        let source = CaptureSource::new("capture.pcap", 400);
        source.record_progress(100);
        assert_eq!(source.to_string(), "capture.pcap, (25.000000%)");
        source.complete(ImportOutcome::Completed);
        assert_eq!(source.to_string(), "capture.pcap, (COMPLETE / 25.000000%)");
    }
}
