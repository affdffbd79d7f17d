use crate::engine::{CycleReport, FileOutcome};
use std::path::Path;

/// Trait for reporting reconciliation progress.
///
/// The CLI implements it with indicatif; all methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    fn on_cycle_start(&self, _input_dir: &Path) {}
    fn on_scan_complete(&self, _files_found: usize) {}
    fn on_dispatch_start(&self, _total: usize, _dry_run: bool) {}
    fn on_file_start(&self, _index: usize, _total: usize, _path: &Path) {}
    fn on_file_complete(&self, _outcome: &FileOutcome) {}
    fn on_cycle_complete(&self, _report: &CycleReport) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
