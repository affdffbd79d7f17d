use auto_ocr_core::{DispatchStatus, FileOutcome, ProgressReporter};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// CLI progress reporter: one bar over the dispatch phase of each cycle.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.guard().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_dispatch_start(&self, total: usize, dry_run: bool) {
        let pb = ProgressBar::new(total as u64);
        let template = if dry_run {
            "  {spinner:.yellow} [DRY-RUN] [{bar:30.yellow/dim}] {pos}/{len} {msg}"
        } else {
            "  {spinner:.cyan} OCR [{bar:30.cyan/dim}] {pos}/{len} {msg} ({elapsed})"
        };
        if let Ok(style) = ProgressStyle::with_template(template) {
            pb.set_style(
                style
                    .progress_chars("━╸─")
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        let mut guard = self.guard();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        if let Some(pb) = self.guard().as_ref() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            pb.set_message(name);
        }
    }

    fn on_file_complete(&self, outcome: &FileOutcome) {
        if let Some(pb) = self.guard().as_ref() {
            if let DispatchStatus::Failed(reason) = &outcome.status {
                pb.println(format!("  {} {}: {}", "✗".red(), outcome.path.display(), reason));
            }
            pb.inc(1);
        }
    }

    fn on_cycle_complete(&self, _report: &auto_ocr_core::CycleReport) {
        self.finish_bar();
    }
}
