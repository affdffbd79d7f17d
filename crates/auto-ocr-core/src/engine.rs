use crate::config::ReconcileSettings;
use crate::error::Error;
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::scanner::Scanner;
use crate::storage::{Ledger, NewRecord};
use crate::transform::{self, Transformer};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Drives scan, filter, cap and dispatch against one ledger.
pub struct Reconciler<T: Transformer> {
    settings: ReconcileSettings,
    scanner: Scanner,
    ledger: Ledger,
    transformer: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    /// Nothing to do: no candidates, or none of them new.
    #[default]
    Idle,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchStatus {
    Succeeded {
        output_size: Option<u64>,
        duration: Duration,
    },
    Failed(String),
    /// Dry run: the transformation that would have run.
    Simulated { output_path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub file_hash: String,
    pub status: DispatchStatus,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub state: CycleState,
    pub dry_run: bool,
    pub found: usize,
    /// New work discovered, before the cap.
    pub new_work: usize,
    pub skipped_processed: usize,
    pub skipped_output_exists: usize,
    pub unreadable: usize,
    /// Entries left for a later cycle by the cap.
    pub capped: usize,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<FileOutcome>,
    pub elapsed: Duration,
}

struct WorkItem {
    path: PathBuf,
    file_hash: String,
}

impl<T: Transformer> Reconciler<T> {
    /// Creates the output directory if it is missing.
    pub fn new(settings: ReconcileSettings, ledger: Ledger, transformer: T) -> Result<Self, Error> {
        fs::create_dir_all(&settings.output_dir)?;
        let scanner = Scanner::new(&settings.input_dir);
        Ok(Self {
            settings,
            scanner,
            ledger,
            transformer,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// One full pass. Listing, per-file read and transform failures are logged
    /// and recorded in the report; only ledger failures abort the cycle.
    pub fn run_cycle(&self, reporter: &dyn ProgressReporter) -> Result<CycleReport, Error> {
        let start = Instant::now();
        let mut report = CycleReport {
            dry_run: self.settings.dry_run,
            ..CycleReport::default()
        };

        // Scanning
        info!("Scanning {}...", self.settings.input_dir.display());
        reporter.on_cycle_start(&self.settings.input_dir);
        let candidates = match self.scanner.list_candidates() {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Could not list {}: {}", self.settings.input_dir.display(), e);
                Vec::new()
            }
        };
        report.found = candidates.len();
        reporter.on_scan_complete(report.found);
        if candidates.is_empty() {
            info!("No PDF files found.");
            return Ok(self.finish(report, start, reporter));
        }

        // Filtering
        let mut work = self.filter(candidates, &mut report)?;
        report.new_work = work.len();
        if work.is_empty() {
            info!("No new files to process.");
            return Ok(self.finish(report, start, reporter));
        }

        // Capping
        if let Some(limit) = self.settings.limit {
            if work.len() > limit {
                report.capped = work.len() - limit;
                work.truncate(limit);
            }
        }
        info!(
            "Found {} new files. Processing {} (limit: {}).",
            report.new_work,
            work.len(),
            self.settings
                .limit
                .map_or_else(|| "none".to_string(), |l| l.to_string()),
        );

        // Dispatching
        report.state = CycleState::Done;
        reporter.on_dispatch_start(work.len(), self.settings.dry_run);
        let total = work.len();
        for (index, item) in work.into_iter().enumerate() {
            reporter.on_file_start(index, total, &item.path);
            let outcome = self.dispatch(item)?;
            match outcome.status {
                DispatchStatus::Succeeded { .. } => report.succeeded += 1,
                DispatchStatus::Failed(_) => report.failed += 1,
                DispatchStatus::Simulated { .. } => {}
            }
            report.dispatched += 1;
            reporter.on_file_complete(&outcome);
            report.outcomes.push(outcome);
        }

        Ok(self.finish(report, start, reporter))
    }

    fn filter(
        &self,
        candidates: Vec<PathBuf>,
        report: &mut CycleReport,
    ) -> Result<Vec<WorkItem>, Error> {
        let mut work = Vec::new();
        let mut queued: HashSet<String> = HashSet::new();
        for path in candidates {
            let name = display_name(&path);
            let file_hash = match hasher::fingerprint(&path, self.settings.retry) {
                Ok(hash) => hash,
                Err(e) => {
                    error!("Could not read {} after retries: {}. Skipping.", name, e);
                    report.unreadable += 1;
                    continue;
                }
            };

            if self.ledger.is_processed(&file_hash)? {
                debug!("Skipping {}: Already in database.", name);
                report.skipped_processed += 1;
                continue;
            }

            if queued.contains(&file_hash) {
                debug!("Skipping {}: Same content already queued this cycle.", name);
                report.skipped_processed += 1;
                continue;
            }

            let output_path = transform::output_path_for(&self.settings.output_dir, &path);
            if output_path.exists() && !self.settings.overwrite {
                info!(
                    "Skipping {}: Output file already exists (use --overwrite to force).",
                    name
                );
                report.skipped_output_exists += 1;
                continue;
            }

            queued.insert(file_hash.clone());
            work.push(WorkItem { path, file_hash });
        }
        Ok(work)
    }

    fn dispatch(&self, item: WorkItem) -> Result<FileOutcome, Error> {
        let output_path = transform::output_path_for(&self.settings.output_dir, &item.path);
        let input_size = match fs::metadata(&item.path) {
            Ok(metadata) => Some(metadata.len()),
            Err(e) => {
                warn!("Unable to read size for {}: {}", item.path.display(), e);
                None
            }
        };

        if self.settings.dry_run {
            info!(
                "[DRY-RUN] Would process {} -> {}",
                item.path.display(),
                output_path.display()
            );
            return Ok(FileOutcome {
                path: item.path,
                file_hash: item.file_hash,
                status: DispatchStatus::Simulated { output_path },
            });
        }

        let status = match self.transformer.transform(&item.path, &output_path) {
            Ok(output) => {
                let filename = display_name(&item.path);
                let input_dir = self.settings.input_dir.to_string_lossy();
                let output_dir = self.settings.output_dir.to_string_lossy();
                self.ledger.mark_processed(&NewRecord {
                    filename: &filename,
                    input_dir: &input_dir,
                    output_dir: &output_dir,
                    file_hash: &item.file_hash,
                    input_size,
                    output_size: output.output_size,
                    duration: Some(output.duration.as_secs_f64()),
                })?;
                DispatchStatus::Succeeded {
                    output_size: output.output_size,
                    duration: output.duration,
                }
            }
            Err(e) => {
                error!("Error processing {}: {}", item.path.display(), e);
                DispatchStatus::Failed(e.to_string())
            }
        };

        Ok(FileOutcome {
            path: item.path,
            file_hash: item.file_hash,
            status,
        })
    }

    fn finish(
        &self,
        mut report: CycleReport,
        start: Instant,
        reporter: &dyn ProgressReporter,
    ) -> CycleReport {
        report.elapsed = start.elapsed();
        info!(
            "Cycle finished in {:.2}s: {} found, {} new, {} already processed, {} output exists, \
             {} unreadable, {} capped, {} succeeded, {} failed",
            report.elapsed.as_secs_f64(),
            report.found,
            report.new_work,
            report.skipped_processed,
            report.skipped_output_exists,
            report.unreadable,
            report.capped,
            report.succeeded,
            report.failed,
        );
        reporter.on_cycle_complete(&report);
        report
    }

    /// Repeats `run_cycle` every `interval` until `shutdown` is raised.
    /// The flag is only consulted between cycles; returns the number of cycles run.
    /// A ledger failure ends the daemon with that error.
    pub fn run_daemon(
        &self,
        shutdown: &AtomicBool,
        reporter: &dyn ProgressReporter,
    ) -> Result<usize, Error> {
        info!(
            "Starting daemon mode (interval: {}s)...",
            self.settings.interval.as_secs()
        );
        let mut cycles = 0;
        while !shutdown.load(Ordering::SeqCst) {
            self.run_cycle(reporter)?;
            cycles += 1;
            if wait_for_shutdown(shutdown, self.settings.interval) {
                break;
            }
        }
        info!("Daemon stopped after {} cycles.", cycles);
        Ok(cycles)
    }
}

/// Sleeps for `interval` in short slices; true if shutdown was requested.
fn wait_for_shutdown(shutdown: &AtomicBool, interval: Duration) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(SHUTDOWN_POLL.min(deadline - now));
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
