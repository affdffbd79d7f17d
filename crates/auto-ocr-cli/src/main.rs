mod commands;
mod logging;
mod progress;

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use auto_ocr_core::{AppConfig, CycleReport, Ledger, OcrMyPdf, Reconciler};
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match auto_ocr_core::config::load_configuration(&args.run.overrides()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(2);
        }
    };

    let result = match args.command {
        Some(Commands::Run) | None => run_process(&config),
        Some(Commands::History { count }) => print_history(&config, count),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_process(config: &AppConfig) -> anyhow::Result<()> {
    let settings = config.reconcile_settings()?;
    let ledger = Ledger::open(&config.db_path)
        .with_context(|| format!("opening ledger at {}", config.db_path.display()))?;
    let transformer = OcrMyPdf::new(config.ocr_command.clone()).with_args(config.ocr_args.clone());
    let reconciler = Reconciler::new(settings, ledger, transformer)?;
    let reporter = CliReporter::new();

    if config.daemon {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            info!("Received Ctrl+C, stopping after the current cycle...");
            flag.store(true, Ordering::SeqCst);
        })?;
        let cycles = reconciler.run_daemon(&shutdown, &reporter)?;
        info!("Daemon stopped by user after {} cycles.", cycles);
    } else {
        let report = reconciler.run_cycle(&reporter)?;
        print_summary(&report);
        info!("One-off run completed.");
    }

    Ok(())
}

fn print_summary(report: &CycleReport) {
    let mode = if report.dry_run { " (dry run)".yellow() } else { "".normal() };
    info!(
        "Found: {}, New: {}, Already processed: {}, Output exists: {}, Unreadable: {}{}",
        format!("{}", report.found).cyan(),
        format!("{}", report.new_work).cyan(),
        report.skipped_processed,
        report.skipped_output_exists,
        format!("{}", report.unreadable).red(),
        mode,
    );
    info!(
        "Dispatched: {}, Capped: {}, Succeeded: {}, Failed: {} in {}",
        report.dispatched,
        report.capped,
        format!("{}", report.succeeded).green(),
        format!("{}", report.failed).red(),
        format!("{:.2}s", report.elapsed.as_secs_f64()).green(),
    );
}

fn print_history(config: &AppConfig, count: usize) -> anyhow::Result<()> {
    let ledger = Ledger::open(&config.db_path)
        .with_context(|| format!("opening ledger at {}", config.db_path.display()))?;
    let total = ledger.count()?;
    let records = ledger.list_records(count)?;

    println!(
        "{} processed files in {} (showing {})",
        format!("{}", total).cyan(),
        config.db_path.display(),
        records.len()
    );
    for record in records {
        let when = record
            .processed_at_utc()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .or(record.processed_at.clone())
            .unwrap_or_else(|| "-".to_string());
        let duration = record
            .duration
            .map(|d| format!("{:.1}s", d))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {}  {}  {}",
            when,
            record.file_hash.chars().take(12).collect::<String>().dimmed(),
            format_size(record.input_size).normal(),
            duration.green(),
            record.filename,
        );
    }
    Ok(())
}

fn format_size(size: Option<i64>) -> String {
    match size {
        Some(bytes) if bytes >= 1 << 20 => format!("{:.1} MiB", bytes as f64 / (1 << 20) as f64),
        Some(bytes) if bytes >= 1 << 10 => format!("{:.1} KiB", bytes as f64 / (1 << 10) as f64),
        Some(bytes) => format!("{} B", bytes),
        None => "-".to_string(),
    }
}
