use auto_ocr_core::ConfigOverrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "auto-ocr")]
#[command(about = "Watch a directory and OCR each new PDF exactly once", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the input directory and process new files (the default)
    Run,
    /// Show the most recently processed files from the ledger
    History {
        /// Number of records to show
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory to scan for PDF files
    #[arg(long, global = true)]
    pub input_dir: Option<PathBuf>,

    /// Directory to save OCR'd PDF files
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Path to SQLite database [default: processed_files.db]
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Simulate processing without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Overwrite existing files in output directory
    #[arg(long, global = true)]
    pub overwrite: bool,

    /// Run in daemon mode (continuous polling)
    #[arg(long, global = true)]
    pub daemon: bool,

    /// Polling interval in seconds (daemon mode only) [default: 60]
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Maximum number of files to process in one iteration, 0 for no limit [default: 5]
    #[arg(long, global = true, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Number of retries for file I/O errors [default: 3]
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Delay in seconds between retries [default: 5]
    #[arg(long, global = true)]
    pub retry_delay: Option<u64>,

    /// OCR command to invoke [default: ocrmypdf]
    #[arg(long, global = true)]
    pub ocr_command: Option<String>,

    /// Flag passed to the OCR command; repeat to pass several
    /// [default: --deskew --rotate-pages --force-ocr]
    #[arg(long = "ocr-arg", global = true, allow_hyphen_values = true)]
    pub ocr_args: Vec<String>,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            db_path: self.db_path.clone(),
            dry_run: self.dry_run,
            overwrite: self.overwrite,
            daemon: self.daemon,
            interval_secs: self.interval,
            limit: self.limit,
            retries: self.retries,
            retry_delay_secs: self.retry_delay,
            ocr_command: self.ocr_command.clone(),
            ocr_args: (!self.ocr_args.is_empty()).then(|| self.ocr_args.clone()),
        }
    }
}
