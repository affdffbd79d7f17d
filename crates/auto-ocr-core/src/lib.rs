pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod scanner;
pub mod storage;
pub mod transform;

pub use config::{AppConfig, ConfigOverrides, ReconcileSettings};
pub use engine::{CycleReport, CycleState, DispatchStatus, FileOutcome, Reconciler};
pub use error::{Error, TransformError};
pub use hasher::RetryPolicy;
pub use progress::{ProgressReporter, SilentReporter};
pub use storage::{Ledger, NewRecord, ProcessedFileRecord};
pub use transform::{OcrMyPdf, TransformOutput, Transformer};
