use super::{TransformOutput, Transformer};
use crate::config::DEFAULT_OCR_ARGS;
use crate::error::TransformError;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Instant;
use tracing::{debug, info};

/// Runs the `ocrmypdf` command line tool as a child process.
pub struct OcrMyPdf {
    program: String,
    args: Vec<String>,
}

impl OcrMyPdf {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: DEFAULT_OCR_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Replaces the flags passed before the input and output paths.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl Transformer for OcrMyPdf {
    fn transform(&self, input: &Path, output: &Path) -> Result<TransformOutput, TransformError> {
        info!("Processing {}...", input.display());
        debug!("{} {:?} {} {}", self.program, self.args, input.display(), output.display());

        let start = Instant::now();
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg(output)
            .output()
            .map_err(|source| TransformError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let duration = start.elapsed();

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(TransformError::Exit {
                program: self.program.clone(),
                status: result.status,
                stderr: last_line.trim().to_string(),
            });
        }

        if !output.exists() {
            return Err(TransformError::MissingOutput(output.to_path_buf()));
        }

        let output_size = fs::metadata(output).map(|m| m.len()).ok();
        info!(
            "Successfully processed {} in {:.2}s",
            input.display(),
            duration.as_secs_f64()
        );
        Ok(TransformOutput {
            output_path: output.to_path_buf(),
            output_size,
            duration,
        })
    }
}
