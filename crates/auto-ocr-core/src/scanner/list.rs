use glob::{MatchOptions, Pattern};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, error};

pub const PDF_PATTERN: &str = "*.pdf";

/// Lists candidate files directly inside one directory (non-recursive).
pub struct Scanner {
    input_dir: PathBuf,
    pattern: Pattern,
}

impl Scanner {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            pattern: Pattern::new(PDF_PATTERN).expect("static glob pattern is valid"),
        }
    }

    /// Every non-directory entry whose name matches the pattern (case-insensitive),
    /// sorted by file name. A missing directory yields an empty list.
    pub fn list_candidates(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.input_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("Input directory {} does not exist", self.input_dir.display());
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", self.input_dir.display(), err),
                ));
            }
        };

        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let mut candidates = Vec::new();
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    error!(
                        "Error reading entry in directory {}: {}",
                        self.input_dir.display(),
                        err
                    );
                    continue;
                }
            };

            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                continue;
            }

            let name = entry.file_name();
            if self.pattern.matches_with(&name.to_string_lossy(), options) {
                candidates.push(entry.path());
            }
        }

        candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(candidates)
    }
}
