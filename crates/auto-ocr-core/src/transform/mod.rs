pub mod ocrmypdf;

pub use ocrmypdf::OcrMyPdf;

use crate::error::TransformError;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const OUTPUT_PREFIX: &str = "ocr_";

/// What a successful transformation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub output_path: PathBuf,
    /// `None` when the output could not be stat'ed.
    pub output_size: Option<u64>,
    pub duration: Duration,
}

/// The external document transformation. Implementations block until done.
pub trait Transformer {
    fn transform(&self, input: &Path, output: &Path) -> Result<TransformOutput, TransformError>;
}

impl<T: Transformer + ?Sized> Transformer for &T {
    fn transform(&self, input: &Path, output: &Path) -> Result<TransformOutput, TransformError> {
        (**self).transform(input, output)
    }
}

impl<T: Transformer + ?Sized> Transformer for Box<T> {
    fn transform(&self, input: &Path, output: &Path) -> Result<TransformOutput, TransformError> {
        (**self).transform(input, output)
    }
}

/// `<output_dir>/ocr_<input file name>`
pub fn output_path_for(output_dir: &Path, input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}{}", OUTPUT_PREFIX, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_naming() {
        let out = output_path_for(Path::new("/srv/out"), Path::new("/srv/in/Invoice 42.pdf"));
        assert_eq!(out, PathBuf::from("/srv/out/ocr_Invoice 42.pdf"));
    }
}
