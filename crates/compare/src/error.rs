use std::path::PathBuf;

use inspecta_config::ConfigError;
use inspecta_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompareError {
    /// No reference table yet; a capture has to run first.
    #[error("baseline table not found: {} (run a capture first)", path.display())]
    MissingBaselineFile { path: PathBuf },

    #[error("test table not found: {}", path.display())]
    MissingTestFile { path: PathBuf },

    #[error(transparent)]
    Table(#[from] IoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The capture was abandoned; nothing was written.
    #[error("capture cancelled after {completed} of {planned} samples; no table written")]
    CaptureCancelled { completed: usize, planned: usize },

    #[error("detection failed for sample {sample}: {message}")]
    Detection { sample: String, message: String },

    #[error("line {line}: invalid detection result: {message}")]
    DetectionInput { line: usize, message: String },
}
