use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Identifier generation failed: {0}")]
    Identifier(#[from] ulid::MonotonicError),

    #[error("Incompatible ledger schema in {path}: {reason}")]
    IncompatibleSchema { path: PathBuf, reason: String },
}

/// Failure of a single transformation. Never fatal to a cycle.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("no output produced at {0}")]
    MissingOutput(PathBuf),

    #[error("{0}")]
    Other(String),
}
