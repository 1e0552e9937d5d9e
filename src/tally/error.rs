//! Error types for counting and persistence

use crate::keyboard::SourceError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or writing the counts file
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Could not create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors surfaced by the recorder to its owner
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The key source refused the subscription; the recorder stays idle
    #[error("Key source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    /// An operation was called in a state that does not allow it
    #[error("Invalid recorder usage: {0}")]
    UsageFault(&'static str),
    /// The capture thread could not be started
    #[error("Could not start capture thread: {0}")]
    Spawn(io::Error),
}
