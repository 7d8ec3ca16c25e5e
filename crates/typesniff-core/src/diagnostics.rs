//! Error types and failure records

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// A classification function failed.
///
/// Every error or panic raised inside an engine's `sniff` is translated into
/// this single kind by the engine runtime. The original message is kept, the
/// original error type is not.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("engine '{engine}' failed: {message}")]
pub struct EngineFailure {
    pub engine: String,
    pub message: String,
}

impl EngineFailure {
    pub fn new(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            message: message.into(),
        }
    }
}

/// File access errors
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to read file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a regular file: {path}")]
    NotRegular { path: PathBuf },

    #[error("Scan root does not exist or is not a directory: {path}")]
    MissingRoot { path: PathBuf },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid glob pattern: {pattern} ({message})")]
    InvalidPattern { pattern: String, message: String },

    #[error("Worker count must be at least 1")]
    ZeroWorkers,

    #[error("Invalid oracle mode '{value}' (expected auto, off or only)")]
    InvalidOracleMode { value: String },

    #[error("Failed to load config: {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to start worker pool: {message}")]
    WorkerPool { message: String },
}

/// Top-level error for the detection library
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Engine(#[from] EngineFailure),

    #[error("Unknown engine: {name}")]
    NotFound { name: String },

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// True when this error reports an unknown engine name.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}
