//! # typesniff-core
//!
//! Content-type detection for arbitrary byte payloads.
//!
//! Independent engines each propose ranked [`Candidate`]s:
//! - byte signatures for binary formats and script openers
//! - CSV, JSON and XML structure heuristics
//! - language engines (Python, PHP, C++, Swift, Zig, Elixir, PowerShell, TOML)
//! - generic binary sniffing and optional external oracles
//!
//! The [`Detector`] runs a registry subset over a buffer, a file or a whole
//! directory tree and merges the results.
//!
//! ```
//! use typesniff_core::{DetectOptions, Detector, EngineContext, EngineRegistry};
//! use std::sync::Arc;
//!
//! let registry = EngineRegistry::builder()
//!     .with_defaults()
//!     .with_context(EngineContext::offline())
//!     .build();
//! let detector = Detector::new(Arc::new(registry));
//!
//! let detection = detector
//!     .detect(br#"{"name": "typesniff"}"#, &DetectOptions::default())
//!     .unwrap();
//! assert_eq!(detection.best().unwrap().media_type, "application/json");
//! ```

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod engines;
pub mod file_utils;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod registry;
#[cfg(feature = "filesystem")]
pub mod scan;
pub mod scoring;
pub mod signatures;
pub mod text;

use std::sync::Arc;

pub use config::{OracleConfig, SniffConfig, SniffConfigBuilder};
pub use diagnostics::{ConfigError, CoreError, CoreResult, EngineFailure, FileError};
pub use engine::{CachedEngine, Engine, EngineContext, OracleGate};
pub use models::{Breakdown, Candidate, Detection, Signal};
pub use oracle::{CommandOracle, NullOracle, Oracle, OracleGuess, OracleKind, OracleMode};
pub use pipeline::{DetectOptions, Detector, Source};
pub use registry::{EngineFactory, EngineProvider, EngineRegistry, EngineRegistryBuilder};
#[cfg(feature = "filesystem")]
pub use scan::{CancelHandle, ScanItem, ScanIter, ScanOptions};
pub use scoring::{score_magic, score_tokens};
pub use signatures::match_signature;

/// Classify a buffer or file with the process default registry.
pub fn detect<'a>(source: impl Into<Source<'a>>, options: &DetectOptions) -> CoreResult<Detection> {
    Detector::global().detect(source, options)
}

/// Scan a directory tree with the process default registry.
#[cfg(feature = "filesystem")]
pub fn scan_dir(root: &std::path::Path, options: &ScanOptions) -> CoreResult<ScanIter> {
    scan::scan_dir(EngineRegistry::global(), root, options)
}

/// Names of every engine in the process default registry.
pub fn list_engines() -> std::collections::BTreeSet<String> {
    EngineRegistry::global().list()
}

/// One engine from the process default registry.
pub fn get_engine(name: &str) -> CoreResult<Arc<CachedEngine>> {
    EngineRegistry::global().get(name)
}
