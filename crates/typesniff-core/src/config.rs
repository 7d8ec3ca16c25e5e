//! Detector configuration

mod builder;

pub use builder::SniffConfigBuilder;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::diagnostics::ConfigError;
use crate::engine::{DEFAULT_CACHE_SIZE, EngineContext};
use crate::oracle::OracleMode;
use crate::pipeline::DetectOptions;

/// Default glob for directory scans.
pub const DEFAULT_PATTERN: &str = "**/*";

/// Default scan worker count.
pub const DEFAULT_WORKERS: usize = 8;

/// External oracle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub mode: OracleMode,
    /// Program used for libmagic lookups (`file`).
    pub libmagic_program: String,
    pub magika_program: String,
    pub trid_program: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            mode: OracleMode::Auto,
            libmagic_program: "file".to_string(),
            magika_program: "magika".to_string(),
            trid_program: "trid".to_string(),
        }
    }
}

/// Detector configuration, usually loaded from `typesniff.toml`.
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// ```toml
/// workers = 4
/// cap_bytes = 1048576
/// ignore = ["node_modules", ".git"]
///
/// [oracles]
/// mode = "off"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SniffConfig {
    /// Cached detections per engine.
    pub cache_size: usize,
    /// Maximum bytes read from each file; `None` reads whole files.
    pub cap_bytes: Option<usize>,
    /// Scan worker threads.
    pub workers: usize,
    /// Glob matched against root-relative paths during scans.
    pub pattern: String,
    /// Directory names pruned during scans.
    pub ignore: Vec<String>,
    /// Allowed file extensions; `None` allows every file.
    pub extensions: Option<Vec<String>>,
    pub oracles: OracleConfig,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            cap_bytes: None,
            workers: DEFAULT_WORKERS,
            pattern: DEFAULT_PATTERN.to_string(),
            ignore: Vec::new(),
            extensions: None,
            oracles: OracleConfig::default(),
        }
    }
}

impl SniffConfig {
    /// Create a new [`SniffConfigBuilder`].
    pub fn builder() -> SniffConfigBuilder {
        SniffConfigBuilder::new()
    }

    /// Load config from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_error = |source: anyhow::Error| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.into()))?;
        let config: Self = toml::from_str(&content).map_err(|e| load_error(e.into()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config or use default, returning any load warning.
    ///
    /// A path that cannot be read or parsed yields the default config plus a
    /// message describing the problem, so typos are reported instead of
    /// silently ignored.
    pub fn load_or_default(path: Option<&Path>) -> (Self, Option<String>) {
        match path {
            Some(p) => match Self::load(p) {
                Ok(config) => (config, None),
                Err(e) => {
                    let cause = std::error::Error::source(&e)
                        .map(|s| format!(": {s}"))
                        .unwrap_or_default();
                    (Self::default(), Some(format!("{e}{cause}")))
                }
            },
            None => (Self::default(), None),
        }
    }

    /// Check values that deserialization cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        glob::Pattern::new(&self.pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: self.pattern.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Apply environment overrides (currently the oracle mode).
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.override_oracle_mode(OracleMode::from_env()?);
        Ok(())
    }

    pub(crate) fn override_oracle_mode(&mut self, mode: Option<OracleMode>) {
        if let Some(mode) = mode {
            tracing::debug!(%mode, "oracle mode overridden from environment");
            self.oracles.mode = mode;
        }
    }

    /// Engine construction context matching this config.
    pub fn engine_context(&self) -> EngineContext {
        EngineContext::from_config(&self.oracles).with_cache_size(self.cache_size)
    }

    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            only: Vec::new(),
            extensions: self.extensions.clone(),
            cap_bytes: self.cap_bytes,
        }
    }

    #[cfg(feature = "filesystem")]
    pub fn scan_options(&self) -> crate::scan::ScanOptions {
        crate::scan::ScanOptions {
            pattern: self.pattern.clone(),
            workers: self.workers,
            detect: self.detect_options(),
            ignore: self.ignore.clone(),
        }
    }
}
