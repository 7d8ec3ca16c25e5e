use super::*;

/// Builder for constructing a [`SniffConfig`] with validation.
///
/// Uses the `&mut Self` return pattern, consistent with
/// [`EngineRegistryBuilder`](crate::EngineRegistryBuilder). `build()` drains
/// the builder; a second call produces the default config.
///
/// # Examples
///
/// ```rust
/// use typesniff_core::config::SniffConfig;
///
/// let config = SniffConfig::builder()
///     .workers(2)
///     .ignore(vec!["target".to_string()])
///     .build()
///     .expect("valid config");
/// assert_eq!(config.workers, 2);
/// ```
#[derive(Debug, Default)]
pub struct SniffConfigBuilder {
    cache_size: Option<usize>,
    cap_bytes: Option<Option<usize>>,
    workers: Option<usize>,
    pattern: Option<String>,
    ignore: Option<Vec<String>>,
    extensions: Option<Option<Vec<String>>>,
    oracle_mode: Option<OracleMode>,
}

impl SniffConfigBuilder {
    /// Prefer [`SniffConfig::builder()`] over calling this directly.
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub fn cache_size(&mut self, cache_size: usize) -> &mut Self {
        self.cache_size = Some(cache_size);
        self
    }

    pub fn cap_bytes(&mut self, cap_bytes: Option<usize>) -> &mut Self {
        self.cap_bytes = Some(cap_bytes);
        self
    }

    pub fn workers(&mut self, workers: usize) -> &mut Self {
        self.workers = Some(workers);
        self
    }

    pub fn pattern(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn ignore(&mut self, ignore: Vec<String>) -> &mut Self {
        self.ignore = Some(ignore);
        self
    }

    pub fn extensions(&mut self, extensions: Option<Vec<String>>) -> &mut Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn oracle_mode(&mut self, mode: OracleMode) -> &mut Self {
        self.oracle_mode = Some(mode);
        self
    }

    /// Build the config, applying defaults for unset fields.
    ///
    /// Returns `Err(ConfigError)` for zero workers or an invalid glob.
    pub fn build(&mut self) -> Result<SniffConfig, ConfigError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation.
    pub fn build_unchecked(&mut self) -> SniffConfig {
        let defaults = SniffConfig::default();
        let mut oracles = defaults.oracles;
        if let Some(mode) = self.oracle_mode.take() {
            oracles.mode = mode;
        }
        SniffConfig {
            cache_size: self.cache_size.take().unwrap_or(defaults.cache_size),
            cap_bytes: self.cap_bytes.take().unwrap_or(defaults.cap_bytes),
            workers: self.workers.take().unwrap_or(defaults.workers),
            pattern: self.pattern.take().unwrap_or(defaults.pattern),
            ignore: self.ignore.take().unwrap_or(defaults.ignore),
            extensions: self.extensions.take().unwrap_or(defaults.extensions),
            oracles,
        }
    }
}
