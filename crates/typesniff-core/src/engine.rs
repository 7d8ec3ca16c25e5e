//! Engine contract and the caching runtime that wraps every engine.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use sha2::{Digest, Sha256};

use crate::cache::LruCache;
use crate::config::OracleConfig;
use crate::diagnostics::EngineFailure;
use crate::models::{Candidate, Detection};
use crate::oracle::{CommandOracle, NullOracle, Oracle, OracleGuess, OracleKind, OracleMode};

/// Default number of cached detections per engine.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// A content-type detector.
///
/// Implementors only produce candidates. Hashing, caching, timing and error
/// translation are done by [`CachedEngine`]; `sniff` must be a pure function
/// of the payload.
pub trait Engine: Send + Sync + 'static {
    /// Unique engine name.
    fn name(&self) -> &'static str;

    /// Relative cost, used only to order engine execution.
    fn cost(&self) -> f64 {
        1.0
    }

    /// Capacity of this engine's result cache.
    fn cache_size(&self) -> usize {
        DEFAULT_CACHE_SIZE
    }

    /// Classify `payload`. An empty list means "no opinion".
    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>>;
}

/// Shared construction context for engines: the oracle set and its mode.
#[derive(Debug, Clone)]
pub struct EngineContext {
    mode: OracleMode,
    libmagic: Arc<dyn Oracle>,
    magika: Arc<dyn Oracle>,
    trid: Arc<dyn Oracle>,
    cache_size: Option<usize>,
}

impl EngineContext {
    /// Context with every oracle disabled.
    pub fn offline() -> Self {
        Self {
            mode: OracleMode::Off,
            libmagic: Arc::new(NullOracle::new("libmagic")),
            magika: Arc::new(NullOracle::new("magika")),
            trid: Arc::new(NullOracle::new("trid")),
            cache_size: None,
        }
    }

    /// Context backed by the command-line oracles named in `config`.
    pub fn from_config(config: &OracleConfig) -> Self {
        Self {
            mode: config.mode,
            libmagic: Arc::new(CommandOracle::new(
                OracleKind::LibMagic,
                config.libmagic_program.clone(),
            )),
            magika: Arc::new(CommandOracle::new(
                OracleKind::Magika,
                config.magika_program.clone(),
            )),
            trid: Arc::new(CommandOracle::new(OracleKind::Trid, config.trid_program.clone())),
            cache_size: None,
        }
    }

    pub fn with_mode(mut self, mode: OracleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_libmagic(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.libmagic = oracle;
        self
    }

    pub fn with_magika(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.magika = oracle;
        self
    }

    pub fn with_trid(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.trid = oracle;
        self
    }

    /// Override every engine's cache capacity.
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = Some(cache_size);
        self
    }

    pub fn mode(&self) -> OracleMode {
        self.mode
    }

    pub fn cache_size(&self) -> Option<usize> {
        self.cache_size
    }

    pub fn libmagic(&self) -> Arc<dyn Oracle> {
        Arc::clone(&self.libmagic)
    }

    pub fn magika(&self) -> Arc<dyn Oracle> {
        Arc::clone(&self.magika)
    }

    pub fn trid(&self) -> Arc<dyn Oracle> {
        Arc::clone(&self.trid)
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::from_config(&OracleConfig::default())
    }
}

/// An engine's view of one oracle under the configured mode.
#[derive(Debug, Clone)]
pub struct OracleGate {
    mode: OracleMode,
    oracle: Arc<dyn Oracle>,
}

impl OracleGate {
    pub fn new(mode: OracleMode, oracle: Arc<dyn Oracle>) -> Self {
        Self { mode, oracle }
    }

    /// Ask the oracle, unless oracles are off or it is unavailable.
    pub fn consult(&self, payload: &[u8]) -> Vec<OracleGuess> {
        if self.mode == OracleMode::Off || !self.oracle.is_available() {
            return Vec::new();
        }
        self.oracle.identify(payload)
    }

    /// Whether the engine may run its own heuristics after the oracle.
    pub fn heuristics_enabled(&self) -> bool {
        self.mode != OracleMode::Only
    }
}

/// Hex SHA-256 of `payload`, used as cache key and `Detection::hash`.
pub fn fingerprint(payload: &[u8]) -> String {
    format!("{:x}", Sha256::digest(payload))
}

/// Runtime wrapper owning one engine and its private LRU cache.
pub struct CachedEngine {
    engine: Box<dyn Engine>,
    cache: Mutex<LruCache<String, Detection>>,
}

impl std::fmt::Debug for CachedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedEngine")
            .field("name", &self.engine.name())
            .field("cost", &self.engine.cost())
            .finish_non_exhaustive()
    }
}

impl CachedEngine {
    pub fn new(engine: Box<dyn Engine>) -> Self {
        let cap = engine.cache_size();
        Self::with_cache_size(engine, cap)
    }

    pub fn with_cache_size(engine: Box<dyn Engine>, cache_size: usize) -> Self {
        Self {
            engine,
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn cost(&self) -> f64 {
        self.engine.cost()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Detection>> {
        // Entries are whole values, so a poisoned map is still consistent.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Classify `payload`, serving repeated payloads from the cache.
    ///
    /// The lock covers only the cache lookup and the store; the engine runs
    /// outside it, so concurrent misses on the same payload may compute
    /// twice (last writer wins).
    pub fn classify(&self, payload: &[u8]) -> Result<Detection, EngineFailure> {
        let started = Instant::now();
        let digest = fingerprint(payload);

        let cached = self.lock().get(&digest).cloned();
        if let Some(mut hit) = cached {
            tracing::debug!(engine = self.name(), "cache hit");
            self.stamp(&mut hit, started, payload.len(), digest);
            return Ok(hit);
        }

        tracing::debug!(engine = self.name(), "cache miss");
        let candidates = self.run_engine(payload)?;
        let mut detection = Detection::new(candidates);
        self.stamp(&mut detection, started, payload.len(), digest.clone());
        self.lock().insert(digest, detection.clone());
        Ok(detection)
    }

    fn run_engine(&self, payload: &[u8]) -> Result<Vec<Candidate>, EngineFailure> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.engine.sniff(payload)));
        let message = match outcome {
            Ok(Ok(candidates)) => return Ok(candidates),
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => panic_message(panic.as_ref()),
        };
        tracing::error!(engine = self.name(), error = %message, "engine failed");
        Err(EngineFailure::new(self.name(), message))
    }

    fn stamp(&self, detection: &mut Detection, started: Instant, len: usize, digest: String) {
        detection.engine = self.name().to_string();
        detection.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        detection.bytes_analyzed = len;
        detection.hash = digest;
    }

    /// Number of detections currently cached.
    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn clear_cache(&self) {
        self.lock().clear();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "engine panicked".to_string()
    }
}
