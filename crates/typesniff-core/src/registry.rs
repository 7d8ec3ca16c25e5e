//! Engine registry and factory functions.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, OnceLock};

use crate::config::SniffConfig;
use crate::diagnostics::{CoreError, CoreResult};
use crate::engine::{CachedEngine, Engine, EngineContext};
use crate::engines;

/// Factory function type that creates engine instances.
pub type EngineFactory = fn(&EngineContext) -> Box<dyn Engine>;

/// A provider of engine factories.
///
/// Implement this trait to supply engines from outside the crate. The
/// built-in engines are packaged as a `BuiltinProvider` (internal to the
/// crate).
///
/// # Example
///
/// ```
/// use typesniff_core::{EngineFactory, EngineProvider, EngineRegistry};
///
/// struct MyProvider;
///
/// impl EngineProvider for MyProvider {
///     fn engines(&self) -> Vec<EngineFactory> {
///         // Return custom engines here
///         vec![]
///     }
/// }
///
/// let registry = EngineRegistry::builder()
///     .with_defaults()
///     .with_provider(&MyProvider)
///     .build();
/// assert!(registry.list().contains("json"));
/// ```
pub trait EngineProvider: Send + Sync {
    /// Human-readable name for this provider.
    ///
    /// Defaults to the unqualified struct name (e.g., `"BuiltinProvider"`).
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Return the engine factories supplied by this provider.
    fn engines(&self) -> Vec<EngineFactory>;
}

/// The built-in engine provider shipping with typesniff-core.
pub(crate) struct BuiltinProvider;

impl EngineProvider for BuiltinProvider {
    fn engines(&self) -> Vec<EngineFactory> {
        DEFAULTS.to_vec()
    }
}

/// Immutable catalog of engine singletons.
///
/// Each registered factory is instantiated once and wrapped in a
/// [`CachedEngine`], so every caller shares one cache per engine. Engines are
/// stored in execution order: ascending cost, then name.
#[derive(Debug)]
pub struct EngineRegistry {
    engines: Vec<Arc<CachedEngine>>,
}

static GLOBAL: OnceLock<Arc<EngineRegistry>> = OnceLock::new();

impl EngineRegistry {
    /// Registry with every built-in engine and oracles configured from the
    /// environment.
    pub fn with_defaults() -> Self {
        let mut config = SniffConfig::default();
        if let Err(e) = config.apply_env() {
            tracing::warn!(error = %e, "ignoring invalid environment override");
        }
        Self::from_config(&config)
    }

    /// Registry with every built-in engine, configured by `config`.
    pub fn from_config(config: &SniffConfig) -> Self {
        Self::builder()
            .with_defaults()
            .with_context(config.engine_context())
            .build()
    }

    /// Create an [`EngineRegistryBuilder`] for ergonomic construction.
    ///
    /// # Example
    ///
    /// ```
    /// use typesniff_core::{EngineContext, EngineRegistry};
    ///
    /// let registry = EngineRegistry::builder()
    ///     .with_defaults()
    ///     .with_context(EngineContext::offline())
    ///     .without_engine("magika")
    ///     .build();
    ///
    /// assert!(!registry.list().contains("magika"));
    /// ```
    pub fn builder() -> EngineRegistryBuilder {
        EngineRegistryBuilder::new()
    }

    /// Lazily built process-wide registry.
    pub fn global() -> Arc<EngineRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_defaults())))
    }

    /// Names of every registered engine.
    pub fn list(&self) -> BTreeSet<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }

    /// Engines in execution order.
    pub fn engines(&self) -> &[Arc<CachedEngine>] {
        &self.engines
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Look up one engine by name.
    pub fn get(&self, name: &str) -> CoreResult<Arc<CachedEngine>> {
        self.engines
            .iter()
            .find(|e| e.name() == name)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                name: name.to_string(),
            })
    }

    /// Resolve an engine subset in execution order.
    ///
    /// An empty `only` selects every engine. Any unknown name fails the
    /// whole selection.
    pub fn select<S: AsRef<str>>(&self, only: &[S]) -> CoreResult<Vec<Arc<CachedEngine>>> {
        if only.is_empty() {
            return Ok(self.engines.clone());
        }
        let mut wanted = HashSet::with_capacity(only.len());
        for name in only {
            let name = name.as_ref();
            self.get(name)?;
            wanted.insert(name);
        }
        Ok(self
            .engines
            .iter()
            .filter(|e| wanted.contains(e.name()))
            .cloned()
            .collect())
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Builder for constructing an [`EngineRegistry`].
///
/// Supports built-in engines, custom [`EngineProvider`]s, individual
/// factories, excluding engines by name, and the [`EngineContext`] handed to
/// every factory.
pub struct EngineRegistryBuilder {
    entries: Vec<EngineFactory>,
    disabled_engines: HashSet<String>,
    context: Option<EngineContext>,
}

impl EngineRegistryBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            disabled_engines: HashSet::new(),
            context: None,
        }
    }

    /// Add all built-in engines.
    pub fn with_defaults(&mut self) -> &mut Self {
        self.with_provider(&BuiltinProvider)
    }

    /// Add all engines from an [`EngineProvider`].
    pub fn with_provider(&mut self, provider: &dyn EngineProvider) -> &mut Self {
        tracing::debug!(provider = provider.name(), "registering engine provider");
        self.entries.extend(provider.engines());
        self
    }

    /// Register a single engine factory.
    pub fn register(&mut self, factory: EngineFactory) -> &mut Self {
        self.entries.push(factory);
        self
    }

    /// Leave the named engine out of the built registry.
    pub fn without_engine(&mut self, name: &str) -> &mut Self {
        self.disabled_engines.insert(name.to_string());
        self
    }

    /// Context passed to every factory. Defaults to
    /// [`EngineContext::default()`].
    pub fn with_context(&mut self, context: EngineContext) -> &mut Self {
        self.context = Some(context);
        self
    }

    /// Instantiate every factory and produce the registry.
    ///
    /// When two factories produce the same engine name the first one wins
    /// and the duplicate is dropped with a warning. Drains the builder.
    pub fn build(&mut self) -> EngineRegistry {
        let context = self.context.take().unwrap_or_default();
        let disabled = std::mem::take(&mut self.disabled_engines);
        let mut seen = HashSet::new();
        let mut engines = Vec::with_capacity(self.entries.len());

        for factory in self.entries.drain(..) {
            let engine = factory(&context);
            let name = engine.name();
            if disabled.contains(name) {
                continue;
            }
            if !seen.insert(name) {
                tracing::warn!(engine = name, "duplicate engine registration ignored");
                continue;
            }
            let cache_size = context.cache_size().unwrap_or_else(|| engine.cache_size());
            engines.push(Arc::new(CachedEngine::with_cache_size(engine, cache_size)));
        }

        engines.sort_by(|a, b| {
            a.cost()
                .total_cmp(&b.cost())
                .then_with(|| a.name().cmp(b.name()))
        });
        EngineRegistry { engines }
    }
}

// ============================================================================
// Built-in defaults
// ============================================================================

const DEFAULTS: &[EngineFactory] = &[
    engines::signature::factory,
    engines::python::factory,
    engines::php::factory,
    engines::cpp::factory,
    engines::swift::factory,
    engines::zig::factory,
    engines::elixir::factory,
    engines::powershell::factory,
    engines::toml::factory,
    engines::csv::factory,
    engines::json::factory,
    engines::xml::factory,
    engines::magic::factory,
    engines::magika::factory,
    engines::trid::factory,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;

    fn offline() -> EngineRegistry {
        EngineRegistry::builder()
            .with_defaults()
            .with_context(EngineContext::offline())
            .build()
    }

    struct Shadow;

    impl Engine for Shadow {
        fn name(&self) -> &'static str {
            "json"
        }

        fn sniff(&self, _payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
            Ok(Vec::new())
        }
    }

    fn shadow(_ctx: &EngineContext) -> Box<dyn Engine> {
        Box::new(Shadow)
    }

    #[test]
    fn test_defaults_are_listed_once() {
        let registry = offline();
        let names = registry.list();
        assert_eq!(names.len(), DEFAULTS.len());
        assert_eq!(registry.len(), DEFAULTS.len());
        for name in ["csv", "json", "xml", "signature", "magic", "python", "toml"] {
            assert!(names.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_engines_run_in_cost_order() {
        let registry = offline();
        let engines = registry.engines();
        assert_eq!(engines[0].name(), "python");
        assert!(engines.windows(2).all(|w| w[0].cost() <= w[1].cost()));
        assert_eq!(engines.last().map(|e| e.name()), Some("trid"));
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let err = offline().get("cobol").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_get_returns_singleton() {
        let registry = offline();
        let a = registry.get("json").unwrap();
        let b = registry.get("json").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_select_subset_keeps_execution_order() {
        let registry = offline();
        let selected = registry.select(&["xml", "python"]).unwrap();
        let names: Vec<_> = selected.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["python", "xml"]);

        let all = registry.select::<&str>(&[]).unwrap();
        assert_eq!(all.len(), registry.len());

        assert!(registry.select(&["json", "nope"]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_registration_is_dropped() {
        let registry = EngineRegistry::builder()
            .with_defaults()
            .register(shadow)
            .with_context(EngineContext::offline())
            .build();
        assert_eq!(registry.len(), DEFAULTS.len());
        // The built-in json engine registered first and is kept.
        let json = registry.get("json").unwrap();
        assert_eq!(json.cost(), engines::TEXT_ENGINE_COST);
    }

    #[test]
    fn test_without_engine() {
        let registry = EngineRegistry::builder()
            .with_defaults()
            .without_engine("trid")
            .without_engine("magika")
            .with_context(EngineContext::offline())
            .build();
        assert_eq!(registry.len(), DEFAULTS.len() - 2);
        assert!(registry.get("trid").is_err());
    }

    #[test]
    fn test_context_cache_size_applies() {
        let registry = EngineRegistry::builder()
            .with_defaults()
            .with_context(EngineContext::offline().with_cache_size(3))
            .build();
        assert_eq!(registry.get("csv").unwrap().cache_capacity(), 3);
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineRegistry>();
    }
}
