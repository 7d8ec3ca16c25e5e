//! Detection pipeline: engine selection, execution and aggregation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::diagnostics::CoreResult;
use crate::engine::{CachedEngine, fingerprint};
use crate::file_utils;
use crate::models::{Candidate, Detection};
use crate::registry::EngineRegistry;

/// Engine name reported when a path was skipped by the extension filter.
pub const SKIPPED_ENGINE: &str = "none";

/// What to classify: an in-memory buffer or a file on disk.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Bytes(&'a [u8]),
    Path(&'a Path),
}

impl<'a> From<&'a [u8]> for Source<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Source::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Source<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Source::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Source<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl<'a> From<&'a Path> for Source<'a> {
    fn from(path: &'a Path) -> Self {
        Source::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for Source<'a> {
    fn from(path: &'a PathBuf) -> Self {
        Source::Path(path)
    }
}

/// Per-call detection options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectOptions {
    /// Engine names to run; empty runs every engine.
    pub only: Vec<String>,
    /// Allowed extensions for path sources; `None` allows every file.
    pub extensions: Option<Vec<String>>,
    /// Maximum bytes inspected.
    pub cap_bytes: Option<usize>,
}

impl DetectOptions {
    pub fn only<I, S>(mut self, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = engines.into_iter().map(Into::into).collect();
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn cap_bytes(mut self, cap_bytes: usize) -> Self {
        self.cap_bytes = Some(cap_bytes);
        self
    }
}

/// Runs registry engines over payloads and merges their results.
#[derive(Debug, Clone)]
pub struct Detector {
    registry: Arc<EngineRegistry>,
}

impl Detector {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }

    /// Detector over the process-wide default registry.
    pub fn global() -> Self {
        Self::new(EngineRegistry::global())
    }

    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }

    /// Classify one buffer or file with the selected engines.
    ///
    /// Engine failures are recorded in [`Detection::failures`] and do not
    /// stop the run. Unknown engine names and unreadable files are errors.
    pub fn detect<'a>(
        &self,
        source: impl Into<Source<'a>>,
        options: &DetectOptions,
    ) -> CoreResult<Detection> {
        let engines = self.registry.select(options.only.as_slice())?;
        match source.into() {
            Source::Bytes(bytes) => {
                let payload = cap(bytes, options.cap_bytes);
                Ok(aggregate(&engines, payload))
            }
            Source::Path(path) => detect_file(&engines, path, options),
        }
    }

    /// Shorthand for [`detect`](Self::detect) on a path.
    pub fn detect_path(&self, path: &Path, options: &DetectOptions) -> CoreResult<Detection> {
        self.detect(path, options)
    }

    #[cfg(feature = "filesystem")]
    pub fn scan_dir(
        &self,
        root: &Path,
        options: &crate::scan::ScanOptions,
    ) -> CoreResult<crate::scan::ScanIter> {
        crate::scan::scan_dir(Arc::clone(&self.registry), root, options)
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::global()
    }
}

fn cap(bytes: &[u8], cap_bytes: Option<usize>) -> &[u8] {
    match cap_bytes {
        Some(limit) if limit < bytes.len() => &bytes[..limit],
        _ => bytes,
    }
}

/// Classify the file at `path` with an already resolved engine list.
pub(crate) fn detect_file(
    engines: &[Arc<CachedEngine>],
    path: &Path,
    options: &DetectOptions,
) -> CoreResult<Detection> {
    if !file_utils::extension_allowed(path, options.extensions.as_deref()) {
        tracing::debug!(path = %path.display(), "skipped by extension filter");
        return Ok(Detection {
            engine: SKIPPED_ENGINE.to_string(),
            ..Detection::empty()
        });
    }
    let payload = file_utils::read_payload(path, options.cap_bytes)?;
    Ok(aggregate(engines, &payload))
}

/// Run `engines` in order over `payload` and merge their candidates.
///
/// Candidates are ordered by descending confidence, then ascending engine
/// cost, then run order.
pub(crate) fn aggregate(engines: &[Arc<CachedEngine>], payload: &[u8]) -> Detection {
    let started = Instant::now();
    let mut ranked: Vec<(Candidate, f64)> = Vec::new();
    let mut failures = Vec::new();
    let mut names = Vec::with_capacity(engines.len());

    for engine in engines {
        names.push(engine.name());
        match engine.classify(payload) {
            Ok(detection) => {
                let cost = engine.cost();
                ranked.extend(detection.candidates.into_iter().map(|c| (c, cost)));
            }
            Err(failure) => {
                tracing::warn!(engine = engine.name(), error = %failure.message, "engine skipped");
                failures.push(failure);
            }
        }
    }

    // Stable sort keeps run order for equal keys.
    ranked.sort_by(|(a, a_cost), (b, b_cost)| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a_cost.total_cmp(b_cost))
    });

    Detection {
        candidates: ranked.into_iter().map(|(c, _)| c).collect(),
        engine: names.join("+"),
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        bytes_analyzed: payload.len(),
        hash: fingerprint(payload),
        failures,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::engine::EngineContext;
    use proptest::prelude::*;

    fn offline() -> Detector {
        let registry = EngineRegistry::builder()
            .with_defaults()
            .with_context(EngineContext::offline())
            .build();
        Detector::new(Arc::new(registry))
    }

    fn assert_bounded(det: &Detection) -> Result<(), TestCaseError> {
        for cand in &det.candidates {
            prop_assert!(
                (0.0..=1.0).contains(&cand.confidence),
                "{} out of range: {}",
                cand.media_type,
                cand.confidence
            );
        }
        prop_assert!(det.failures.is_empty(), "engine failed: {:?}", det.failures);
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn confidence_stays_in_unit_interval_for_bytes(
            payload in proptest::collection::vec(any::<u8>(), 0..512)
        ) {
            let det = offline().detect(&payload, &DetectOptions::default()).unwrap();
            assert_bounded(&det)?;
        }

        #[test]
        fn confidence_stays_in_unit_interval_for_text(
            content in r#"[ -~\n\t]{0,400}"#
        ) {
            let det = offline()
                .detect(content.as_bytes(), &DetectOptions::default())
                .unwrap();
            assert_bounded(&det)?;
        }

        #[test]
        fn detection_is_deterministic(
            content in r#"[a-z0-9,;:{}\[\]<>/"= \n]{0,300}"#
        ) {
            let detector = offline();
            let first = detector
                .detect(content.as_bytes(), &DetectOptions::default())
                .unwrap();
            // Fresh registry: no shared cache between the two runs.
            let second = offline()
                .detect(content.as_bytes(), &DetectOptions::default())
                .unwrap();
            let cached = detector
                .detect(content.as_bytes(), &DetectOptions::default())
                .unwrap();
            prop_assert_eq!(&first.candidates, &second.candidates);
            prop_assert_eq!(&first.candidates, &cached.candidates);
            prop_assert_eq!(first.hash, second.hash);
        }
    }
}
