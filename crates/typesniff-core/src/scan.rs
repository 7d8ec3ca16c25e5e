//! Parallel directory scanning.
//!
//! A walk over the root feeds a dedicated rayon pool through `par_bridge`;
//! each worker classifies one file and sends `(path, result)` down a bounded
//! channel drained by [`ScanIter`]. Results arrive in completion order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, bounded};
use ignore::WalkBuilder;
use rayon::prelude::*;

use crate::config::{DEFAULT_PATTERN, DEFAULT_WORKERS};
use crate::diagnostics::{ConfigError, CoreResult, FileError};
use crate::file_utils;
use crate::models::Detection;
use crate::pipeline::{DetectOptions, detect_file};
use crate::registry::EngineRegistry;

/// Channel slots per worker.
const QUEUE_PER_WORKER: usize = 4;

/// Directory scan options.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Glob matched against each file's root-relative path.
    pub pattern: String,
    /// Worker threads; must be at least 1.
    pub workers: usize,
    /// Options applied to every file.
    pub detect: DetectOptions,
    /// Directory names pruned from the walk.
    pub ignore: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            workers: DEFAULT_WORKERS,
            detect: DetectOptions::default(),
            ignore: Vec::new(),
        }
    }
}

/// One scanned file and its outcome.
pub type ScanItem = (PathBuf, CoreResult<Detection>);

/// Handle that stops a running scan from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Stop scheduling new files. Files already being classified finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Streaming results of [`scan_dir`].
///
/// Dropping the iterator cancels the scan.
pub struct ScanIter {
    rx: Receiver<ScanItem>,
    cancel: CancelHandle,
    _pool: rayon::ThreadPool,
}

impl ScanIter {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Iterator for ScanIter {
    type Item = ScanItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

impl Drop for ScanIter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Walker output handed to the workers.
enum Walked {
    File(PathBuf),
    /// An entry the walk could not read, reported in place of a detection.
    Failed(PathBuf, FileError),
}

/// Regular files, including symlinks that resolve to one.
fn is_regular_file(entry: &ignore::DirEntry) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_file() => true,
        Some(_) if entry.path_is_symlink() => {
            std::fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file())
        }
        _ => false,
    }
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        _ => None,
    }
}

/// Turn a walk error into a reportable entry. Errors without a path are dropped.
fn walk_failure(err: ignore::Error) -> Option<Walked> {
    let path = error_path(&err)?.to_path_buf();
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other(message));
    Some(Walked::Failed(path.clone(), FileError::Read { path, source }))
}

fn normalize_rel_path(entry_path: &Path, root: &Path) -> String {
    let rel_path = entry_path.strip_prefix(root).unwrap_or(entry_path);
    rel_path.to_string_lossy().replace('\\', "/")
}

/// Walk `root` and classify every matching file on `options.workers` threads.
///
/// Invalid options, unknown engines and a missing root fail up front; per-file
/// failures are yielded next to their path.
pub fn scan_dir(
    registry: Arc<EngineRegistry>,
    root: &Path,
    options: &ScanOptions,
) -> CoreResult<ScanIter> {
    if options.workers == 0 {
        return Err(ConfigError::ZeroWorkers.into());
    }
    let pattern = glob::Pattern::new(&options.pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: options.pattern.clone(),
        message: e.to_string(),
    })?;
    if !root.is_dir() {
        return Err(FileError::MissingRoot {
            path: root.to_path_buf(),
        }
        .into());
    }
    let engines = registry.select(options.detect.only.as_slice())?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .thread_name(|i| format!("typesniff-scan-{i}"))
        .build()
        .map_err(|e| ConfigError::WorkerPool {
            message: e.to_string(),
        })?;

    let (tx, rx) = bounded::<ScanItem>(options.workers * QUEUE_PER_WORKER);
    let cancel = CancelHandle(Arc::new(AtomicBool::new(false)));

    let root = root.to_path_buf();
    let ignore: Arc<[String]> = options.ignore.clone().into();
    let detect = options.detect.clone();
    let stop = cancel.clone();

    tracing::debug!(root = %root.display(), workers = options.workers, "starting scan");

    pool.spawn(move || {
        WalkBuilder::new(&root)
            .standard_filters(false)
            .filter_entry({
                let ignore = Arc::clone(&ignore);
                move |entry| {
                    if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                        return true;
                    }
                    let name = entry.file_name().to_string_lossy();
                    !ignore.iter().any(|dir| *dir == name)
                }
            })
            .build()
            .take_while(|_| !stop.is_cancelled())
            .filter_map(|entry| match entry {
                Ok(entry) => is_regular_file(&entry).then(|| Walked::File(entry.into_path())),
                Err(e) => {
                    tracing::warn!(error = %e, "walk error");
                    walk_failure(e)
                }
            })
            .filter(|walked| match walked {
                Walked::File(path) => {
                    pattern.matches(&normalize_rel_path(path, &root))
                        && file_utils::extension_allowed(path, detect.extensions.as_deref())
                }
                Walked::Failed(..) => true,
            })
            .par_bridge()
            .for_each_with(tx, |tx, walked| {
                if stop.is_cancelled() {
                    return;
                }
                let item = match walked {
                    Walked::File(path) => {
                        let result = detect_file(&engines, &path, &detect);
                        if let Err(e) = &result {
                            tracing::debug!(path = %path.display(), error = %e, "file failed");
                        }
                        (path, result)
                    }
                    Walked::Failed(path, e) => (path, Err(e.into())),
                };
                if tx.send(item).is_err() {
                    // Receiver dropped.
                    stop.cancel();
                }
            });
        tracing::debug!(cancelled = stop.is_cancelled(), "scan finished");
    });

    Ok(ScanIter {
        rx,
        cancel,
        _pool: pool,
    })
}
