//! Candidate and detection value types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diagnostics::EngineFailure;

/// A single diagnostic value in a candidate's breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    Flag(bool),
    Number(f64),
}

impl From<bool> for Signal {
    fn from(value: bool) -> Self {
        Signal::Flag(value)
    }
}

impl From<f64> for Signal {
    fn from(value: f64) -> Self {
        Signal::Number(value)
    }
}

impl From<usize> for Signal {
    fn from(value: usize) -> Self {
        Signal::Number(value as f64)
    }
}

/// Signal name to value, ordered by name so serialized output is stable.
pub type Breakdown = BTreeMap<String, Signal>;

/// One hypothesis about a payload's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: Breakdown,
}

impl Candidate {
    /// Create a candidate. The extension is lowercased and stripped of a
    /// leading dot; the confidence is clamped into `[0, 1]` (NaN becomes 0).
    pub fn new(media_type: impl Into<String>, extension: Option<&str>, confidence: f64) -> Self {
        let extension = extension
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());
        Self {
            media_type: media_type.into(),
            extension,
            confidence: clamp_confidence(confidence),
            breakdown: Breakdown::new(),
        }
    }

    /// Attach a breakdown signal (builder pattern).
    pub fn with_signal(mut self, name: &str, value: impl Into<Signal>) -> Self {
        self.breakdown.insert(name.to_string(), value.into());
        self
    }

    /// True when the producing engine flagged this candidate as a partial match.
    pub fn is_partial(&self) -> bool {
        matches!(self.breakdown.get("partial"), Some(Signal::Flag(true)))
    }

    pub fn signal(&self, name: &str) -> Option<Signal> {
        self.breakdown.get(name).copied()
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The outcome of one engine (or of the orchestrator's merge) over one payload.
///
/// Engines only produce `candidates`. The engine runtime stamps `engine`,
/// `elapsed_ms`, `bytes_analyzed` and `hash` on every call, cache hits included.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    pub candidates: Vec<Candidate>,
    pub engine: String,
    pub elapsed_ms: f64,
    pub bytes_analyzed: usize,
    pub hash: String,
    /// Engines that failed during an aggregated run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<EngineFailure>,
}

impl Detection {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Highest-confidence candidate; the earliest one wins on ties.
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.iter().fold(None, |best, cand| match best {
            Some(b) if b.confidence >= cand.confidence => Some(b),
            _ => Some(cand),
        })
    }
}
