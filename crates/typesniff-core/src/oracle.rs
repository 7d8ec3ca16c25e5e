//! Optional external classification oracles.
//!
//! An oracle is a third-party tool consulted before local heuristics: the
//! `file` command (libmagic), the `magika` ML classifier, and the TRiD
//! signature database. Oracles are reached only through [`Oracle`]: an
//! availability probe that never fails, and an `identify` call that returns no
//! guesses on any error. Unavailability is logged, never raised.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::diagnostics::ConfigError;

/// Environment variable overriding the configured [`OracleMode`].
pub const ORACLE_MODE_ENV: &str = "TYPESNIFF_ORACLE_MODE";

/// Bytes handed to an oracle; larger payloads are truncated.
const ORACLE_SAMPLE_BYTES: usize = 1 << 20;

static TRID_LINE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn trid_line_pattern() -> &'static Regex {
    TRID_LINE_PATTERN.get_or_init(|| {
        // " 72.3% (.XML) Generic XML document (1000/1)"
        Regex::new(r"^\s*(\d+(?:\.\d+)?)%\s+\(\.([A-Za-z0-9_+-]+)\)").unwrap()
    })
}

/// How engines treat their oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleMode {
    /// Consult the oracle when available, then fall through to heuristics.
    #[default]
    Auto,
    /// Never consult oracles.
    Off,
    /// Use the oracle's answer (or nothing) and skip heuristics.
    Only,
}

impl OracleMode {
    /// Read [`ORACLE_MODE_ENV`]; `None` when unset or empty.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        match std::env::var(ORACLE_MODE_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
            _ => Ok(None),
        }
    }
}

impl FromStr for OracleMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(OracleMode::Auto),
            "off" | "none" | "disabled" => Ok(OracleMode::Off),
            "only" => Ok(OracleMode::Only),
            _ => Err(ConfigError::InvalidOracleMode {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OracleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OracleMode::Auto => "auto",
            OracleMode::Off => "off",
            OracleMode::Only => "only",
        })
    }
}

/// One answer from an oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleGuess {
    pub media_type: String,
    pub extension: Option<String>,
    /// Oracle-reported score in `[0, 1]`, when the oracle has one.
    pub score: Option<f64>,
}

impl OracleGuess {
    /// Build a guess from a MIME type, deriving the extension from it.
    pub fn from_mime(media_type: &str, score: Option<f64>) -> Self {
        Self {
            media_type: media_type.to_string(),
            extension: extension_for_mime(media_type),
            score,
        }
    }
}

/// First conventional extension for `media_type`, if one is known.
pub fn extension_for_mime(media_type: &str) -> Option<String> {
    mime_guess::get_mime_extensions_str(media_type)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
}

/// An optional external classifier.
pub trait Oracle: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Whether the oracle can be used. Must never panic; implementations
    /// probe once and memoize.
    fn is_available(&self) -> bool;

    /// Classify `payload`. Any failure yields an empty list.
    fn identify(&self, payload: &[u8]) -> Vec<OracleGuess>;
}

/// Oracle that is never available.
#[derive(Debug, Clone)]
pub struct NullOracle {
    name: String,
}

impl NullOracle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Oracle for NullOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        false
    }

    fn identify(&self, _payload: &[u8]) -> Vec<OracleGuess> {
        Vec::new()
    }
}

/// Which command-line tool a [`CommandOracle`] drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleKind {
    /// `file --brief --mime-type -`
    LibMagic,
    /// `magika --format "%m %s" -`
    Magika,
    /// `trid <file>`
    Trid,
}

impl OracleKind {
    fn name(self) -> &'static str {
        match self {
            OracleKind::LibMagic => "libmagic",
            OracleKind::Magika => "magika",
            OracleKind::Trid => "trid",
        }
    }
}

/// Oracle backed by an external executable.
#[derive(Debug)]
pub struct CommandOracle {
    kind: OracleKind,
    program: String,
    available: OnceLock<bool>,
}

impl CommandOracle {
    pub fn new(kind: OracleKind, program: impl Into<String>) -> Self {
        Self {
            kind,
            program: program.into(),
            available: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> OracleKind {
        self.kind
    }

    fn probe(&self) -> bool {
        let spawned = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match spawned {
            Ok(_) => {
                tracing::debug!(oracle = self.kind.name(), program = %self.program, "oracle available");
                true
            }
            Err(e) => {
                tracing::debug!(
                    oracle = self.kind.name(),
                    program = %self.program,
                    error = %e,
                    "oracle unavailable, using heuristics"
                );
                false
            }
        }
    }

    fn run(&self, sample: &[u8]) -> io::Result<String> {
        let output = match self.kind {
            OracleKind::Trid => {
                let mut tmp = tempfile::NamedTempFile::new()?;
                tmp.write_all(sample)?;
                tmp.flush()?;
                Command::new(&self.program)
                    .arg(tmp.path())
                    .stdin(Stdio::null())
                    .stderr(Stdio::null())
                    .output()?
            }
            OracleKind::LibMagic | OracleKind::Magika => {
                let mut cmd = Command::new(&self.program);
                match self.kind {
                    OracleKind::LibMagic => cmd.args(["--brief", "--mime-type", "-"]),
                    _ => cmd.args(["--format", "%m %s", "-"]),
                };
                let mut child = cmd
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::null())
                    .spawn()?;
                if let Some(mut stdin) = child.stdin.take() {
                    // The tool may stop reading early; a broken pipe is fine.
                    let _ = stdin.write_all(sample);
                }
                child.wait_with_output()?
            }
        };
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn parse(&self, stdout: &str) -> Vec<OracleGuess> {
        match self.kind {
            OracleKind::LibMagic => parse_libmagic(stdout),
            OracleKind::Magika => parse_magika(stdout),
            OracleKind::Trid => parse_trid(stdout),
        }
    }
}

impl Oracle for CommandOracle {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    fn identify(&self, payload: &[u8]) -> Vec<OracleGuess> {
        if !self.is_available() {
            return Vec::new();
        }
        let sample = &payload[..payload.len().min(ORACLE_SAMPLE_BYTES)];
        match self.run(sample) {
            Ok(stdout) => self.parse(&stdout),
            Err(e) => {
                tracing::debug!(oracle = self.kind.name(), error = %e, "oracle call failed");
                Vec::new()
            }
        }
    }
}

fn looks_like_mime(value: &str) -> bool {
    value.split_once('/').is_some_and(|(top, sub)| {
        !top.is_empty() && !sub.is_empty() && !value.contains(char::is_whitespace)
    })
}

fn parse_libmagic(stdout: &str) -> Vec<OracleGuess> {
    let mime = stdout.trim();
    if looks_like_mime(mime) {
        vec![OracleGuess::from_mime(mime, None)]
    } else {
        Vec::new()
    }
}

fn parse_magika(stdout: &str) -> Vec<OracleGuess> {
    let Some(line) = stdout.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Vec::new();
    };
    let mut parts = line.split_whitespace();
    let Some(mime) = parts.next().filter(|m| looks_like_mime(m)) else {
        return Vec::new();
    };
    let score = parts
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|s| s.clamp(0.0, 1.0));
    vec![OracleGuess::from_mime(mime, score)]
}

fn parse_trid(stdout: &str) -> Vec<OracleGuess> {
    stdout
        .lines()
        .filter_map(|line| {
            let caps = trid_line_pattern().captures(line)?;
            let percent: f64 = caps[1].parse().ok()?;
            let ext = caps[2].to_ascii_lowercase();
            let media_type = mime_guess::from_ext(&ext)
                .first_raw()
                .unwrap_or("application/octet-stream");
            Some(OracleGuess {
                media_type: media_type.to_string(),
                extension: Some(ext),
                score: Some((percent / 100.0).clamp(0.0, 1.0)),
            })
        })
        .collect()
}
