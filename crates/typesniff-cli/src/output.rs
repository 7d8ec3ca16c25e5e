//! Rendering detections as JSON or colored text.

use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use typesniff_core::{Candidate, CoreResult, Detection, EngineRegistry};

#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub json: bool,
    /// Compact JSON instead of pretty-printed.
    pub raw: bool,
}

/// One line of directory output: the path plus its detection or error.
#[derive(Debug, Serialize)]
pub struct ScanEntry {
    pub path: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trid: Option<Detection>,
}

/// Single-file output: the detection plus the optional TrID result.
#[derive(Debug, Serialize)]
struct FileReport<'a> {
    #[serde(flatten)]
    detection: &'a Detection,
    #[serde(skip_serializing_if = "Option::is_none")]
    trid: Option<&'a Detection>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Detection(Detection),
    Error { error: String },
}

impl ScanEntry {
    pub fn new(path: &Path, result: CoreResult<Detection>) -> Self {
        let outcome = match result {
            Ok(detection) => Outcome::Detection(detection),
            Err(e) => Outcome::Error {
                error: e.to_string(),
            },
        };
        Self {
            path: path.display().to_string(),
            outcome,
            trid: None,
        }
    }

    pub fn with_trid(mut self, trid: Option<Detection>) -> Self {
        self.trid = trid;
        self
    }
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T, raw: bool) -> anyhow::Result<()> {
    if raw {
        serde_json::to_writer(&mut *out, value)?;
    } else {
        serde_json::to_writer_pretty(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn confidence_label(confidence: f64) -> String {
    let label = format!("{confidence:.3}");
    if confidence >= 0.9 {
        label.green().to_string()
    } else if confidence >= 0.5 {
        label.yellow().to_string()
    } else {
        label.dimmed().to_string()
    }
}

fn candidate_line(cand: &Candidate) -> String {
    let ext = cand
        .extension
        .as_deref()
        .map(|e| format!(" (.{e})"))
        .unwrap_or_default();
    let partial = if cand.is_partial() {
        format!(" {}", "partial".dimmed())
    } else {
        String::new()
    };
    format!(
        "{} {}{}{}",
        confidence_label(cand.confidence),
        cand.media_type.bold(),
        ext,
        partial
    )
}

fn write_detection_text(
    out: &mut impl Write,
    path: &str,
    detection: &Detection,
) -> io::Result<()> {
    match detection.best() {
        Some(best) => writeln!(out, "{}: {}", path.cyan(), candidate_line(best))?,
        None => writeln!(out, "{}: {}", path.cyan(), "unknown".dimmed())?,
    }
    for cand in detection.candidates.iter().skip(1) {
        writeln!(out, "    {}", candidate_line(cand))?;
    }
    for failure in &detection.failures {
        writeln!(
            out,
            "    {} {}: {}",
            "failed".red(),
            failure.engine,
            failure.message
        )?;
    }
    Ok(())
}

fn write_trid_text(out: &mut impl Write, trid: &Detection) -> io::Result<()> {
    match trid.best() {
        Some(best) => writeln!(out, "    {} {}", "trid".magenta(), candidate_line(best)),
        None => writeln!(out, "    {} {}", "trid".magenta(), "unknown".dimmed()),
    }
}

pub fn print_detection(
    path: &Path,
    detection: &Detection,
    trid: Option<&Detection>,
    style: Style,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if style.json {
        return write_json(&mut out, &FileReport { detection, trid }, style.raw);
    }
    write_detection_text(&mut out, &path.display().to_string(), detection)?;
    if let Some(trid) = trid {
        write_trid_text(&mut out, trid)?;
    }
    Ok(())
}

pub fn print_scan(entries: &[ScanEntry], style: Style) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if style.json {
        return write_json(&mut out, &entries, style.raw);
    }

    let mut failed = 0usize;
    for entry in entries {
        match &entry.outcome {
            Outcome::Detection(detection) => {
                write_detection_text(&mut out, &entry.path, detection)?;
            }
            Outcome::Error { error } => {
                failed += 1;
                writeln!(out, "{}: {}", entry.path.cyan(), error.red())?;
            }
        }
        if let Some(trid) = &entry.trid {
            write_trid_text(&mut out, trid)?;
        }
    }
    writeln!(
        out,
        "\n{} files scanned, {} failed",
        entries.len(),
        failed
    )?;
    Ok(())
}

#[derive(Serialize)]
struct EngineRow<'a> {
    name: &'a str,
    cost: f64,
}

pub fn print_engines(registry: &EngineRegistry, json: bool) -> anyhow::Result<()> {
    let rows: Vec<EngineRow<'_>> = registry
        .engines()
        .iter()
        .map(|e| EngineRow {
            name: e.name(),
            cost: e.cost(),
        })
        .collect();

    let mut out = io::stdout().lock();
    if json {
        return write_json(&mut out, &rows, false);
    }
    for row in rows {
        writeln!(out, "{:<12} {}", row.name.bold(), row.cost)?;
    }
    Ok(())
}
