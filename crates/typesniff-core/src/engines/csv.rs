//! Delimited-text engine
//!
//! Infers a delimiter from per-line counts, parses a sample with a
//! quote-aware splitter and grades the result by column consistency and the
//! presence of a header row.

use crate::engine::{Engine, EngineContext, OracleGate};
use crate::engines::{TEXT_ENGINE_COST, guess_mentions, oracle_confirmation};
use crate::models::Candidate;
use crate::scoring::{score_magic, score_tokens};
use crate::text::{self, UTF8_BOM, round3};

const MEDIA_TYPE: &str = "text/csv";
const EXTENSION: &str = "csv";

/// Candidate delimiters in preference order.
const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];
const MIN_ROWS: usize = 3;
const MIN_COLS: usize = 2;
const SAMPLE_LINES: usize = 20;
const SEP_DIRECTIVE: &str = "sep=";

pub struct CsvEngine {
    libmagic: OracleGate,
}

impl CsvEngine {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            libmagic: OracleGate::new(ctx.mode(), ctx.libmagic()),
        }
    }
}

impl Engine for CsvEngine {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn cost(&self) -> f64 {
        TEXT_ENGINE_COST
    }

    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
        if let Some(hit) = oracle_confirmation(&self.libmagic, payload, MEDIA_TYPE, EXTENSION, |g| {
            guess_mentions(g, "csv")
        }) {
            return Ok(vec![hit.with_signal("token_ratio", 1.0)]);
        }
        if !self.libmagic.heuristics_enabled() {
            return Ok(Vec::new());
        }
        Ok(sniff_text(payload).into_iter().collect())
    }
}

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(CsvEngine::new(ctx))
}

fn sniff_text(payload: &[u8]) -> Option<Candidate> {
    let decoded = text::decode(payload)?;
    let trimmed = decoded.trim_start();
    let has_bom = payload.starts_with(UTF8_BOM);
    let body = trimmed.trim_start_matches('\u{feff}').trim();
    if body.is_empty() {
        return None;
    }

    let mut lines: Vec<&str> = body.lines().collect();
    let mut forced = None;
    let mut magic_len = has_bom.then_some(UTF8_BOM.len());
    if let Some(rest) = lines.first().and_then(|l| l.strip_prefix(SEP_DIRECTIVE)) {
        magic_len = Some(magic_len.unwrap_or(0).max(SEP_DIRECTIVE.len()));
        forced = rest.chars().next().filter(|c| DELIMITERS.contains(c));
        lines.remove(0);
    }
    lines.truncate(SAMPLE_LINES);
    let sample = lines.join("\n");

    let delimiter = forced.or_else(|| infer_delimiter(&lines))?;
    let token_ratio = text::token_ratio(&sample, |c| DELIMITERS.contains(&c));

    let delimited_lines = lines.iter().filter(|l| l.contains(delimiter)).count();
    if delimited_lines < MIN_ROWS {
        return None;
    }

    let rows: Vec<Vec<String>> = split_records(&sample, delimiter)
        .into_iter()
        .filter(|row| !(row.len() == 1 && row[0].is_empty()))
        .collect();
    if rows.len() < MIN_ROWS {
        return None;
    }

    let width = rows[0].len();
    let consistent = width >= MIN_COLS && rows.iter().all(|r| r.len() == width);
    let header = consistent && has_header(&rows);
    let base = match (consistent, header) {
        (true, true) => 0.9,
        (true, false) => 0.7,
        (false, _) => 0.6,
    };

    let mut confidence = score_tokens(base);
    if let Some(len) = magic_len {
        confidence = confidence.max(score_magic(len));
    }

    let mut cand = Candidate::new(MEDIA_TYPE, Some(EXTENSION), confidence)
        .with_signal("token_ratio", round3(token_ratio))
        .with_signal("partial", !consistent)
        .with_signal("header", header);
    if let Some(len) = magic_len {
        cand = cand.with_signal("magic_len", len);
    }
    Some(cand)
}

/// Count `delimiter` outside double-quoted sections of `line`.
fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Pick the delimiter whose per-line count is most consistent.
///
/// For each delimiter the modal non-zero count is found; the delimiter with
/// the most lines at its mode wins, then the larger mode, then table order.
fn infer_delimiter(lines: &[&str]) -> Option<char> {
    let mut best: Option<(char, usize, usize)> = None;
    for &delim in &DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_unquoted(line, delim))
            .filter(|&n| n > 0)
            .collect();
        let Some((mode, agreeing)) = modal(&counts) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, best_agree, best_mode)) => {
                agreeing > best_agree || (agreeing == best_agree && mode > best_mode)
            }
        };
        if better {
            best = Some((delim, agreeing, mode));
        }
    }
    best.map(|(delim, _, _)| delim)
}

/// Most frequent value and its frequency; smaller values win ties.
fn modal(values: &[usize]) -> Option<(usize, usize)> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mut best: Option<(usize, usize)> = None;
    for chunk in sorted.chunk_by(|a, b| a == b) {
        let candidate = (chunk[0], chunk.len());
        if best.is_none_or(|(_, freq)| candidate.1 > freq) {
            best = Some(candidate);
        }
    }
    best
}

/// Split `sample` into records, honouring double quotes (with `""` escapes)
/// and quoted newlines.
fn split_records(sample: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = sample.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut row));
            }
            c if c == delimiter && !in_quotes => row.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        records.push(row);
    }
    records
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Integer,
    Float,
    Width(usize),
}

fn classify_cell(cell: &str) -> ColumnKind {
    let cell = cell.trim();
    if cell.parse::<i64>().is_ok() {
        ColumnKind::Integer
    } else if cell.parse::<f64>().is_ok() {
        ColumnKind::Float
    } else {
        ColumnKind::Width(cell.chars().count())
    }
}

/// Vote on whether the first row is a header.
///
/// Each column whose body cells share one kind casts a vote: numeric columns
/// vote "header" when the first-row cell is not of that kind, fixed-width text
/// columns vote "header" when the first-row width differs.
fn has_header(rows: &[Vec<String>]) -> bool {
    let Some((header, body)) = rows.split_first() else {
        return false;
    };
    let columns = header.len();
    let mut kinds: Vec<Option<Option<ColumnKind>>> = vec![None; columns];

    for row in body.iter().take(SAMPLE_LINES).filter(|r| r.len() == columns) {
        for (slot, cell) in kinds.iter_mut().zip(row) {
            let kind = classify_cell(cell);
            match *slot {
                None => *slot = Some(Some(kind)),
                Some(Some(seen)) if seen != kind => *slot = Some(None),
                _ => {}
            }
        }
    }

    let mut votes = 0i32;
    for (slot, cell) in kinds.iter().zip(header) {
        let Some(Some(kind)) = slot else {
            continue;
        };
        let header_kind = classify_cell(cell);
        let looks_like_body = match kind {
            ColumnKind::Width(_) => header_kind == *kind,
            ColumnKind::Integer => header_kind == ColumnKind::Integer,
            ColumnKind::Float => {
                matches!(header_kind, ColumnKind::Integer | ColumnKind::Float)
            }
        };
        votes += if looks_like_body { -1 } else { 1 };
    }
    votes > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(payload: &[u8]) -> Vec<Candidate> {
        CsvEngine::new(&EngineContext::offline()).sniff(payload).unwrap()
    }

    #[test]
    fn test_header_scores_higher_than_headerless() {
        let with_header = sniff(b"name,age,score\nalice,30,1.5\nbob,25,2.5\ncarol,41,3.0\n");
        let without = sniff(b"1,30,1.5\n2,25,2.5\n3,41,3.0\n4,50,4.0\n");

        assert_eq!(with_header.len(), 1);
        assert_eq!(without.len(), 1);
        assert!((with_header[0].confidence - score_tokens(0.9)).abs() < 1e-12);
        assert!((without[0].confidence - score_tokens(0.7)).abs() < 1e-12);
        assert!(with_header[0].confidence > without[0].confidence);
        assert!(!with_header[0].is_partial());
    }

    #[test]
    fn test_ragged_rows_are_partial() {
        let cands = sniff(b"a;b;c\n1;2\n3;4;5;6\n7;8;9\n");
        assert_eq!(cands.len(), 1);
        assert!(cands[0].is_partial());
        assert!((cands[0].confidence - score_tokens(0.6)).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_rows() {
        assert!(sniff(b"a,b\n1,2\n").is_empty());
        assert!(sniff(b"").is_empty());
        assert!(sniff(b"just a sentence without structure").is_empty());
    }

    #[test]
    fn test_tab_and_pipe_delimiters() {
        let tsv = sniff(b"id\tname\n1\tann\n2\tbob\n3\tcid\n");
        assert_eq!(tsv[0].media_type, "text/csv");
        let piped = sniff(b"id|name\n1|ann\n2|bob\n3|cid\n");
        assert_eq!(piped.len(), 1);
    }

    #[test]
    fn test_quoted_delimiters_do_not_split() {
        let rows = split_records("a,\"b,c\"\n\"x\"\"y\",z", ',');
        assert_eq!(rows, vec![vec!["a", "b,c"], vec!["x\"y", "z"]]);
        assert_eq!(count_unquoted("a,\"b,c\",d", ','), 2);
    }

    #[test]
    fn test_sep_directive_boosts_confidence() {
        let cands = sniff(b"sep=;\na;b\n1;2\n3;4\n");
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].signal("magic_len"), Some(crate::models::Signal::Number(4.0)));
        assert!(cands[0].confidence >= score_magic(4));
    }

    #[test]
    fn test_binary_is_skipped() {
        assert!(sniff(b"\x00,\x00,\x00\n\x00,\x00\n\x00,\x00\n").is_empty());
    }

    #[test]
    fn test_infer_delimiter_prefers_consistency() {
        let lines = ["a;b,c;d", "1;2;3", "4;5;6"];
        assert_eq!(infer_delimiter(&lines), Some(';'));
        assert_eq!(infer_delimiter(&["no delimiters here"]), None);
    }

    #[test]
    fn test_has_header_votes() {
        let rows = |s: &str| split_records(s, ',');
        assert!(has_header(&rows("name,age\nann,30\nbob,25")));
        assert!(!has_header(&rows("1,30\n2,25\n3,41")));
    }
}
