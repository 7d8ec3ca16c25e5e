//! Text decoding shared by the text-oriented engines.
//!
//! Payloads that do not look like text produce `None` and the calling engine
//! reports no candidates. Invalid UTF-8 sequences inside otherwise textual
//! payloads are dropped rather than replaced.

use std::borrow::Cow;

/// Bytes inspected for NUL characters.
const BINARY_PROBE_LEN: usize = 8 * 1024;

/// Maximum share of invalid UTF-8 bytes tolerated in a text payload.
const MAX_INVALID_RATIO: f64 = 0.10;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode `payload` as UTF-8 text, or `None` if it looks binary.
pub fn decode(payload: &[u8]) -> Option<Cow<'_, str>> {
    let probe = &payload[..payload.len().min(BINARY_PROBE_LEN)];
    if probe.contains(&0) {
        return None;
    }

    if let Ok(text) = std::str::from_utf8(payload) {
        return Some(Cow::Borrowed(text));
    }

    let mut text = String::with_capacity(payload.len());
    let mut invalid = 0usize;
    for chunk in payload.utf8_chunks() {
        text.push_str(chunk.valid());
        invalid += chunk.invalid().len();
    }
    if invalid as f64 > payload.len() as f64 * MAX_INVALID_RATIO {
        return None;
    }
    Some(Cow::Owned(text))
}

/// The first `max_chars` characters of `text`.
pub fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Fraction of characters in `text` for which `is_token` holds.
pub fn token_ratio(text: &str, is_token: impl Fn(char) -> bool) -> f64 {
    let mut total = 0usize;
    let mut tokens = 0usize;
    for ch in text.chars() {
        total += 1;
        if is_token(ch) {
            tokens += 1;
        }
    }
    tokens as f64 / total.max(1) as f64
}

/// Round to three decimals for breakdown output.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
