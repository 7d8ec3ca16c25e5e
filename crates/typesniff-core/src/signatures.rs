//! Byte-prefix signature database.
//!
//! Two static tables map a fixed prefix to `(media type, extension)`: generic
//! binary magic numbers first, then script openers. The first table entry
//! whose prefix starts the payload wins.

use crate::models::Candidate;
use crate::scoring::SIGNATURE_CONFIDENCE;

/// A fixed byte prefix and the type it identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub prefix: &'static [u8],
    pub media_type: &'static str,
    pub extension: &'static str,
}

const fn sig(prefix: &'static [u8], media_type: &'static str, extension: &'static str) -> Signature {
    Signature {
        prefix,
        media_type,
        extension,
    }
}

/// Image, archive, audio and container headers.
pub const FILE_SIGNATURES: &[Signature] = &[
    sig(b"\xFF\xD8\xFF", "image/jpeg", "jpg"),
    sig(b"\x89PNG\r\n\x1a\n", "image/png", "png"),
    sig(b"GIF87a", "image/gif", "gif"),
    sig(b"GIF89a", "image/gif", "gif"),
    sig(b"%PDF", "application/pdf", "pdf"),
    sig(b"PK\x03\x04", "application/zip", "zip"),
    sig(b"ID3", "audio/mpeg", "mp3"),
    sig(b"OggS", "application/ogg", "ogx"),
    sig(b"fLaC", "audio/flac", "flac"),
    sig(b"RIFF", "audio/wav", "wav"),
    sig(b"\x1f\x8b", "application/gzip", "gz"),
    sig(b"BZh", "application/x-bzip", "bz2"),
    sig(b"7z\xBC\xAF\x27\x1C", "application/x-7z-compressed", "7z"),
    sig(b"\xFD7zXZ\x00", "application/x-xz", "xz"),
    sig(b"Rar!", "application/vnd.rar", "rar"),
    sig(b"BM", "image/bmp", "bmp"),
    sig(b"\x00\x00\x01\x00", "image/x-icon", "ico"),
    sig(b"SQLite format 3\x00", "application/vnd.sqlite3", "sqlite"),
];

/// Shebang lines and language openers.
pub const LANG_SIGNATURES: &[Signature] = &[
    sig(b"#!/usr/bin/env python", "text/x-python", "py"),
    sig(b"#!/usr/bin/python", "text/x-python", "py"),
    sig(b"#!/usr/bin/env php", "text/x-php", "php"),
    sig(b"<?php", "text/x-php", "php"),
    sig(b"#!/usr/bin/env bash", "text/x-shellscript", "sh"),
    sig(b"#!/bin/bash", "text/x-shellscript", "sh"),
    sig(b"#!/usr/bin/env sh", "text/x-shellscript", "sh"),
    sig(b"#!/usr/bin/env node", "application/javascript", "js"),
    sig(b"#!/usr/bin/env perl", "text/x-perl", "pl"),
    sig(b"#!/usr/bin/env ruby", "text/x-ruby", "rb"),
    sig(b"#!/usr/bin/env powershell", "text/x-powershell", "ps1"),
    sig(b"#!/usr/bin/env pwsh", "text/x-powershell", "ps1"),
    sig(b"#!/usr/bin/env swift", "text/x-swift", "swift"),
    sig(b"#!/usr/bin/env zig", "text/x-zig", "zig"),
];

const fn longest(table: &[Signature]) -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < table.len() {
        if table[i].prefix.len() > max {
            max = table[i].prefix.len();
        }
        i += 1;
    }
    max
}

/// Length of the longest known signature across both tables.
pub const MAX_SIGNATURE_LEN: usize = {
    let file = longest(FILE_SIGNATURES);
    let lang = longest(LANG_SIGNATURES);
    if file > lang { file } else { lang }
};

fn all_signatures() -> impl Iterator<Item = &'static Signature> {
    FILE_SIGNATURES.iter().chain(LANG_SIGNATURES.iter())
}

/// Look up the first signature whose prefix starts `payload`.
pub fn lookup(payload: &[u8]) -> Option<&'static Signature> {
    let head = &payload[..payload.len().min(MAX_SIGNATURE_LEN)];
    all_signatures().find(|sig| head.starts_with(sig.prefix))
}

/// Match `payload` against the signature database.
///
/// Returns a candidate with confidence 0.99 on a hit, `None` otherwise.
pub fn match_signature(payload: &[u8]) -> Option<Candidate> {
    lookup(payload).map(|sig| {
        Candidate::new(sig.media_type, Some(sig.extension), SIGNATURE_CONFIDENCE)
            .with_signal("magic_len", sig.prefix.len())
    })
}

/// Match `payload`, accepting only signatures for `media_type`.
///
/// Language engines use this so that, say, the C++ engine never reports a
/// PNG header it happened to see.
pub fn match_signature_for(payload: &[u8], media_type: &str) -> Option<Candidate> {
    match_signature(payload).filter(|cand| cand.media_type == media_type)
}

/// All signatures registered for `media_type`, in table order.
pub fn signatures_for(media_type: &str) -> Vec<&'static Signature> {
    all_signatures()
        .filter(|sig| sig.media_type == media_type)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_signature() {
        let payload = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
        let cand = match_signature(payload).expect("png should match");
        assert_eq!(cand.media_type, "image/png");
        assert_eq!(cand.extension.as_deref(), Some("png"));
        assert_eq!(cand.confidence, 0.99);
    }

    #[test]
    fn test_pdf_signature() {
        let hit = lookup(b"%PDF-1.7\n").unwrap();
        assert_eq!(hit.media_type, "application/pdf");
    }

    #[test]
    fn test_language_signature() {
        let cand = match_signature(b"#!/usr/bin/env python3\nprint('hi')\n").unwrap();
        assert_eq!(cand.media_type, "text/x-python");
        assert_eq!(cand.extension.as_deref(), Some("py"));

        let cand = match_signature(b"<?php echo 1;").unwrap();
        assert_eq!(cand.media_type, "text/x-php");
    }

    #[test]
    fn test_no_match_is_none() {
        assert!(match_signature(b"").is_none());
        assert!(match_signature(b"plain text").is_none());
        assert!(match_signature(b"\x89PN").is_none());
    }

    #[test]
    fn test_match_signature_for_filters_other_types() {
        let png = b"\x89PNG\r\n\x1a\nrest";
        assert!(match_signature_for(png, "text/x-c++").is_none());
        assert!(match_signature_for(png, "image/png").is_some());
    }

    #[test]
    fn test_max_signature_len_covers_all_prefixes() {
        assert!(all_signatures().all(|sig| sig.prefix.len() <= MAX_SIGNATURE_LEN));
        assert_eq!(MAX_SIGNATURE_LEN, b"#!/usr/bin/env powershell".len());
    }

    #[test]
    fn test_signatures_for_media_type() {
        let python = signatures_for("text/x-python");
        assert_eq!(python.len(), 2);
        assert!(signatures_for("application/x-unknown").is_empty());
    }
}
