//! Shared machinery for the programming-language engines.
//!
//! A language engine is a [`LanguageRules`] table run through
//! [`LanguageEngine`]: oracle probe, signature short-circuit for the rule's
//! own media type, a `#!` line naming its interpreter, then three textual layers (structural parse, strong
//! marker, keyword density). The highest layer wins.

use std::borrow::Cow;

use crate::engine::{Engine, EngineContext, OracleGate};
use crate::engines::{guess_mentions, oracle_confirmation};
use crate::models::Candidate;
use crate::scoring::{SIGNATURE_CONFIDENCE, score_tokens};
use crate::signatures::match_signature_for;
use crate::text::{self, round3};

/// Characters examined by the textual layers.
pub const HEAD_CHARS: usize = 4096;

/// Strength assigned to a strong marker.
const STRONG_MARKER_RATIO: f64 = 0.7;
/// Strength assigned to a successful structural parse.
const STRUCTURAL_RATIO: f64 = 0.9;
/// Ceiling on keyword-density strength.
const MAX_KEYWORD_RATIO: f64 = 0.5;

/// Static description of one language.
#[derive(Debug, Clone, Copy)]
pub struct LanguageRules {
    pub name: &'static str,
    pub media_type: &'static str,
    pub extension: &'static str,
    pub cost: f64,
    /// Substring a libmagic answer must contain to confirm this language.
    pub oracle_hint: Option<&'static str>,
    /// Name that marks a `#!` first line as this language.
    pub interpreter: Option<&'static str>,
    /// Markers lowercase and text lowercased before matching.
    pub case_insensitive: bool,
    /// Near-certain evidence in the text head.
    pub strong: fn(&str) -> bool,
    /// Keywords counted (once each) for the density layer.
    pub markers: &'static [&'static str],
    /// Distinct markers required before the density layer fires.
    pub min_hits: usize,
    /// Full parse of the whole text, when the language has a parser.
    pub structural: Option<fn(&str) -> bool>,
}

/// True when every member of at least one group occurs in `text`.
pub fn any_group(text: &str, groups: &[&[&str]]) -> bool {
    groups
        .iter()
        .any(|group| group.iter().all(|needle| text.contains(needle)))
}

/// Whether `payload` opens with a `#!` line mentioning `interpreter`.
pub fn shebang_names(payload: &[u8], interpreter: &str) -> bool {
    let Some(rest) = payload.strip_prefix(b"#!") else {
        return false;
    };
    let line = rest.split(|&b| b == b'\n').next().unwrap_or_default();
    String::from_utf8_lossy(line).contains(interpreter)
}

pub struct LanguageEngine {
    rules: LanguageRules,
    libmagic: OracleGate,
}

impl LanguageEngine {
    pub fn new(rules: LanguageRules, ctx: &EngineContext) -> Self {
        Self {
            rules,
            libmagic: OracleGate::new(ctx.mode(), ctx.libmagic()),
        }
    }

    fn textual(&self, text: &str) -> Option<Candidate> {
        let rules = &self.rules;
        let head = text::head(text, HEAD_CHARS);
        let head: Cow<'_, str> = if rules.case_insensitive {
            Cow::Owned(head.to_lowercase())
        } else {
            Cow::Borrowed(head)
        };

        let mut fired: Vec<(&'static str, f64, f64)> = Vec::new();

        if let Some(parse) = rules.structural
            && parse(text)
        {
            fired.push(("parsed", 1.0, score_tokens(STRUCTURAL_RATIO)));
        }

        if (rules.strong)(&head) {
            fired.push(("strong_marker", 1.0, score_tokens(STRONG_MARKER_RATIO)));
        }

        let hits = rules
            .markers
            .iter()
            .filter(|marker| head.contains(**marker))
            .count();
        if hits > 0 && hits >= rules.min_hits {
            let ratio = hits as f64 / rules.markers.len() as f64;
            fired.push((
                "keyword_ratio",
                round3(ratio),
                score_tokens(ratio.min(MAX_KEYWORD_RATIO)),
            ));
        }

        let confidence = fired
            .iter()
            .map(|&(_, _, c)| c)
            .reduce(f64::max)?;
        let mut cand = Candidate::new(rules.media_type, Some(rules.extension), confidence)
            .with_signal("keyword_hits", hits);
        for (name, value, _) in fired {
            cand = cand.with_signal(name, value);
        }
        Some(cand)
    }
}

impl Engine for LanguageEngine {
    fn name(&self) -> &'static str {
        self.rules.name
    }

    fn cost(&self) -> f64 {
        self.rules.cost
    }

    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
        let rules = &self.rules;
        if let Some(hint) = rules.oracle_hint
            && let Some(hit) = oracle_confirmation(
                &self.libmagic,
                payload,
                rules.media_type,
                rules.extension,
                |g| guess_mentions(g, hint),
            )
        {
            return Ok(vec![hit]);
        }
        if !self.libmagic.heuristics_enabled() {
            return Ok(Vec::new());
        }

        if let Some(sig) = match_signature_for(payload, rules.media_type) {
            return Ok(vec![sig]);
        }
        if let Some(interpreter) = rules.interpreter
            && shebang_names(payload, interpreter)
        {
            let cand = Candidate::new(rules.media_type, Some(rules.extension), SIGNATURE_CONFIDENCE)
                .with_signal("shebang", true);
            return Ok(vec![cand]);
        }

        let Some(decoded) = text::decode(payload) else {
            return Ok(Vec::new());
        };
        Ok(self.textual(&decoded).into_iter().collect())
    }
}
