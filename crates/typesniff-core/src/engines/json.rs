//! JSON engine
//!
//! Three layers, strongest first: a full parse, an embedded value found by
//! incremental parsing from each `{`/`[`, and a bare token-density guess.

use serde_json::{Deserializer, Value};

use crate::engine::{Engine, EngineContext, OracleGate};
use crate::engines::{TEXT_ENGINE_COST, guess_mentions, oracle_confirmation};
use crate::models::Candidate;
use crate::scoring::score_tokens;
use crate::text::{self, round3};

const MEDIA_TYPE: &str = "application/json";
const EXTENSION: &str = "json";

/// Minimum structural token ratio for the density layer.
const DENSITY_THRESHOLD: f64 = 0.3;

fn is_json_token(ch: char) -> bool {
    matches!(ch, '{' | '}' | '[' | ']' | '"' | ':' | ',')
}

pub struct JsonEngine {
    libmagic: OracleGate,
}

impl JsonEngine {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            libmagic: OracleGate::new(ctx.mode(), ctx.libmagic()),
        }
    }
}

impl Engine for JsonEngine {
    fn name(&self) -> &'static str {
        "json"
    }

    fn cost(&self) -> f64 {
        TEXT_ENGINE_COST
    }

    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
        if let Some(hit) = oracle_confirmation(&self.libmagic, payload, MEDIA_TYPE, EXTENSION, |g| {
            guess_mentions(g, "json")
        }) {
            return Ok(vec![hit]);
        }
        if !self.libmagic.heuristics_enabled() {
            return Ok(Vec::new());
        }
        Ok(sniff_text(payload).into_iter().collect())
    }
}

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(JsonEngine::new(ctx))
}

fn candidate(confidence: f64, token_ratio: f64, partial: bool) -> Candidate {
    Candidate::new(MEDIA_TYPE, Some(EXTENSION), confidence)
        .with_signal("token_ratio", round3(token_ratio))
        .with_signal("partial", partial)
}

fn sniff_text(payload: &[u8]) -> Option<Candidate> {
    let decoded = text::decode(payload)?;
    let text = decoded.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return None;
    }

    let token_ratio = text::token_ratio(text, is_json_token);

    if serde_json::from_str::<Value>(text).is_ok() {
        return Some(candidate(score_tokens(1.0), token_ratio, false));
    }

    if find_fragment(text).is_some() {
        return Some(candidate(score_tokens(token_ratio.min(0.9)), token_ratio, true));
    }

    if token_ratio > DENSITY_THRESHOLD && text.contains(':') {
        return Some(candidate(score_tokens(token_ratio.min(0.8)), token_ratio, true));
    }

    None
}

/// First complete JSON object or array embedded in `text`.
fn find_fragment(text: &str) -> Option<&str> {
    text.match_indices(['{', '['])
        .find_map(|(start, _)| {
            let rest = &text[start..];
            let mut stream = Deserializer::from_str(rest).into_iter::<Value>();
            match stream.next() {
                Some(Ok(_)) => Some(&rest[..stream.byte_offset()]),
                _ => None,
            }
        })
}
