//! XML engine
//!
//! Layers, each producing a confidence on its own:
//!
//! 1. libmagic reports an XML type (wins outright)
//! 2. byte-order mark (UTF-8, UTF-16 LE/BE)
//! 3. `<?xml` declaration
//! 4. well-formed parse of the whole text
//! 5. plausible root tag at the start
//! 6. roughly balanced open/close tags
//! 7. `<`/`>` density
//!
//! Layers 3, 5, 6 and 7 only look at the first [`WINDOW_CHARS`] characters.
//! The reported confidence is the highest layer; the breakdown names every
//! layer that fired.

use std::sync::OnceLock;

use regex::Regex;
use roxmltree::{Document, ParsingOptions};

use crate::engine::{Engine, EngineContext, OracleGate};
use crate::engines::{TEXT_ENGINE_COST, guess_mentions, oracle_confirmation};
use crate::models::Candidate;
use crate::scoring::{score_magic, score_tokens};
use crate::text::{self, round3};

const MEDIA_TYPE: &str = "application/xml";
const EXTENSION: &str = "xml";

pub const WINDOW_CHARS: usize = 256;

const BOMS: [&[u8]; 3] = [b"\xEF\xBB\xBF", b"\xFF\xFE", b"\xFE\xFF"];
const DECLARATION: &str = "<?xml";
const MAX_TAG_IMBALANCE: usize = 2;
const DENSITY_THRESHOLD: f64 = 0.05;

static OPEN_TAG: OnceLock<Regex> = OnceLock::new();
static CLOSE_TAG: OnceLock<Regex> = OnceLock::new();

fn open_tag_pattern() -> &'static Regex {
    OPEN_TAG.get_or_init(|| Regex::new(r"<[^/!?][^>]*>").unwrap())
}

fn close_tag_pattern() -> &'static Regex {
    CLOSE_TAG.get_or_init(|| Regex::new(r"</[^>]+>").unwrap())
}

pub struct XmlEngine {
    libmagic: OracleGate,
}

impl XmlEngine {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            libmagic: OracleGate::new(ctx.mode(), ctx.libmagic()),
        }
    }
}

impl Engine for XmlEngine {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn cost(&self) -> f64 {
        TEXT_ENGINE_COST
    }

    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
        if let Some(hit) = oracle_confirmation(&self.libmagic, payload, MEDIA_TYPE, EXTENSION, |g| {
            guess_mentions(g, "xml")
        }) {
            return Ok(vec![hit]);
        }
        if !self.libmagic.heuristics_enabled() {
            return Ok(Vec::new());
        }
        Ok(Layers::evaluate(payload).into_candidate().into_iter().collect())
    }
}

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(XmlEngine::new(ctx))
}

/// Layers that fired, as `(signal name, signal value, confidence)`.
#[derive(Debug, Default)]
struct Layers {
    fired: Vec<(&'static str, f64, f64)>,
}

impl Layers {
    fn fire(&mut self, name: &'static str, value: f64, confidence: f64) {
        self.fired.push((name, value, confidence));
    }

    fn evaluate(payload: &[u8]) -> Self {
        let mut layers = Self::default();

        if let Some(bom) = BOMS.iter().find(|bom| payload.starts_with(bom)) {
            layers.fire("bom", bom.len() as f64, score_magic(bom.len()));
        }

        let Some(decoded) = text::decode(payload) else {
            return layers;
        };
        let body = decoded.trim_start_matches('\u{feff}');
        let window = text::head(body, WINDOW_CHARS);
        let stripped = window.trim_start();

        if stripped.starts_with(DECLARATION) {
            layers.fire("xml_decl", 1.0, score_magic(DECLARATION.len()));
        }

        if is_well_formed(body) {
            layers.fire("parsed", 1.0, score_tokens(1.0));
        }

        if has_root_tag(stripped) {
            layers.fire("root_tag", 1.0, score_tokens(0.2));
        }

        let open = open_tag_pattern().find_iter(window).count();
        let close = close_tag_pattern().find_iter(window).count();
        if open > 0 && open.abs_diff(close) <= MAX_TAG_IMBALANCE {
            layers.fire("balanced", 1.0, score_tokens(0.15));
        }

        let ratio = text::token_ratio(window, |c| c == '<' || c == '>');
        if ratio > DENSITY_THRESHOLD {
            layers.fire("token_ratio", round3(ratio), score_tokens(ratio.min(0.7)));
        }

        layers
    }

    fn into_candidate(self) -> Option<Candidate> {
        let confidence = self
            .fired
            .iter()
            .map(|&(_, _, confidence)| confidence)
            .fold(None, |best: Option<f64>, c| Some(best.map_or(c, |b| b.max(c))))?;
        let mut cand = Candidate::new(MEDIA_TYPE, Some(EXTENSION), confidence);
        for (name, value, _) in self.fired {
            cand = cand.with_signal(name, value);
        }
        Some(cand)
    }
}

fn is_well_formed(text: &str) -> bool {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).is_ok()
}

fn has_root_tag(stripped: &str) -> bool {
    let Some(rest) = stripped.strip_prefix('<') else {
        return false;
    };
    let Some(end) = rest.find('>') else {
        return false;
    };
    rest[..end]
        .split_whitespace()
        .next()
        .map(|tag| tag.trim_matches(|c| c == '/' || c == '?'))
        .is_some_and(|tag| !tag.is_empty())
}
