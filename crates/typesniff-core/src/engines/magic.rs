//! Generic binary sniffing
//!
//! Uses the `infer` matcher set for container, media and archive formats the
//! static signature tables do not cover. When libmagic is available its MIME
//! answer is reported next to the matcher's.

use crate::engine::{Engine, EngineContext, OracleGate};
use crate::engines::{guesses_to_candidates, keep_max};
use crate::models::Candidate;
use crate::scoring::score_magic;

/// Assumed match length for an `infer` hit; matchers do not report one.
const INFER_MATCH_LEN: usize = 4;

const OCTET_STREAM: &str = "application/octet-stream";

pub struct MagicEngine {
    libmagic: OracleGate,
}

impl MagicEngine {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            libmagic: OracleGate::new(ctx.mode(), ctx.libmagic()),
        }
    }
}

impl Engine for MagicEngine {
    fn name(&self) -> &'static str {
        "magic"
    }

    fn cost(&self) -> f64 {
        10.0
    }

    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
        let confidence = score_magic(INFER_MATCH_LEN);
        let guesses = self
            .libmagic
            .consult(payload)
            .into_iter()
            .filter(|g| g.media_type != OCTET_STREAM)
            .collect();
        let mut candidates = guesses_to_candidates(guesses, confidence);

        if self.libmagic.heuristics_enabled()
            && let Some(kind) = infer::get(payload)
        {
            candidates.push(
                Candidate::new(kind.mime_type(), Some(kind.extension()), confidence)
                    .with_signal("magic_len", INFER_MATCH_LEN),
            );
        }

        Ok(keep_max(candidates))
    }
}

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(MagicEngine::new(ctx))
}
