//! ML classifier engine
//!
//! Oracle-only: reports the classifier's label and score, nothing when the
//! classifier is unavailable or oracles are off.

use crate::engine::{Engine, EngineContext, OracleGate};
use crate::engines::guesses_to_candidates;
use crate::models::Candidate;

/// Score used when the classifier prints a label without a score.
const UNSCORED_CONFIDENCE: f64 = 0.5;

pub struct MagikaEngine {
    oracle: OracleGate,
}

impl MagikaEngine {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            oracle: OracleGate::new(ctx.mode(), ctx.magika()),
        }
    }
}

impl Engine for MagikaEngine {
    fn name(&self) -> &'static str {
        "magika"
    }

    fn cost(&self) -> f64 {
        20.0
    }

    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
        Ok(guesses_to_candidates(
            self.oracle.consult(payload),
            UNSCORED_CONFIDENCE,
        ))
    }
}

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(MagikaEngine::new(ctx))
}
