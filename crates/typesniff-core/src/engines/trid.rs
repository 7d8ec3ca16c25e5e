//! External signature-database engine
//!
//! Oracle-only. TrID reports several ranked matches with percentages; each
//! becomes a candidate scored by its percentage.

use crate::engine::{Engine, EngineContext, OracleGate};
use crate::engines::{guesses_to_candidates, keep_max};
use crate::models::Candidate;

pub struct TridEngine {
    oracle: OracleGate,
}

impl TridEngine {
    pub fn new(ctx: &EngineContext) -> Self {
        Self {
            oracle: OracleGate::new(ctx.mode(), ctx.trid()),
        }
    }
}

impl Engine for TridEngine {
    fn name(&self) -> &'static str {
        "trid"
    }

    fn cost(&self) -> f64 {
        30.0
    }

    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
        Ok(keep_max(guesses_to_candidates(self.oracle.consult(payload), 0.0)))
    }
}

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(TridEngine::new(ctx))
}
