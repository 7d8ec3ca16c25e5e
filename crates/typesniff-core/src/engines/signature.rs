//! Prefix-table engine

use crate::engine::{Engine, EngineContext};
use crate::engines::TEXT_ENGINE_COST;
use crate::models::Candidate;
use crate::signatures::match_signature;

/// Reports whatever the signature database recognises at the payload start.
pub struct SignatureEngine;

impl Engine for SignatureEngine {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn cost(&self) -> f64 {
        TEXT_ENGINE_COST
    }

    fn sniff(&self, payload: &[u8]) -> anyhow::Result<Vec<Candidate>> {
        Ok(match_signature(payload).into_iter().collect())
    }
}

pub fn factory(_ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(SignatureEngine)
}
