//! Detection engines
//!
//! Each engine follows the same shape: consult its oracle (when one applies),
//! then fall back to a signature short-circuit and textual layers. Per-type
//! confidence is the maximum over the layers that fired.

pub mod cpp;
pub mod csv;
pub mod elixir;
pub mod json;
pub mod language;
pub mod magic;
pub mod magika;
pub mod php;
pub mod powershell;
pub mod python;
pub mod signature;
pub mod swift;
pub mod toml;
pub mod trid;
pub mod xml;
pub mod zig;

use crate::engine::OracleGate;
use crate::models::Candidate;
use crate::oracle::OracleGuess;
use crate::scoring::score_tokens;

/// Default cost for the cheap text engines.
pub const TEXT_ENGINE_COST: f64 = 0.05;

/// Ask the gate's oracle and turn a guess accepted by `accept` into a
/// full-confidence candidate.
///
/// Returns `None` when oracles are off, unavailable, or disagree.
pub(crate) fn oracle_confirmation(
    gate: &OracleGate,
    payload: &[u8],
    media_type: &str,
    extension: &str,
    accept: impl Fn(&OracleGuess) -> bool,
) -> Option<Candidate> {
    let guess = gate.consult(payload).into_iter().find(|g| accept(g))?;
    tracing::debug!(media_type, oracle_type = %guess.media_type, "oracle confirmed type");
    Some(
        Candidate::new(media_type, Some(extension), score_tokens(1.0))
            .with_signal("oracle", true),
    )
}

/// True when the guess's media type or extension mentions `hint`.
pub(crate) fn guess_mentions(guess: &OracleGuess, hint: &str) -> bool {
    guess.media_type.to_ascii_lowercase().contains(hint)
        || guess
            .extension
            .as_deref()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(hint))
}

/// Turn oracle guesses into candidates, using the oracle's own score when it
/// reports one and `fallback` otherwise.
pub(crate) fn guesses_to_candidates(guesses: Vec<OracleGuess>, fallback: f64) -> Vec<Candidate> {
    guesses
        .into_iter()
        .map(|guess| {
            let score = guess.score.unwrap_or(fallback);
            Candidate::new(guess.media_type, guess.extension.as_deref(), score)
                .with_signal("oracle", true)
                .with_signal("oracle_score", score)
        })
        .collect()
}

/// Keep only the strongest candidate per media type.
pub(crate) fn keep_max(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: Vec<Candidate> = Vec::new();
    for cand in candidates {
        match best.iter_mut().find(|b| b.media_type == cand.media_type) {
            Some(existing) if existing.confidence >= cand.confidence => {}
            Some(existing) => *existing = cand,
            None => best.push(cand),
        }
    }
    best
}
