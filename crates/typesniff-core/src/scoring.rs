//! Confidence calibration shared by every heuristic engine.
//!
//! Evidence comes in two shapes: exact byte/string matches and statistical
//! token densities. Engines turn both into confidence through the two
//! functions below so values stay comparable across engines.

/// Ceiling for exact-match scores. Only full structural confirmation
/// (`score_tokens(1.0)`) reaches 1.0.
pub const MAGIC_CEILING: f64 = 0.99;

/// Confidence assigned to a signature-table match.
pub const SIGNATURE_CONFIDENCE: f64 = 0.99;

/// Steepness of the token-ratio curve.
const TOKEN_STEEPNESS: f64 = 4.0;

/// Confidence for an exact match of `match_length` bytes.
///
/// Each additional byte halves the remaining doubt, saturating at
/// [`MAGIC_CEILING`].
pub fn score_magic(match_length: usize) -> f64 {
    if match_length == 0 {
        return 0.0;
    }
    let exponent = i32::try_from(match_length).unwrap_or(i32::MAX);
    (1.0 - 0.5f64.powi(exponent)).min(MAGIC_CEILING)
}

/// Confidence for a statistical signal where `ratio` is the fraction of
/// token characters (or an engine-chosen strength) in `[0, 1]`.
///
/// Concave: high ratios are compressed together, and `1.0` maps to exactly
/// `1.0`. Out-of-range and NaN inputs are clamped.
pub fn score_tokens(ratio: f64) -> f64 {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let norm = 1.0 - (-TOKEN_STEEPNESS).exp();
    ((1.0 - (-TOKEN_STEEPNESS * ratio).exp()) / norm).clamp(0.0, 1.0)
}
