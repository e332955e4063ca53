//! Weighted composite score
//!
//! `composite = 0.25 * emotion + 0.375 * symmetry + 0.375 * body`
//!
//! When the service omits some partial scores, [`Weighting`] decides what
//! happens: `Renormalized` divides by the weights actually present,
//! `Fixed` keeps the full weights and counts a missing score as zero.

use crate::scoring::ScoreResponse;
pub use posescore_common::config::Weighting;

pub const EMOTION_WEIGHT: f64 = 0.25;
pub const SYMMETRY_WEIGHT: f64 = 0.375;
pub const BODY_WEIGHT: f64 = 0.375;

/// Composite of the partial scores; `None` when no partial score is present
pub fn composite(scores: &ScoreResponse, weighting: Weighting) -> Option<f64> {
    let present: Vec<(f64, f64)> = [
        (scores.emotion_score, EMOTION_WEIGHT),
        (scores.symmetry_score, SYMMETRY_WEIGHT),
        (scores.body_score, BODY_WEIGHT),
    ]
    .into_iter()
    .filter_map(|(score, weight)| score.map(|s| (s, weight)))
    .collect();

    if present.is_empty() {
        return None;
    }

    let weighted_sum: f64 = present.iter().map(|(s, w)| s * w).sum();
    match weighting {
        Weighting::Fixed => Some(weighted_sum),
        Weighting::Renormalized => {
            let weight_sum: f64 = present.iter().map(|(_, w)| w).sum();
            Some(weighted_sum / weight_sum)
        }
    }
}
