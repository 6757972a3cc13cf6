//! Bounded, weighted selection of matches for display.
//!
//! When there are more matches than requested, `k` matches are drawn with
//! replacement, so a match can be returned more than once. Weights favour
//! closer pairs, higher Overture confidence and similar name lengths.

use crate::models::Match;
use rand::Rng;

fn neutral_if_invalid(term: f64) -> f64 {
    if term.is_finite() && term >= 0.0 {
        term
    } else {
        1.0
    }
}

/// Closer pairs weigh more: `1 / (distance + 1)`.
pub fn distance_term(distance_m: f64) -> f64 {
    neutral_if_invalid(1.0 / (distance_m.max(0.0) + 1.0))
}

/// Absent or non-finite confidence is neutral. Others clamp to [0, 1].
pub fn confidence_term(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => 1.0,
    }
}

/// Ratio of the shorter to the longer name, counted in characters.
///
/// Neutral when either name is missing or empty.
pub fn name_similarity_term(a: Option<&str>, b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 1.0;
    };

    let la = a.chars().count();
    let lb = b.chars().count();
    if la == 0 || lb == 0 {
        return 1.0;
    }

    la.min(lb) as f64 / la.max(lb) as f64
}

pub fn match_weight(m: &Match) -> f64 {
    distance_term(m.distance_m)
        * confidence_term(m.a.confidence)
        * confidence_term(m.b.confidence)
        * name_similarity_term(m.a.name.as_deref(), m.b.name.as_deref())
}

/// Prefix sums of the weights, for inverse-CDF sampling.
fn cumulative(weights: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .scan(0.0, |acc, w| {
            *acc += w;
            Some(*acc)
        })
        .collect()
}

/// Draws `k` indices with replacement, proportionally to `weights`.
///
/// Uniform when every weight is zero.
pub fn weighted_indices_with_replacement<R: Rng>(
    weights: &[f64],
    k: usize,
    rng: &mut R,
) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }

    let prefix = cumulative(weights);
    let total = prefix[prefix.len() - 1];

    if total <= 0.0 || !total.is_finite() {
        return (0..k).map(|_| rng.random_range(0..weights.len())).collect();
    }

    (0..k)
        .map(|_| {
            let draw = rng.random_range(0.0..total);
            // first index whose prefix sum exceeds the draw; zero weights never win
            prefix
                .partition_point(|&c| c <= draw)
                .min(weights.len() - 1)
        })
        .collect()
}

/// Returns all matches when there are at most `k`, otherwise `k` weighted draws.
pub fn sample_matches<R: Rng>(matches: Vec<Match>, k: usize, rng: &mut R) -> Vec<Match> {
    if matches.len() <= k {
        return matches;
    }

    let weights: Vec<f64> = matches.iter().map(match_weight).collect();

    weighted_indices_with_replacement(&weights, k, rng)
        .into_iter()
        .map(|idx| matches[idx].clone())
        .collect()
}
