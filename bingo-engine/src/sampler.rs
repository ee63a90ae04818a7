use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use bingo_db::models::Round;

use crate::options::PredictOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedSet {
    /// Ascending.
    pub numbers: Vec<u8>,
    pub bonus: Option<u8>,
}

pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Softmax of `weights / temperature`, shifted by the maximum for stability.
pub fn softmax(weights: &[f64], temperature: f64) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = weights.iter().map(|w| ((w - max) / temperature).exp()).collect();
    let total: f64 = exps.iter().sum();
    let total = if total > 0.0 { total } else { 1.0 };
    exps.iter().map(|e| e / total).collect()
}

/// Roulette-wheel pick: the first index whose cumulative weight reaches
/// `u * sum(weights)`, or the last index if rounding overruns.
pub fn choose_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    let r = rng.random::<f64>() * total;
    let mut cum = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cum += w;
        if r <= cum {
            return Some(i);
        }
    }
    Some(weights.len() - 1)
}

/// Removes and returns one candidate, drawn through a tempered softmax of its
/// entry in `weights`.
fn draw_one<R: Rng + ?Sized>(
    candidates: &mut Vec<u8>,
    weights: &[f64],
    temperature: f64,
    rng: &mut R,
) -> Option<u8> {
    let raw: Vec<f64> = candidates
        .iter()
        .map(|&n| weights.get(n as usize).copied().unwrap_or(0.0))
        .collect();
    let probs = softmax(&raw, temperature);
    let idx = choose_weighted(&probs, rng)?;
    Some(candidates.remove(idx))
}

/// Numbers of the `rounds` newest rounds of `window`, bonus included.
pub fn recent_numbers(window: &[Round], rounds: usize) -> HashSet<u8> {
    window
        .iter()
        .take(rounds)
        .flat_map(|r| r.all_numbers())
        .collect()
}

/// Pool members absent from the `rounds` newest rounds. With `rounds == 0`
/// every pool member qualifies.
pub fn non_exposed(pool: &[u8], window: &[Round], rounds: usize) -> Vec<u8> {
    if rounds == 0 {
        return pool.to_vec();
    }
    let recent = recent_numbers(window, rounds);
    pool.iter().copied().filter(|n| !recent.contains(n)).collect()
}

/// Draws one set from the pool without replacement.
///
/// Up to `min_non_exposed_count` numbers are drawn first from the
/// non-exposed part of the pool, the rest from whatever is left. A pool
/// smaller than `numbers_per_set` yields a short set.
pub fn sample_set<R: Rng + ?Sized>(
    pool: &[u8],
    weights: &[f64],
    window: &[Round],
    opts: &PredictOptions,
    rng: &mut R,
) -> PredictedSet {
    let need = opts.numbers_per_set;
    let temperature = opts.effective_temperature();
    let mut selected: Vec<u8> = Vec::with_capacity(need);

    let mut fresh = non_exposed(pool, window, opts.non_exposed_rounds);
    let forced = opts.min_non_exposed_count.min(need);
    while selected.len() < forced {
        match draw_one(&mut fresh, weights, temperature, rng) {
            Some(n) => selected.push(n),
            None => break,
        }
    }

    let mut remaining: Vec<u8> = pool.iter().copied().filter(|n| !selected.contains(n)).collect();
    while selected.len() < need {
        match draw_one(&mut remaining, weights, temperature, rng) {
            Some(n) => selected.push(n),
            None => break,
        }
    }

    selected.sort();

    let bonus = if opts.include_bonus {
        let mut leftover: Vec<u8> = pool.iter().copied().filter(|n| !selected.contains(n)).collect();
        draw_one(&mut leftover, weights, temperature, rng)
    } else {
        None
    };

    PredictedSet { numbers: selected, bonus }
}
