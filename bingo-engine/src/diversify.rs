use tracing::debug;

use crate::sampler::PredictedSet;

/// Numbers shared by two sets.
pub fn overlap(a: &PredictedSet, b: &PredictedSet) -> usize {
    a.numbers.iter().filter(|n| b.numbers.contains(n)).count()
}

/// Checks every set against the ones already accepted. A set sharing
/// `threshold` or more numbers with an accepted one is only logged, unless
/// `strict` is set, in which case it is dropped.
pub fn diversify(sets: Vec<PredictedSet>, threshold: usize, strict: bool) -> Vec<PredictedSet> {
    let mut accepted: Vec<PredictedSet> = Vec::with_capacity(sets.len());

    for set in sets {
        let similar = accepted.iter().position(|s| overlap(&set, s) >= threshold);
        match similar {
            Some(idx) if strict => {
                debug!(numbers = ?set.numbers, similar_to = idx, "set dropped as too similar");
            }
            Some(idx) => {
                debug!(numbers = ?set.numbers, similar_to = idx, "set kept despite overlap");
                accepted.push(set);
            }
            None => accepted.push(set),
        }
    }

    accepted
}
