use std::cmp::Ordering;

use tracing::debug;

use bingo_db::models::Round;

use crate::analysis::analyze;
use crate::options::PredictOptions;
use crate::weights::{synthesize, WeightVector};

#[derive(Debug, Clone)]
pub struct CandidatePool {
    /// Highest-weighted numbers, best first.
    pub pool: Vec<u8>,
    pub weights: WeightVector,
}

/// Numbers `1..=range_max` ordered by descending weight; equal weights keep
/// ascending numeric order.
pub fn rank_numbers(weights: &[f64], range_max: u8) -> Vec<u8> {
    let mut numbers: Vec<u8> = (1..=range_max).collect();
    numbers.sort_by(|&a, &b| {
        weights[b as usize]
            .partial_cmp(&weights[a as usize])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    numbers
}

pub fn build_pool(window: &[Round], opts: &PredictOptions) -> CandidatePool {
    let range_max = opts.number_range_max;
    let stats = analyze(window, range_max);
    let weights = synthesize(&stats, opts);

    let size = opts.effective_pool_size();
    let mut pool = rank_numbers(&weights, range_max);
    pool.truncate(size);

    debug!(draws = stats.draws, pool = ?pool, "candidate pool built");

    CandidatePool { pool, weights }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_rounds;

    #[test]
    fn test_pool_size_is_clamped() {
        let window = make_test_rounds(100, 30);
        for (requested, expected) in [(0, 6), (6, 6), (12, 12), (45, 45), (80, 45)] {
            let opts = PredictOptions { candidate_pool_size: requested, ..Default::default() };
            let built = build_pool(&window, &opts);
            assert_eq!(built.pool.len(), expected, "requested {requested}");
        }
    }

    #[test]
    fn test_pool_is_distinct_and_in_range() {
        let built = build_pool(&make_test_rounds(100, 30), &PredictOptions::default());
        let mut sorted = built.pool.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), built.pool.len());
        assert!(built.pool.iter().all(|&n| (1..=45).contains(&n)));
        assert_eq!(built.weights.len(), 46);
    }

    #[test]
    fn test_pool_follows_weights() {
        let built = build_pool(&make_test_rounds(100, 30), &PredictOptions::default());
        for pair in built.pool.windows(2) {
            assert!(built.weights[pair[0] as usize] >= built.weights[pair[1] as usize]);
        }
    }

    #[test]
    fn test_ties_resolve_ascending() {
        let weights = vec![0.0, 0.5, 1.0, 0.5, 1.0, 0.5];
        assert_eq!(rank_numbers(&weights, 5), vec![2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_uniform_weights_give_lowest_numbers() {
        let opts = PredictOptions {
            chi_square_weighting: false,
            central_interval_weighting: false,
            non_exposed_rounds: 0,
            candidate_pool_size: 10,
            ..Default::default()
        };
        let built = build_pool(&[], &opts);
        assert_eq!(built.pool, (1..=10).collect::<Vec<u8>>());
    }

    #[test]
    fn test_empty_history_still_builds_pool() {
        let built = build_pool(&[], &PredictOptions::default());
        assert_eq!(built.pool.len(), 12);
        // Only the central prior and the recency boost carry information.
        assert_eq!(built.pool[0], 23);
    }
}
