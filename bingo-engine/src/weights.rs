use crate::analysis::HistoryStats;
use crate::options::PredictOptions;

/// Guards the chi-square denominator when the window is empty.
pub const CHI_EPSILON: f64 = 1e-6;
const NORM_EPSILON: f64 = 1e-12;

/// Indexed by number; index 0 is unused and always 0 after normalization.
pub type WeightVector = Vec<f64>;

/// `1 / (1 + chi)` where `chi = (O - E)^2 / E` and `E = draws * 6 / range`.
/// Numbers drawn about as often as expected stay close to 1.
pub fn chi_square_weights(freq: &[u32], draws: usize, range_max: u8) -> WeightVector {
    let expected = (draws as f64 * 6.0) / range_max as f64;
    let mut w = vec![0.0; range_max as usize + 1];
    for n in 1..=range_max as usize {
        let observed = freq.get(n).copied().unwrap_or(0) as f64;
        let chi = (observed - expected).powi(2) / (expected + CHI_EPSILON);
        w[n] = 1.0 / (1.0 + chi);
    }
    w
}

/// Gaussian bump centred on the middle of the range, sigma = range / 6.
pub fn central_interval_weights(range_max: u8) -> WeightVector {
    let mid = (range_max as f64 + 1.0) / 2.0;
    let sigma = range_max as f64 / 6.0;
    let mut w = vec![0.0; range_max as usize + 1];
    for n in 1..=range_max as usize {
        let d = (n as f64 - mid) / sigma;
        w[n] = (-0.5 * d * d).exp();
    }
    w
}

/// `boost` for numbers unseen for at least `rounds` rounds, `damp` otherwise.
pub fn recency_factors(skip: &[u32], rounds: usize, boost: f64, damp: f64) -> WeightVector {
    let mut w = vec![0.0; skip.len()];
    for n in 1..skip.len() {
        w[n] = if skip[n] as usize >= rounds { boost } else { damp };
    }
    w
}

/// Scales so that the largest entry is 1.
pub fn normalize(w: &mut [f64]) {
    if w.len() < 2 {
        return;
    }
    let max = w[1..].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for v in w[1..].iter_mut() {
        *v = (*v + NORM_EPSILON) / (max + NORM_EPSILON);
    }
    w[0] = 0.0;
}

/// Multiplies every enabled signal into a flat prior of 1 and normalizes.
pub fn synthesize(stats: &HistoryStats, opts: &PredictOptions) -> WeightVector {
    let range_max = opts.number_range_max;
    let size = range_max as usize + 1;
    let mut w = vec![1.0; size];

    if opts.chi_square_weighting {
        let chi = chi_square_weights(&stats.freq, stats.draws, range_max);
        w.iter_mut().zip(&chi).for_each(|(a, b)| *a *= b);
    }
    if opts.central_interval_weighting {
        let central = central_interval_weights(range_max);
        w.iter_mut().zip(&central).for_each(|(a, b)| *a *= b);
    }
    if opts.non_exposed_rounds > 0 {
        let recency = recency_factors(&stats.skip, opts.non_exposed_rounds, opts.recency_boost, opts.recency_damp);
        w.iter_mut().zip(&recency).for_each(|(a, b)| *a *= b);
    }

    normalize(&mut w);
    w
}
