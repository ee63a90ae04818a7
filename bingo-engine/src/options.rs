use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use bingo_db::models::{Round, NUMBER_RANGE_MAX};

pub const MIN_POOL_SIZE: usize = 6;
pub const MIN_TEMPERATURE: f64 = 0.1;

/// Options accepted by the prediction orchestrator. Every field is optional on
/// the wire; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PredictOptions {
    #[serde(deserialize_with = "de_range_max")]
    pub number_range_max: u8,
    #[serde(deserialize_with = "de_count")]
    pub set_count: usize,
    #[serde(deserialize_with = "de_count")]
    pub numbers_per_set: usize,
    pub include_bonus: bool,
    #[serde(deserialize_with = "de_count")]
    pub non_exposed_rounds: usize,
    #[serde(deserialize_with = "de_count")]
    pub min_non_exposed_count: usize,
    #[serde(deserialize_with = "de_count")]
    pub candidate_pool_size: usize,
    #[serde(deserialize_with = "de_count")]
    pub k_setting: usize,
    #[serde(deserialize_with = "de_count")]
    pub history_rounds: usize,
    pub chi_square_weighting: bool,
    pub central_interval_weighting: bool,
    pub temperature: f64,
    pub recency_boost: f64,
    pub recency_damp: f64,
    pub seed: Option<u64>,
    pub history_is_newest_first: bool,
    pub round_field: String,
    #[serde(deserialize_with = "de_round_id")]
    pub target_round: Option<i64>,
    pub exclude_current_from_window: bool,
    pub use_windowed_history: bool,
    pub strict_diversify: bool,
    #[serde(skip_serializing)]
    pub history: Vec<Round>,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            number_range_max: NUMBER_RANGE_MAX,
            set_count: 5,
            numbers_per_set: 6,
            include_bonus: false,
            non_exposed_rounds: 8,
            min_non_exposed_count: 0,
            candidate_pool_size: 12,
            k_setting: 7,
            history_rounds: 30,
            chi_square_weighting: true,
            central_interval_weighting: true,
            temperature: 1.0,
            recency_boost: 1.2,
            recency_damp: 0.9,
            seed: None,
            history_is_newest_first: true,
            round_field: "round".to_string(),
            target_round: None,
            exclude_current_from_window: true,
            use_windowed_history: true,
            strict_diversify: false,
            history: Vec::new(),
        }
    }
}

impl PredictOptions {
    /// Parses a request body. Wrong types (text where a number is expected,
    /// an object where the history array is expected) are reported here.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).context("Invalid prediction options")
    }

    /// Copy with every degenerate value clamped to something usable.
    pub fn resolved(&self) -> Self {
        let mut opts = self.clone();
        opts.number_range_max = opts.number_range_max.max(1);
        opts.candidate_pool_size = opts.effective_pool_size();
        opts.temperature = opts.effective_temperature();
        if !opts.recency_boost.is_finite() || opts.recency_boost <= 0.0 {
            opts.recency_boost = 1.2;
        }
        if !opts.recency_damp.is_finite() || opts.recency_damp <= 0.0 {
            opts.recency_damp = 0.9;
        }
        opts
    }

    pub fn effective_pool_size(&self) -> usize {
        self.candidate_pool_size
            .max(MIN_POOL_SIZE)
            .min(self.number_range_max as usize)
    }

    pub fn effective_temperature(&self) -> f64 {
        if self.temperature.is_finite() {
            self.temperature.max(MIN_TEMPERATURE)
        } else {
            1.0
        }
    }

    /// Shared-number count from which two sets count as too similar.
    pub fn overlap_threshold(&self) -> usize {
        if self.k_setting == 10 { 4 } else { 3 }
    }
}

fn de_count<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    let v = f64::deserialize(d)?;
    Ok(v.max(0.0) as usize)
}

fn de_range_max<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let v = f64::deserialize(d)?;
    Ok(v.clamp(1.0, u8::MAX as f64) as u8)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoundId {
    Number(f64),
    Text(String),
}

fn de_round_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let id = Option::<RoundId>::deserialize(d)?;
    Ok(match id {
        Some(RoundId::Number(n)) if n.is_finite() && n.fract() == 0.0 => Some(n as i64),
        Some(RoundId::Number(_)) => None,
        Some(RoundId::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = PredictOptions::default();
        assert_eq!(opts.number_range_max, 45);
        assert_eq!(opts.set_count, 5);
        assert_eq!(opts.candidate_pool_size, 12);
        assert_eq!(opts.round_field, "round");
        assert!(opts.exclude_current_from_window);
        assert!(opts.seed.is_none());
    }

    #[test]
    fn test_from_json_merges_over_defaults() {
        let opts = PredictOptions::from_json(r#"{"setCount": 3, "seed": 42, "targetRound": "120"}"#).unwrap();
        assert_eq!(opts.set_count, 3);
        assert_eq!(opts.seed, Some(42));
        assert_eq!(opts.target_round, Some(120));
        assert_eq!(opts.numbers_per_set, 6);
        assert_eq!(opts.history_rounds, 30);
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        assert!(PredictOptions::from_json(r#"{"setCount": "five"}"#).is_err());
        assert!(PredictOptions::from_json(r#"{"history": {"seq": 1}}"#).is_err());
        assert!(PredictOptions::from_json(r#"{"history": [{"seq": 1, "no1": "7"}]}"#).is_err());
    }

    #[test]
    fn test_negative_counts_saturate() {
        let opts = PredictOptions::from_json(r#"{"nonExposedRounds": -3, "minNonExposedCount": -1}"#).unwrap();
        assert_eq!(opts.non_exposed_rounds, 0);
        assert_eq!(opts.min_non_exposed_count, 0);
    }

    #[test]
    fn test_whole_float_counts_accepted() {
        let opts = PredictOptions::from_json(
            r#"{"historyRounds": 30.0, "setCount": 2.0, "numberRangeMax": 45.0, "targetRound": 120.0}"#,
        )
        .unwrap();
        assert_eq!(opts.history_rounds, 30);
        assert_eq!(opts.set_count, 2);
        assert_eq!(opts.number_range_max, 45);
        assert_eq!(opts.target_round, Some(120));
    }

    #[test]
    fn test_history_row_out_of_range_is_kept() {
        let opts = PredictOptions::from_json(
            r#"{"history": [{"seq": 3, "no1": 0, "no2": -4, "no3": 300, "no4": 10, "no5": 11, "no6": 12}]}"#,
        )
        .unwrap();
        assert_eq!(opts.history.len(), 1);
        assert_eq!(opts.history[0].main_numbers().collect::<Vec<_>>(), vec![0, 10, 11, 12]);
    }

    #[test]
    fn test_resolved_clamps() {
        let opts = PredictOptions {
            candidate_pool_size: 2,
            temperature: 0.01,
            ..Default::default()
        }
        .resolved();
        assert_eq!(opts.candidate_pool_size, 6);
        assert!((opts.temperature - 0.1).abs() < 1e-12);

        let opts = PredictOptions { candidate_pool_size: 99, ..Default::default() }.resolved();
        assert_eq!(opts.candidate_pool_size, 45);

        let opts = PredictOptions { number_range_max: 20, candidate_pool_size: 30, ..Default::default() }.resolved();
        assert_eq!(opts.candidate_pool_size, 20);

        let opts = PredictOptions { recency_boost: f64::NAN, recency_damp: -0.5, ..Default::default() }.resolved();
        assert!((opts.recency_boost - 1.2).abs() < 1e-12);
        assert!((opts.recency_damp - 0.9).abs() < 1e-12);

        let opts = PredictOptions { recency_boost: 0.0, recency_damp: f64::INFINITY, ..Default::default() }.resolved();
        assert!((opts.recency_boost - 1.2).abs() < 1e-12);
        assert!((opts.recency_damp - 0.9).abs() < 1e-12);

        let opts = PredictOptions { recency_boost: 1.5, recency_damp: 0.7, ..Default::default() }.resolved();
        assert!((opts.recency_boost - 1.5).abs() < 1e-12);
        assert!((opts.recency_damp - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_threshold() {
        assert_eq!(PredictOptions::default().overlap_threshold(), 3);
        let opts = PredictOptions { k_setting: 10, ..Default::default() };
        assert_eq!(opts.overlap_threshold(), 4);
    }

    #[test]
    fn test_history_not_echoed() {
        let opts = PredictOptions {
            history: vec![Round::new(1, [1, 2, 3, 4, 5, 6], None)],
            ..Default::default()
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert!(json.get("history").is_none());
        assert_eq!(json["candidatePoolSize"], 12);
    }
}
