use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use bingo_db::db::RoundStore;
use bingo_db::models::Round;

use crate::diversify::diversify;
use crate::options::PredictOptions;
use crate::pool::build_pool;
use crate::sampler::{make_rng, sample_set, PredictedSet};
use crate::window::{select_window, WindowInfo};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Options as actually applied, defaults and clamps included.
    pub options: PredictOptions,
    pub window_info: WindowInfo,
    pub sets: Vec<PredictedSet>,
    pub candidate_pool: Vec<u8>,
}

/// Runs window selection, pool building, `set_count` draws and the
/// diversifier over `options.history`.
///
/// One generator serves every draw of a call, so a fixed `seed` reproduces
/// the whole result.
pub fn generate_predictions(options: &PredictOptions) -> Prediction {
    let opts = options.resolved();
    let (window, window_info) = select_window(&opts.history, &opts);
    let built = build_pool(&window, &opts);

    let mut rng = make_rng(opts.seed);
    let sets: Vec<PredictedSet> = (0..opts.set_count)
        .map(|_| sample_set(&built.pool, &built.weights, &window, &opts, &mut rng))
        .collect();
    let sets = diversify(sets, opts.overlap_threshold(), opts.strict_diversify);

    debug!(sets = sets.len(), window = window.len(), "predictions generated");

    Prediction {
        options: opts,
        window_info,
        sets,
        candidate_pool: built.pool,
    }
}

/// Same as [`generate_predictions`], loading the history from `store` when the
/// caller did not supply any.
///
/// Enough newest-first rounds are fetched to reach the target round and still
/// fill the window; a target the store does not know is dropped so the window
/// anchors on the most recent round.
pub fn generate_predictions_from_store(
    store: &dyn RoundStore,
    options: &PredictOptions,
) -> Result<Prediction> {
    if !options.history.is_empty() {
        return Ok(generate_predictions(options));
    }

    let mut opts = options.clone();
    opts.round_field = "seq".to_string();
    opts.history_is_newest_first = true;

    let latest = store
        .recent_rounds(1)
        .context("Cannot read the latest round")?
        .first()
        .map(|r| r.seq);
    let Some(latest) = latest else {
        warn!("no rounds stored, predicting from an empty history");
        return Ok(generate_predictions(&opts));
    };

    let target = match opts.target_round {
        Some(t) => {
            let known = match u32::try_from(t) {
                Ok(seq) => store.round_by_seq(seq)?.map(|r| r.seq),
                Err(_) => None,
            };
            if known.is_none() {
                warn!(target = t, latest, "unknown target round, anchoring on the latest round");
            }
            known
        }
        None => None,
    };
    opts.target_round = target.map(i64::from);

    opts.history = load_history(store, &opts, latest, target)?;

    debug!(latest, ?target, fetched = opts.history.len(), "history loaded from store");

    Ok(generate_predictions(&opts))
}

/// Newest-first rounds for the store-backed variant. With `use_windowed_history`
/// off nothing downstream cuts a window, so the rounds before the anchor are
/// sliced out here.
fn load_history(
    store: &dyn RoundStore,
    opts: &PredictOptions,
    latest: u32,
    target: Option<u32>,
) -> Result<Vec<Round>> {
    let offset = target.map_or(0, |t| latest.saturating_sub(t)) as usize;
    let take = opts.history_rounds.max(opts.non_exposed_rounds + 1);
    let limit = offset + 1 + take;
    let fetch = u32::try_from(limit).unwrap_or(u32::MAX);
    let rows = store
        .recent_rounds(fetch)
        .with_context(|| format!("Cannot load {} rounds of history", fetch))?;

    if opts.use_windowed_history {
        return Ok(rows);
    }
    let skip = offset + usize::from(target.is_some() && opts.exclude_current_from_window);
    Ok(rows.into_iter().skip(skip).take(take).collect())
}
