use serde::{Deserialize, Serialize};
use tracing::debug;

use bingo_db::models::Round;

use crate::options::PredictOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryOrder {
    NewestFirst,
    OldestFirst,
}

/// Diagnostics describing how the analysis window was cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub used_full_history: bool,
    pub order: HistoryOrder,
    pub round_field: String,
    pub target_round: Option<i64>,
    pub target_found: bool,
    pub target_index: Option<usize>,
    pub requested_rounds: usize,
    pub history_size: usize,
    pub window_size: usize,
}

/// Picks the rounds statistics are computed over: the `history_rounds` rounds
/// just before (or including) the target round, returned newest first whatever
/// the order of `history`.
///
/// Without a target (or when it is not found) the most recent rounds are used.
pub fn select_window(history: &[Round], opts: &PredictOptions) -> (Vec<Round>, WindowInfo) {
    let order = if opts.history_is_newest_first {
        HistoryOrder::NewestFirst
    } else {
        HistoryOrder::OldestFirst
    };
    let mut info = WindowInfo {
        used_full_history: true,
        order,
        round_field: opts.round_field.clone(),
        target_round: opts.target_round,
        target_found: false,
        target_index: None,
        requested_rounds: opts.history_rounds,
        history_size: history.len(),
        window_size: history.len(),
    };

    if !opts.use_windowed_history || history.is_empty() {
        return (history.to_vec(), info);
    }

    let len = history.len();
    let n = opts.history_rounds.min(len).max(1);
    let pos = opts.target_round.and_then(|target| {
        history
            .iter()
            .position(|r| r.field_value(&opts.round_field) == Some(target))
    });

    let window: Vec<Round> = match order {
        HistoryOrder::NewestFirst => {
            let start = match pos {
                Some(p) if opts.exclude_current_from_window => p + 1,
                Some(p) => p,
                None => 0,
            };
            let start = start.min(len);
            let end = (start + n).min(len);
            history[start..end].to_vec()
        }
        HistoryOrder::OldestFirst => {
            let (start, end) = match pos {
                Some(p) if opts.exclude_current_from_window => (p.saturating_sub(n), p),
                Some(p) => ((p + 1).saturating_sub(n), p + 1),
                None => (len - n, len),
            };
            history[start..end.min(len)].iter().rev().cloned().collect()
        }
    };

    info.used_full_history = false;
    info.target_found = pos.is_some();
    info.target_index = pos;
    info.window_size = window.len();

    debug!(
        ?order,
        target = ?opts.target_round,
        target_index = ?pos,
        window_size = window.len(),
        "history window selected"
    );

    (window, info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_test_rounds;

    fn seqs(rounds: &[Round]) -> Vec<u32> {
        rounds.iter().map(|r| r.seq).collect()
    }

    fn opts(target: Option<i64>, rounds: usize) -> PredictOptions {
        PredictOptions {
            target_round: target,
            history_rounds: rounds,
            ..Default::default()
        }
    }

    #[test]
    fn test_anchored_excluding_target() {
        let history = make_test_rounds(130, 31);
        let (window, info) = select_window(&history, &opts(Some(120), 5));
        assert_eq!(seqs(&window), vec![119, 118, 117, 116, 115]);
        assert!(info.target_found);
        assert_eq!(info.target_index, Some(10));
        assert_eq!(info.window_size, 5);
        assert!(!info.used_full_history);
    }

    #[test]
    fn test_anchored_including_target() {
        let history = make_test_rounds(130, 31);
        let mut o = opts(Some(120), 5);
        o.exclude_current_from_window = false;
        let (window, _) = select_window(&history, &o);
        assert_eq!(seqs(&window), vec![120, 119, 118, 117, 116]);
    }

    #[test]
    fn test_no_target_takes_most_recent() {
        let history = make_test_rounds(130, 31);
        let (window, info) = select_window(&history, &opts(None, 5));
        assert_eq!(seqs(&window), vec![130, 129, 128, 127, 126]);
        assert!(!info.target_found);
    }

    #[test]
    fn test_unknown_target_falls_back() {
        let history = make_test_rounds(130, 31);
        let (window, info) = select_window(&history, &opts(Some(999), 3));
        assert_eq!(seqs(&window), vec![130, 129, 128]);
        assert_eq!(info.target_index, None);
    }

    #[test]
    fn test_oldest_first_is_returned_newest_first() {
        let mut history = make_test_rounds(130, 31);
        history.reverse();
        let mut o = opts(Some(120), 5);
        o.history_is_newest_first = false;

        let (window, info) = select_window(&history, &o);
        assert_eq!(seqs(&window), vec![119, 118, 117, 116, 115]);
        assert_eq!(info.order, HistoryOrder::OldestFirst);

        o.exclude_current_from_window = false;
        let (window, _) = select_window(&history, &o);
        assert_eq!(seqs(&window), vec![120, 119, 118, 117, 116]);

        o.target_round = None;
        let (window, _) = select_window(&history, &o);
        assert_eq!(seqs(&window), vec![130, 129, 128, 127, 126]);
    }

    #[test]
    fn test_bounds_are_clamped() {
        let history = make_test_rounds(130, 31);
        // Oldest round as anchor: nothing precedes it.
        let (window, _) = select_window(&history, &opts(Some(100), 5));
        assert!(window.is_empty());

        let (window, _) = select_window(&history, &opts(Some(102), 5));
        assert_eq!(seqs(&window), vec![101, 100]);

        let mut history_old = history.clone();
        history_old.reverse();
        let mut o = opts(Some(101), 5);
        o.history_is_newest_first = false;
        let (window, _) = select_window(&history_old, &o);
        assert_eq!(seqs(&window), vec![100]);
    }

    #[test]
    fn test_window_longer_than_history() {
        let history = make_test_rounds(10, 4);
        let (window, _) = select_window(&history, &opts(None, 30));
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_disabled_or_empty_passes_through() {
        let history = make_test_rounds(130, 31);
        let mut o = opts(Some(120), 5);
        o.use_windowed_history = false;
        let (window, info) = select_window(&history, &o);
        assert_eq!(window.len(), 31);
        assert!(info.used_full_history);

        let (window, info) = select_window(&[], &opts(Some(120), 5));
        assert!(window.is_empty());
        assert!(info.used_full_history);
        assert_eq!(info.window_size, 0);
    }

    #[test]
    fn test_custom_round_field() {
        let mut history = make_test_rounds(50, 10);
        for (i, r) in history.iter_mut().enumerate() {
            r.extra.insert("drawNo".to_string(), serde_json::Value::from(900 - i as i64));
        }
        let mut o = opts(Some(897), 2);
        o.round_field = "drawNo".to_string();
        let (window, info) = select_window(&history, &o);
        assert_eq!(info.target_index, Some(3));
        assert_eq!(seqs(&window), vec![46, 45]);
    }
}
