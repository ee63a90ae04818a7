use serde::Serialize;

use bingo_db::models::Round;

/// Per-number frequency and recency over a window. Both vectors are indexed by
/// the number itself; index 0 is unused.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    pub freq: Vec<u32>,
    pub skip: Vec<u32>,
    pub draws: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NumberStats {
    pub number: u8,
    pub frequency: u32,
    pub skip: u32,
}

/// `freq[n]` counts main-number appearances only. `skip[n]` is the number of
/// rounds since `n` was last seen as main or bonus (0 = seen in the newest
/// round), or the window length if it never appeared.
///
/// `window` must be newest first. Numbers outside `1..=range_max` are ignored.
pub fn analyze(window: &[Round], range_max: u8) -> HistoryStats {
    let size = range_max as usize + 1;
    let mut freq = vec![0u32; size];
    let mut last_seen: Vec<Option<usize>> = vec![None; size];

    for (i, round) in window.iter().enumerate() {
        for n in round.main_numbers() {
            let idx = n as usize;
            if n >= 1 && idx < size {
                freq[idx] += 1;
                last_seen[idx].get_or_insert(i);
            }
        }
        if let Some(b) = round.bonus {
            let idx = b as usize;
            if b >= 1 && idx < size {
                last_seen[idx].get_or_insert(i);
            }
        }
    }

    let skip = last_seen
        .iter()
        .map(|seen| seen.map_or(window.len(), |i| i) as u32)
        .collect();

    HistoryStats {
        freq,
        skip,
        draws: window.len(),
    }
}

impl HistoryStats {
    pub fn range_max(&self) -> u8 {
        (self.freq.len() - 1) as u8
    }

    pub fn number_stats(&self) -> Vec<NumberStats> {
        (1..=self.range_max())
            .map(|n| NumberStats {
                number: n,
                frequency: self.freq[n as usize],
                skip: self.skip[n as usize],
            })
            .collect()
    }
}
