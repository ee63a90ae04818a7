pub mod analysis;
pub mod diversify;
pub mod options;
pub mod pool;
pub mod predict;
pub mod sampler;
pub mod weights;
pub mod window;

use bingo_db::models::Round;

/// Rounds `newest`, `newest - 1`, ... (newest first), each with six distinct
/// numbers and a bonus that cycle through the 1-45 range.
pub fn make_test_rounds(newest: u32, n: usize) -> Vec<Round> {
    (0..n as u32)
        .map(|i| {
            let seq = newest - i;
            let base = (seq % 7) as u8 * 6;
            Round::new(
                seq,
                [base + 1, base + 2, base + 3, base + 4, base + 5, base + 6],
                Some(base + 7),
            )
        })
        .collect()
}
