use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::import::ImportResult;
use bingo_db::models::Round;
use bingo_engine::analysis::NumberStats;
use bingo_engine::predict::Prediction;
use bingo_engine::window::WindowInfo;

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_rounds(rounds: &[Round]) {
    if rounds.is_empty() {
        println!("No rounds to display.");
        return;
    }

    let mut table = new_table(vec!["Round", "Numbers", "Bonus", "Stored"]);
    for round in rounds {
        let bonus = round.bonus.map_or("—".to_string(), |b| b.to_string());
        let stored = round
            .extra
            .get("created_at")
            .and_then(|v| v.as_str())
            .unwrap_or("—")
            .to_string();
        table.add_row(vec![
            round.seq.to_string(),
            join_numbers(&round.sorted_numbers()),
            bonus,
            stored,
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import finished:");
    println!("  Rows read : {}", result.total_records);
    println!("  Inserted  : {}", result.inserted);
    println!("  Updated   : {}", result.updated);
    if result.errors > 0 {
        println!("  Errors    : {}", result.errors);
    }
}

fn describe_window(info: &WindowInfo) -> String {
    match (info.used_full_history, info.target_round) {
        (true, _) => format!("full history ({} rounds)", info.window_size),
        (false, Some(t)) if info.target_found => {
            format!("{} rounds anchored on round {}", info.window_size, t)
        }
        (false, _) => format!("{} most recent rounds", info.window_size),
    }
}

pub fn display_stats(stats: &[NumberStats], info: &WindowInfo) {
    println!("\nStatistics over the {}\n", describe_window(info));

    let mut table = new_table(vec!["Number", "Frequency", "Skip"]);
    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.number.cmp(&b.number)));

    for stat in &sorted {
        table.add_row(vec![
            format!("{:2}", stat.number),
            stat.frequency.to_string(),
            stat.skip.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn display_prediction(prediction: &Prediction) {
    println!("\nWindow: {}", describe_window(&prediction.window_info));
    println!("Candidate pool: {}", join_numbers(&prediction.candidate_pool));

    let mut table = new_table(vec!["#", "Numbers", "Bonus"]);
    for (i, set) in prediction.sets.iter().enumerate() {
        let bonus = match set.bonus {
            Some(b) => Cell::new(b.to_string()).fg(Color::Yellow),
            None => Cell::new("—"),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(join_numbers(&set.numbers)),
            bonus,
        ]);
    }
    println!("{table}");

    if let Some(seed) = prediction.options.seed {
        println!("Seed: {seed}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(used_full: bool, target: Option<i64>, found: bool) -> WindowInfo {
        WindowInfo {
            used_full_history: used_full,
            order: bingo_engine::window::HistoryOrder::NewestFirst,
            round_field: "seq".to_string(),
            target_round: target,
            target_found: found,
            target_index: None,
            requested_rounds: 30,
            history_size: 100,
            window_size: 30,
        }
    }

    #[test]
    fn test_join_numbers() {
        assert_eq!(join_numbers(&[3, 14, 45]), " 3 - 14 - 45");
    }

    #[test]
    fn test_describe_window() {
        assert_eq!(describe_window(&info(true, None, false)), "full history (30 rounds)");
        assert_eq!(describe_window(&info(false, Some(120), true)), "30 rounds anchored on round 120");
        assert_eq!(describe_window(&info(false, Some(120), false)), "30 most recent rounds");
    }
}
