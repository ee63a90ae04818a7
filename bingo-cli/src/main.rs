mod display;
mod import;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bingo_db::db::{
    count_rounds, db_path, delete_round, fetch_recent_rounds, get_round, list_rounds, max_seq,
    upsert_round, SqliteStore,
};
use bingo_db::models::{validate_round, Round, MAIN_COUNT, NUMBER_RANGE_MAX};
use bingo_db::rusqlite::Connection;
use bingo_engine::analysis::analyze;
use bingo_engine::options::PredictOptions;
use bingo_engine::predict::generate_predictions_from_store;
use bingo_engine::window::select_window;

use crate::display::{display_import_summary, display_prediction, display_rounds, display_stats};

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "bingo", about = "6/45 draw history and number set generator")]
struct Cli {
    /// Database file (default: ./data/bingo.db)
    #[arg(long, global = true, env = "BINGO_DB")]
    db: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import rounds from a CSV file (seq,no1,...,no6[,no7])
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the database path
    DbPath,

    /// List stored rounds, newest first
    List {
        #[arg(short, long, default_value = "20")]
        limit: u32,

        #[arg(short, long, default_value = "0")]
        offset: u32,
    },

    /// Show one round
    Show { seq: u32 },

    /// Insert or replace a round
    Add {
        #[arg(long)]
        seq: u32,

        /// Six main numbers
        #[arg(long, num_args = MAIN_COUNT, required = true)]
        numbers: Vec<u8>,

        #[arg(long)]
        bonus: Option<u8>,
    },

    /// Delete a round
    Delete { seq: u32 },

    /// Frequency and skip per number over a window
    Stats {
        /// Window length (rounds)
        #[arg(short, long, default_value = "30")]
        window: usize,

        /// Anchor round; the window ends just before it
        #[arg(long)]
        target: Option<i64>,
    },

    /// Generate number sets
    Predict(PredictArgs),
}

#[derive(Args, Debug, Default)]
struct PredictArgs {
    /// JSON options file; flags below override its values
    #[arg(long)]
    options: Option<PathBuf>,

    /// Number of sets
    #[arg(short = 'n', long)]
    set_count: Option<usize>,

    #[arg(long)]
    numbers_per_set: Option<usize>,

    /// Also draw a bonus number per set
    #[arg(long)]
    bonus: bool,

    /// Rounds defining a non-exposed number
    #[arg(long)]
    non_exposed_rounds: Option<usize>,

    /// Minimum non-exposed numbers per set
    #[arg(long)]
    min_non_exposed: Option<usize>,

    /// Candidate pool size (clamped to 6-45)
    #[arg(short = 'k', long)]
    pool_size: Option<usize>,

    /// 7 or 10; selects the overlap threshold of the diversifier
    #[arg(long)]
    k_setting: Option<usize>,

    /// History window length (rounds)
    #[arg(short, long)]
    window: Option<usize>,

    #[arg(long)]
    no_chi_square: bool,

    #[arg(long)]
    no_central: bool,

    /// Softmax temperature (floor 0.1)
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Anchor round to predict for
    #[arg(long)]
    target: Option<i64>,

    /// Keep the anchor round inside the window
    #[arg(long)]
    include_target: bool,

    /// Drop sets overlapping an earlier one instead of keeping them
    #[arg(long)]
    strict: bool,
}

impl PredictArgs {
    fn to_options(&self) -> Result<PredictOptions> {
        let mut opts = match &self.options {
            Some(path) => {
                let body = std::fs::read_to_string(path)
                    .with_context(|| format!("Cannot read options file {:?}", path))?;
                PredictOptions::from_json(&body)?
            }
            None => PredictOptions::default(),
        };

        if let Some(v) = self.set_count { opts.set_count = v; }
        if let Some(v) = self.numbers_per_set { opts.numbers_per_set = v; }
        if let Some(v) = self.non_exposed_rounds { opts.non_exposed_rounds = v; }
        if let Some(v) = self.min_non_exposed { opts.min_non_exposed_count = v; }
        if let Some(v) = self.pool_size { opts.candidate_pool_size = v; }
        if let Some(v) = self.k_setting { opts.k_setting = v; }
        if let Some(v) = self.window { opts.history_rounds = v; }
        if let Some(v) = self.temperature { opts.temperature = v; }
        if self.seed.is_some() { opts.seed = self.seed; }
        if self.target.is_some() { opts.target_round = self.target; }
        if self.bonus { opts.include_bonus = true; }
        if self.no_chi_square { opts.chi_square_weighting = false; }
        if self.no_central { opts.central_interval_weighting = false; }
        if self.include_target { opts.exclude_current_from_window = false; }
        if self.strict { opts.strict_diversify = true; }

        Ok(opts)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = resolve_db_path(&cli);
    if let Command::DbPath = cli.command {
        println!("{}", path.display());
        return Ok(());
    }

    let store = SqliteStore::open(&path)?;
    let conn = store.conn();

    match cli.command {
        Command::DbPath => Ok(()),
        Command::Import { file } => cmd_import(conn, &file),
        Command::List { limit, offset } => cmd_list(conn, limit, offset, cli.format),
        Command::Show { seq } => cmd_show(conn, seq, cli.format),
        Command::Add { seq, numbers, bonus } => cmd_add(conn, seq, &numbers, bonus),
        Command::Delete { seq } => cmd_delete(conn, seq),
        Command::Stats { window, target } => cmd_stats(conn, window, target, cli.format),
        Command::Predict(args) => cmd_predict(&store, &args, cli.format),
    }
}

fn resolve_db_path(cli: &Cli) -> PathBuf {
    cli.db.clone().unwrap_or_else(db_path)
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, limit: u32, offset: u32, format: OutputFormat) -> Result<()> {
    let (rounds, total) = list_rounds(conn, limit, offset)?;
    if format == OutputFormat::Json {
        let body = serde_json::json!({ "rows": rounds, "total": total, "limit": limit, "offset": offset });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    if total == 0 {
        println!("Empty database. Run first: bingo import --file <csv>");
        return Ok(());
    }
    display_rounds(&rounds);
    let latest = max_seq(conn)?.unwrap_or_default();
    println!("{} of {} rounds (offset {}, latest round {})", rounds.len(), total, offset, latest);
    Ok(())
}

fn cmd_show(conn: &Connection, seq: u32, format: OutputFormat) -> Result<()> {
    let Some(round) = get_round(conn, seq)? else {
        bail!("Round {} not found", seq);
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&round)?),
        OutputFormat::Table => display_rounds(&[round]),
    }
    Ok(())
}

fn cmd_add(conn: &Connection, seq: u32, numbers: &[u8], bonus: Option<u8>) -> Result<()> {
    let numbers: [u8; MAIN_COUNT] = numbers
        .try_into()
        .with_context(|| format!("Expected exactly {} numbers", MAIN_COUNT))?;
    let round = Round::new(seq, numbers, bonus);
    validate_round(&round, NUMBER_RANGE_MAX)?;

    upsert_round(conn, seq, &round)?;
    info!(seq, "round saved");
    display_rounds(&[round]);
    Ok(())
}

fn cmd_delete(conn: &Connection, seq: u32) -> Result<()> {
    if !delete_round(conn, seq)? {
        bail!("Round {} not found", seq);
    }
    info!(seq, "round deleted");
    Ok(())
}

fn cmd_stats(conn: &Connection, window: usize, target: Option<i64>, format: OutputFormat) -> Result<()> {
    let n = count_rounds(conn)?;
    if n == 0 {
        println!("Empty database. Run first: bingo import --file <csv>");
        return Ok(());
    }
    let opts = PredictOptions {
        history_rounds: window,
        target_round: target,
        round_field: "seq".to_string(),
        ..Default::default()
    };
    let history = fetch_recent_rounds(conn, n)?;
    let (rounds, info) = select_window(&history, &opts);
    let stats = analyze(&rounds, opts.number_range_max).number_stats();

    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "windowInfo": info, "numbers": stats });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Table => display_stats(&stats, &info),
    }
    Ok(())
}

fn cmd_predict(store: &SqliteStore, args: &PredictArgs, format: OutputFormat) -> Result<()> {
    let opts = args.to_options()?;
    let prediction = generate_predictions_from_store(store, &opts)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prediction)?),
        OutputFormat::Table => display_prediction(&prediction),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_predict_flags() {
        let cli = Cli::try_parse_from([
            "bingo", "predict", "-n", "3", "-k", "10", "--seed", "7", "--target", "1100", "--strict",
        ])
        .unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        let opts = args.to_options().unwrap();
        assert_eq!(opts.set_count, 3);
        assert_eq!(opts.candidate_pool_size, 10);
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.target_round, Some(1100));
        assert!(opts.strict_diversify);
        assert!(opts.exclude_current_from_window);
    }

    #[test]
    fn test_cli_requires_six_numbers() {
        assert!(Cli::try_parse_from(["bingo", "add", "--seq", "1", "--numbers", "1", "2", "3"]).is_err());
        assert!(Cli::try_parse_from([
            "bingo", "add", "--seq", "1", "--numbers", "1", "2", "3", "4", "5", "6", "--bonus", "7",
        ])
        .is_ok());
    }

    #[test]
    fn test_db_path_resolution() {
        let cli = Cli::try_parse_from(["bingo", "--db", "/tmp/rounds.db", "db-path"]).unwrap();
        assert_eq!(resolve_db_path(&cli), PathBuf::from("/tmp/rounds.db"));
        assert!(matches!(cli.command, Command::DbPath));
    }

    #[test]
    fn test_add_rejects_invalid_round() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(cmd_add(store.conn(), 1, &[1, 1, 2, 3, 4, 5], None).is_err());
        assert!(cmd_add(store.conn(), 1, &[1, 2, 3, 4, 5, 6], Some(7)).is_ok());
        assert_eq!(count_rounds(store.conn()).unwrap(), 1);
    }
}
