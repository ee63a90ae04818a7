use anyhow::{Context, Result};
use bingo_db::rusqlite::Connection;
use std::path::Path;
use tracing::warn;

use bingo_db::db::{insert_round, upsert_round};
use bingo_db::models::{validate_round, Round, MAIN_COUNT, NUMBER_RANGE_MAX};

fn field(record: &csv::StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_record(record: &csv::StringRecord) -> Result<Round> {
    let get = |idx: usize| field(record, idx);

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx).with_context(|| format!("Missing field at index {}", idx))?;
        s.parse::<u8>()
            .with_context(|| format!("Cannot parse '{}' (index {})", s, idx))
    };

    let seq_str = get(0).context("Missing round number")?;
    let seq: u32 = seq_str
        .parse()
        .with_context(|| format!("Cannot parse round number '{}'", seq_str))?;

    let mut numbers = [0u8; MAIN_COUNT];
    for (i, n) in numbers.iter_mut().enumerate() {
        *n = get_u8(i + 1)?;
    }
    let bonus = match get(MAIN_COUNT + 1) {
        Some(_) => Some(get_u8(MAIN_COUNT + 1)?),
        None => None,
    };

    let round = Round::new(seq, numbers, bonus);
    validate_round(&round, NUMBER_RANGE_MAX)?;
    Ok(round)
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub updated: u32,
    pub errors: u32,
}

/// Loads `seq,no1,...,no6[,no7]` rows (header line expected). Existing rounds
/// are overwritten.
pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open {:?}", path))?;

    let tx = conn.unchecked_transaction()
        .context("Cannot start transaction")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        updated: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        let line = result.total_records;
        let round = match record_result {
            Ok(record) => parse_record(&record),
            Err(e) => Err(e.into()),
        };
        match round {
            Ok(round) => {
                let saved = insert_round(&tx, &round).and_then(|inserted| {
                    if inserted {
                        Ok(true)
                    } else {
                        upsert_round(&tx, round.seq, &round).map(|_| false)
                    }
                });
                match saved {
                    Ok(true) => result.inserted += 1,
                    Ok(false) => result.updated += 1,
                    Err(e) => {
                        warn!(line, error = %e, "insert failed");
                        result.errors += 1;
                    }
                }
            }
            Err(e) => {
                warn!(line, error = %e, "row rejected");
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Commit failed")?;
    Ok(result)
}
