use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::Round;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rounds (
    seq         INTEGER PRIMARY KEY,
    no1         INTEGER NOT NULL,
    no2         INTEGER NOT NULL,
    no3         INTEGER NOT NULL,
    no4         INTEGER NOT NULL,
    no5         INTEGER NOT NULL,
    no6         INTEGER NOT NULL,
    no7         INTEGER,
    created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
";

const SELECT_COLUMNS: &str = "seq, no1, no2, no3, no4, no5, no6, no7, created_at";

/// Storage collaborator consumed by the prediction engine.
pub trait RoundStore {
    /// The `n` most recent rounds, newest first.
    fn recent_rounds(&self, n: u32) -> Result<Vec<Round>>;
    fn round_by_seq(&self, seq: u32) -> Result<Option<Round>>;
    fn upsert_round(&self, round: &Round) -> Result<bool>;
}

pub fn db_path() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("bingo.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Cannot open database {:?}", path))?;
    debug!(path = %path.display(), "database opened");
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Migration failed")?;
    Ok(())
}

fn row_to_round(row: &Row<'_>) -> rusqlite::Result<Round> {
    let mut round = Round {
        seq: row.get(0)?,
        numbers: [
            row.get::<_, Option<u8>>(1)?,
            row.get::<_, Option<u8>>(2)?,
            row.get::<_, Option<u8>>(3)?,
            row.get::<_, Option<u8>>(4)?,
            row.get::<_, Option<u8>>(5)?,
            row.get::<_, Option<u8>>(6)?,
        ],
        bonus: row.get(7)?,
        ..Round::default()
    };
    let created_at: String = row.get(8)?;
    round.extra.insert("created_at".to_string(), Value::from(created_at));
    Ok(round)
}

pub fn insert_round(conn: &Connection, round: &Round) -> Result<bool> {
    let n = round.numbers;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO rounds (seq, no1, no2, no3, no4, no5, no6, no7)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![round.seq, n[0], n[1], n[2], n[3], n[4], n[5], round.bonus],
    ).with_context(|| format!("Insert of round {} failed", round.seq))?;
    Ok(changed > 0)
}

pub fn upsert_round(conn: &Connection, seq: u32, round: &Round) -> Result<bool> {
    let n = round.numbers;
    conn.execute(
        "INSERT INTO rounds (seq, no1, no2, no3, no4, no5, no6, no7)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(seq) DO UPDATE SET
             no1 = excluded.no1, no2 = excluded.no2, no3 = excluded.no3,
             no4 = excluded.no4, no5 = excluded.no5, no6 = excluded.no6,
             no7 = excluded.no7",
        rusqlite::params![seq, n[0], n[1], n[2], n[3], n[4], n[5], round.bonus],
    ).with_context(|| format!("Upsert of round {} failed", seq))?;
    Ok(true)
}

pub fn update_round(conn: &Connection, seq: u32, round: &Round) -> Result<bool> {
    let n = round.numbers;
    let changed = conn.execute(
        "UPDATE rounds SET no1 = ?1, no2 = ?2, no3 = ?3, no4 = ?4, no5 = ?5, no6 = ?6, no7 = ?7
         WHERE seq = ?8",
        rusqlite::params![n[0], n[1], n[2], n[3], n[4], n[5], round.bonus, seq],
    ).with_context(|| format!("Update of round {} failed", seq))?;
    Ok(changed > 0)
}

pub fn delete_round(conn: &Connection, seq: u32) -> Result<bool> {
    let changed = conn.execute("DELETE FROM rounds WHERE seq = ?1", [seq])
        .with_context(|| format!("Delete of round {} failed", seq))?;
    Ok(changed > 0)
}

pub fn get_round(conn: &Connection, seq: u32) -> Result<Option<Round>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM rounds WHERE seq = ?1");
    let round = conn.query_row(&sql, [seq], row_to_round).optional()?;
    Ok(round)
}

/// A page of rounds, newest first, plus the total row count.
pub fn list_rounds(conn: &Connection, limit: u32, offset: u32) -> Result<(Vec<Round>, u32)> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM rounds ORDER BY seq DESC LIMIT ?1 OFFSET ?2");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit, offset], row_to_round)?
        .collect::<Result<Vec<_>, _>>()?;
    let total = count_rounds(conn)?;
    Ok((rows, total))
}

pub fn fetch_recent_rounds(conn: &Connection, limit: u32) -> Result<Vec<Round>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM rounds ORDER BY seq DESC LIMIT ?1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit], row_to_round)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_rounds(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM rounds", [], |row| row.get(0))?;
    Ok(count)
}

pub fn max_seq(conn: &Connection) -> Result<Option<u32>> {
    let max: Option<u32> = conn.query_row("SELECT MAX(seq) FROM rounds", [], |row| row.get(0))?;
    Ok(max)
}

/// SQLite-backed [`RoundStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_db(path)?;
        migrate(&conn)?;
        info!(path = %path.display(), "round store ready");
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Cannot open in-memory database")?;
        migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl RoundStore for SqliteStore {
    fn recent_rounds(&self, n: u32) -> Result<Vec<Round>> {
        fetch_recent_rounds(&self.conn, n)
    }

    fn round_by_seq(&self, seq: u32) -> Result<Option<Round>> {
        get_round(&self.conn, seq)
    }

    fn upsert_round(&self, round: &Round) -> Result<bool> {
        upsert_round(&self.conn, round.seq, round)
    }
}
