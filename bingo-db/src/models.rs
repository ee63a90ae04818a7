use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Highest number of the 6/45 game.
pub const NUMBER_RANGE_MAX: u8 = 45;

/// Main numbers drawn per round (the bonus is extra).
pub const MAIN_COUNT: usize = 6;

/// One historical draw.
///
/// Numbers are optional so that partially filled rows coming from callers can
/// still be carried through the engine; storage only ever writes complete rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RoundRecord", into = "RoundRecord")]
pub struct Round {
    pub seq: u32,
    pub numbers: [Option<u8>; MAIN_COUNT],
    pub bonus: Option<u8>,
    /// Keys of the wire record that are not part of the draw itself.
    pub extra: BTreeMap<String, Value>,
}

/// Wire shape: `{ "seq": 1, "no1": .., "no6": .., "no7": null, ... }`.
///
/// Numbers that are not whole or do not fit are read as absent; text where a
/// number belongs is still an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoundRecord {
    #[serde(default, deserialize_with = "de_seq")]
    seq: u32,
    #[serde(default, deserialize_with = "de_number")]
    no1: Option<u8>,
    #[serde(default, deserialize_with = "de_number")]
    no2: Option<u8>,
    #[serde(default, deserialize_with = "de_number")]
    no3: Option<u8>,
    #[serde(default, deserialize_with = "de_number")]
    no4: Option<u8>,
    #[serde(default, deserialize_with = "de_number")]
    no5: Option<u8>,
    #[serde(default, deserialize_with = "de_number")]
    no6: Option<u8>,
    #[serde(default, deserialize_with = "de_number")]
    no7: Option<u8>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn whole(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}

fn de_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    let v = Option::<f64>::deserialize(d)?;
    Ok(v.and_then(whole).and_then(|n| u8::try_from(n).ok()))
}

fn de_seq<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let v = Option::<f64>::deserialize(d)?;
    Ok(v.and_then(whole).and_then(|n| u32::try_from(n).ok()).unwrap_or_default())
}

impl From<RoundRecord> for Round {
    fn from(r: RoundRecord) -> Self {
        Round {
            seq: r.seq,
            numbers: [r.no1, r.no2, r.no3, r.no4, r.no5, r.no6],
            bonus: r.no7,
            extra: r.extra,
        }
    }
}

impl From<Round> for RoundRecord {
    fn from(r: Round) -> Self {
        let [no1, no2, no3, no4, no5, no6] = r.numbers;
        RoundRecord {
            seq: r.seq,
            no1,
            no2,
            no3,
            no4,
            no5,
            no6,
            no7: r.bonus,
            extra: r.extra,
        }
    }
}

impl Round {
    pub fn new(seq: u32, numbers: [u8; MAIN_COUNT], bonus: Option<u8>) -> Self {
        Round {
            seq,
            numbers: numbers.map(Some),
            bonus,
            extra: BTreeMap::new(),
        }
    }

    /// Present main numbers, bonus excluded.
    pub fn main_numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.numbers.iter().flatten().copied()
    }

    /// Present main numbers followed by the bonus, if any.
    pub fn all_numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.main_numbers().chain(self.bonus)
    }

    /// Resolves a named field to an integer.
    ///
    /// Explicit keys carried in `extra` win; otherwise `seq` and `round` both
    /// name the sequence number and `no1`..`no7` name the drawn numbers.
    pub fn field_value(&self, name: &str) -> Option<i64> {
        if let Some(v) = self.extra.get(name) {
            return v.as_i64();
        }
        match name {
            "seq" | "round" => Some(self.seq as i64),
            "no7" | "bonus" => self.bonus.map(i64::from),
            _ => {
                let idx: usize = name.strip_prefix("no")?.parse().ok()?;
                if (1..=MAIN_COUNT).contains(&idx) {
                    self.numbers[idx - 1].map(i64::from)
                } else {
                    None
                }
            }
        }
    }

    pub fn sorted_numbers(&self) -> Vec<u8> {
        let mut nums: Vec<u8> = self.main_numbers().collect();
        nums.sort();
        nums
    }
}

pub fn validate_round(round: &Round, range_max: u8) -> Result<()> {
    if round.seq == 0 {
        bail!("Round sequence must be positive");
    }
    for (i, n) in round.numbers.iter().enumerate() {
        match n {
            None => bail!("Round {}: no{} is missing", round.seq, i + 1),
            Some(n) if *n < 1 || *n > range_max => {
                bail!("Round {}: number {} out of range (1-{})", round.seq, n, range_max)
            }
            _ => {}
        }
    }
    let nums: Vec<u8> = round.main_numbers().collect();
    for i in 0..nums.len() {
        for j in (i + 1)..nums.len() {
            if nums[i] == nums[j] {
                bail!("Round {}: duplicate number {}", round.seq, nums[i]);
            }
        }
    }
    if let Some(b) = round.bonus {
        if b < 1 || b > range_max {
            bail!("Round {}: bonus {} out of range (1-{})", round.seq, b, range_max);
        }
        if nums.contains(&b) {
            bail!("Round {}: bonus {} repeats a main number", round.seq, b);
        }
    }
    Ok(())
}
