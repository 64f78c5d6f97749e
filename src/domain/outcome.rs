//! Window outcome classification and the per-window record.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Profitable,
    Unprofitable,
    Liquidated,
    Skipped,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [
        Outcome::Profitable,
        Outcome::Unprofitable,
        Outcome::Liquidated,
        Outcome::Skipped,
    ];

    /// Label used in exported files.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Profitable => "PROFITABLE",
            Outcome::Unprofitable => "UNPROFITABLE",
            Outcome::Liquidated => "LIQUIDATED",
            Outcome::Skipped => "SKIPPED",
        }
    }

    pub fn is_position(&self) -> bool {
        !matches!(self, Outcome::Skipped)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::ALL
            .into_iter()
            .find(|o| o.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown outcome '{s}'"))
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Result of simulating one window. `liquidated_at_price` is 0 unless the
/// outcome is `Liquidated`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub outcome: Outcome,
    pub open_price: f64,
    pub close_price: f64,
    pub liquidated_at_price: f64,
}

impl OutcomeRecord {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
