//! Outcome statistics and per-date outcome labeling.

use crate::domain::outcome::{Outcome, OutcomeRecord};
use crate::domain::price_bar::PriceBar;

/// Share of each outcome among opened positions, in percent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutcomeSummary {
    pub total_positions: usize,
    pub percent_profitable: f64,
    pub percent_unprofitable: f64,
    pub percent_liquidated: f64,
}

impl OutcomeSummary {
    /// Skipped outcomes are ignored. All percentages are 0 when no position
    /// was opened.
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Outcome>,
    {
        let mut profitable = 0usize;
        let mut unprofitable = 0usize;
        let mut liquidated = 0usize;

        for outcome in outcomes {
            match outcome {
                Outcome::Profitable => profitable += 1,
                Outcome::Unprofitable => unprofitable += 1,
                Outcome::Liquidated => liquidated += 1,
                Outcome::Skipped => {}
            }
        }

        let total_positions = profitable + unprofitable + liquidated;
        let percent = |count: usize| {
            if total_positions > 0 {
                count as f64 / total_positions as f64 * 100.0
            } else {
                0.0
            }
        };

        OutcomeSummary {
            total_positions,
            percent_profitable: percent(profitable),
            percent_unprofitable: percent(unprofitable),
            percent_liquidated: percent(liquidated),
        }
    }
}

pub fn summarize(records: &[OutcomeRecord]) -> OutcomeSummary {
    OutcomeSummary::from_outcomes(records.iter().map(|r| r.outcome))
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledBar {
    pub bar: PriceBar,
    pub outcome: Outcome,
}

/// Labels each bar with the outcome of the last record whose date range
/// contains it; bars no record covers are `Skipped`. Records are applied in
/// order, so later windows overwrite earlier ones on overlapping dates.
pub fn label_series(series: &[PriceBar], records: &[OutcomeRecord]) -> Vec<LabeledBar> {
    let mut labels = vec![Outcome::Skipped; series.len()];

    for record in records {
        let start = series.partition_point(|b| b.date < record.start_date);
        let end = series.partition_point(|b| b.date <= record.end_date);
        if start < end {
            labels[start..end].fill(record.outcome);
        }
    }

    series
        .iter()
        .zip(labels)
        .map(|(bar, outcome)| LabeledBar {
            bar: bar.clone(),
            outcome,
        })
        .collect()
}
