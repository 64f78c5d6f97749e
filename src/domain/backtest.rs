//! Backtest engine: one simulated position per window.
//!
//! For every bar `i` of the (optionally date-filtered) series the engine asks
//! the entry signal whether to open a position using only the lookback that
//! precedes the evaluation window, then walks the evaluation window day by
//! day looking for liquidation. Windows overlap; record `i` answers "what if
//! a position had been opened at the start of the window ending on bar `i`".
//!
//! BacktestConfig defines run parameters read from configuration.

use crate::domain::aggregate::{label_series, summarize, LabeledBar, OutcomeSummary};
use crate::domain::condition::Condition;
use crate::domain::entry::EntrySignal;
use crate::domain::outcome::{Outcome, OutcomeRecord};
use crate::domain::price_bar::{Asset, PriceBar};
use crate::domain::window::{self, Window};
use chrono::NaiveDate;
use log::{debug, info};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub name: String,
    pub asset: Asset,
    pub start_from: Option<NaiveDate>,
    pub parallel: bool,
}

pub struct BacktestEngine {
    template: Condition,
    start_from: Option<NaiveDate>,
}

impl BacktestEngine {
    pub fn new(template: Condition) -> Self {
        Self {
            template,
            start_from: None,
        }
    }

    /// Only bars dated on or after `date` take part in the run.
    pub fn starting_from(mut self, date: NaiveDate) -> Self {
        self.start_from = Some(date);
        self
    }

    pub fn template(&self) -> &Condition {
        &self.template
    }

    /// The part of `series` the run covers. Assumes ascending dates.
    pub fn filter<'a>(&self, series: &'a [PriceBar]) -> &'a [PriceBar] {
        match self.start_from {
            Some(start) => {
                let first = series.partition_point(|bar| bar.date < start);
                &series[first..]
            }
            None => series,
        }
    }

    pub fn run<E>(&self, series: &[PriceBar], entry: &E) -> Vec<OutcomeRecord>
    where
        E: EntrySignal + ?Sized,
    {
        let series = self.filter(series);
        let records: Vec<OutcomeRecord> = window::split(series)
            .map(|w| self.evaluate_window(w, entry))
            .collect();
        log_run(&records);
        records
    }

    /// Same records as [`run`](Self::run), with windows evaluated across the
    /// rayon pool and collected in index order.
    pub fn run_parallel<E>(&self, series: &[PriceBar], entry: &E) -> Vec<OutcomeRecord>
    where
        E: EntrySignal + Sync + ?Sized,
    {
        let series = self.filter(series);
        let records: Vec<OutcomeRecord> = (0..series.len())
            .into_par_iter()
            .map(|i| self.evaluate_window(window::window_at(series, i), entry))
            .collect();
        log_run(&records);
        records
    }

    fn evaluate_window<E>(&self, window: Window<'_>, entry: &E) -> OutcomeRecord
    where
        E: EntrySignal + ?Sized,
    {
        let period_days = self.template.period_days();
        let lookback = window.lookback(period_days);
        let bars = window.evaluation(period_days);

        // evaluation() is never empty for a valid window
        let first = &bars[0];
        let last = &bars[bars.len() - 1];

        let (outcome, liquidated_at_price) = if entry.should_enter(lookback) {
            let condition = self.template.reopen(first.open);
            scan_window(&condition, bars)
        } else {
            (Outcome::Skipped, 0.0)
        };

        OutcomeRecord {
            start_date: first.date,
            end_date: last.date,
            outcome,
            open_price: first.open,
            close_price: last.close,
            liquidated_at_price,
        }
    }
}

/// Walks `bars` in date order. The first bar whose low or high falls in the
/// liquidation zone ends the position; the low is reported when both do.
/// Otherwise the last close decides profitability.
pub fn scan_window(condition: &Condition, bars: &[PriceBar]) -> (Outcome, f64) {
    for bar in bars {
        let low_hit = condition.classify(bar.low) == Outcome::Liquidated;
        let high_hit = condition.classify(bar.high) == Outcome::Liquidated;
        if low_hit || high_hit {
            let price = if low_hit { bar.low } else { bar.high };
            debug!(
                "liquidated on {} at {:.4} (opened at {:.4})",
                bar.date,
                price,
                condition.open_price()
            );
            return (Outcome::Liquidated, price);
        }
    }
    match bars.last() {
        Some(last) => (condition.classify(last.close), 0.0),
        None => (Outcome::Skipped, 0.0),
    }
}

fn log_run(records: &[OutcomeRecord]) {
    let summary = summarize(records);
    info!(
        "backtested {} windows: {} positions, {:.1}% profitable, {:.1}% unprofitable, {:.1}% liquidated",
        records.len(),
        summary.total_positions,
        summary.percent_profitable,
        summary.percent_unprofitable,
        summary.percent_liquidated
    );
}

/// Output of a named run: the bars it covered and one record per window.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub name: String,
    pub series: Vec<PriceBar>,
    pub records: Vec<OutcomeRecord>,
}

impl BacktestResult {
    pub fn summary(&self) -> OutcomeSummary {
        summarize(&self.records)
    }

    pub fn labeled_series(&self) -> Vec<LabeledBar> {
        label_series(&self.series, &self.records)
    }
}

/// Runs `engine` over `series` and packages the result under `config.name`.
pub fn run_backtest<E>(
    engine: &BacktestEngine,
    series: &[PriceBar],
    entry: &E,
    config: &BacktestConfig,
) -> BacktestResult
where
    E: EntrySignal + Sync + ?Sized,
{
    let records = if config.parallel {
        engine.run_parallel(series, entry)
    } else {
        engine.run(series, entry)
    };
    BacktestResult {
        name: config.name.clone(),
        series: engine.filter(series).to_vec(),
        records,
    }
}
