//! CSV exports of backtest results.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SpreadtesterError;
use crate::domain::outcome::Outcome;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// One row per window: `start_date,end_date,outcome,open_price,close_price,liquidated_at_price`.
#[derive(Debug, Default)]
pub struct OutcomeCsvReport;

/// One row per bar with the outcome label covering its date.
#[derive(Debug, Default)]
pub struct LabeledSeriesCsvReport;

#[derive(Serialize)]
struct LabeledRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volatility: Option<f64>,
    fear_and_greed: Option<f64>,
    outcome: Outcome,
}

pub(crate) fn create_parent(path: &Path) -> Result<(), SpreadtesterError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl ReportPort for OutcomeCsvReport {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SpreadtesterError> {
        create_parent(output_path)?;
        let mut writer = csv::Writer::from_path(output_path)?;
        for record in &result.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ReportPort for LabeledSeriesCsvReport {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SpreadtesterError> {
        create_parent(output_path)?;
        let mut writer = csv::Writer::from_path(output_path)?;
        for labeled in result.labeled_series() {
            let bar = labeled.bar;
            writer.serialize(LabeledRow {
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volatility: bar.volatility,
                fear_and_greed: bar.fear_and_greed,
                outcome: labeled.outcome,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}
