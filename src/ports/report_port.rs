//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SpreadtesterError;
use std::path::Path;

/// Port for writing backtest outputs.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SpreadtesterError>;
}
