#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use spreadtester::domain::condition::{Condition, ConditionFactors};
use spreadtester::domain::error::SpreadtesterError;
pub use spreadtester::domain::price_bar::{Asset, PriceBar};
use spreadtester::ports::data_port::MarketDataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<Asset, Vec<PriceBar>>,
    pub errors: HashMap<Asset, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, asset: Asset, bars: Vec<PriceBar>) -> Self {
        self.data.insert(asset, bars);
        self
    }

    pub fn with_error(mut self, asset: Asset, reason: &str) -> Self {
        self.errors.insert(asset, reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn load_series(&self, asset: Asset) -> Result<Vec<PriceBar>, SpreadtesterError> {
        if let Some(reason) = self.errors.get(&asset) {
            return Err(SpreadtesterError::DataContract {
                source_name: asset.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(&asset).cloned().unwrap_or_default())
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn make_bar(day: i64, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
    PriceBar::new(start_date() + Duration::days(day), open, high, low, close)
}

/// Bars that open, trade and close at `price` every day.
pub fn flat_series(len: usize, price: f64) -> Vec<PriceBar> {
    (0..len as i64)
        .map(|d| make_bar(d, price, price, price, price))
        .collect()
}

/// One bar per close with open = high = low = close.
pub fn series_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(d, &c)| make_bar(d as i64, c, c, c, c))
        .collect()
}

pub fn condor(period_days: usize) -> Condition {
    Condition::new(
        0.0,
        period_days,
        ConditionFactors {
            profit_below: Some(0.1),
            profit_above: Some(0.1),
            liquidate_below: Some(0.2),
            liquidate_above: Some(0.2),
        },
    )
    .unwrap()
}

pub fn bull_put(period_days: usize) -> Condition {
    Condition::new(
        0.0,
        period_days,
        ConditionFactors {
            profit_above: Some(0.1),
            liquidate_above: Some(0.2),
            ..ConditionFactors::default()
        },
    )
    .unwrap()
}
