//! Market data access port trait.

use crate::domain::error::SpreadtesterError;
use crate::domain::price_bar::{Asset, PriceBar};
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Daily bars for `asset`, ascending by date with no duplicates.
    fn load_series(&self, asset: Asset) -> Result<Vec<PriceBar>, SpreadtesterError>;

    /// First date, last date and bar count, or `None` for an empty series.
    fn data_range(
        &self,
        asset: Asset,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SpreadtesterError> {
        let series = self.load_series(asset)?;
        Ok(match (series.first(), series.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, series.len())),
            _ => None,
        })
    }
}
