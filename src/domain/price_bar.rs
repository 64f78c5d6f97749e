//! Daily price bar with aligned volatility and sentiment readings.

use crate::domain::error::SpreadtesterError;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volatility: Option<f64>,
    pub fear_and_greed: Option<f64>,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volatility: None,
            fear_and_greed: None,
        }
    }

    pub fn with_sentiment(mut self, volatility: f64, fear_and_greed: f64) -> Self {
        self.volatility = Some(volatility);
        self.fear_and_greed = Some(fear_and_greed);
        self
    }
}

/// Asset whose merged series is backtested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Btc,
    Eth,
}

impl Asset {
    pub const ALL: [Asset; 2] = [Asset::Btc, Asset::Eth];

    pub fn code(&self) -> &'static str {
        match self {
            Asset::Btc => "btc",
            Asset::Eth => "eth",
        }
    }

    /// Prefix of the asset's `[data]` keys, e.g. `bitcoin_prices`.
    pub fn data_prefix(&self) -> &'static str {
        match self {
            Asset::Btc => "bitcoin",
            Asset::Eth => "ethereum",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "btc" | "bitcoin" => Ok(Asset::Btc),
            "eth" | "ethereum" => Ok(Asset::Eth),
            other => Err(format!("unknown asset '{other}' (expected btc or eth)")),
        }
    }
}

/// Checks that dates are strictly ascending (sorted, no duplicates).
pub fn ensure_ordered(bars: &[PriceBar], source_name: &str) -> Result<(), SpreadtesterError> {
    for pair in bars.windows(2) {
        if pair[1].date <= pair[0].date {
            let reason = if pair[1].date == pair[0].date {
                format!("duplicate date {}", pair[1].date)
            } else {
                format!("date {} follows {}", pair[1].date, pair[0].date)
            };
            return Err(SpreadtesterError::DataContract {
                source_name: source_name.to_string(),
                reason,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32) -> PriceBar {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        PriceBar::new(date, 100.0, 110.0, 90.0, 105.0)
    }

    #[test]
    fn new_bar_has_no_sentiment() {
        let b = bar(1);
        assert!(b.volatility.is_none());
        assert!(b.fear_and_greed.is_none());
    }

    #[test]
    fn with_sentiment_sets_both_readings() {
        let b = bar(1).with_sentiment(55.5, 20.0);
        assert_eq!(b.volatility, Some(55.5));
        assert_eq!(b.fear_and_greed, Some(20.0));
    }

    #[test]
    fn asset_parses_aliases() {
        assert_eq!("BTC".parse::<Asset>().unwrap(), Asset::Btc);
        assert_eq!(" bitcoin ".parse::<Asset>().unwrap(), Asset::Btc);
        assert_eq!("Ethereum".parse::<Asset>().unwrap(), Asset::Eth);
        assert!("doge".parse::<Asset>().is_err());
    }

    #[test]
    fn ordered_series_passes() {
        assert!(ensure_ordered(&[bar(1), bar(2), bar(5)], "test").is_ok());
        assert!(ensure_ordered(&[], "test").is_ok());
    }

    #[test]
    fn duplicate_date_rejected() {
        let err = ensure_ordered(&[bar(1), bar(2), bar(2)], "btc").unwrap_err();
        match err {
            SpreadtesterError::DataContract { source_name, reason } => {
                assert_eq!(source_name, "btc");
                assert!(reason.contains("duplicate"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unsorted_series_rejected() {
        let err = ensure_ordered(&[bar(3), bar(2)], "eth").unwrap_err();
        assert!(matches!(err, SpreadtesterError::DataContract { .. }));
    }
}
