//! Configuration validation.
//!
//! Checks every field a backtest needs before any data is loaded, reporting
//! the first problem found with its section and key.

use crate::domain::condition::{Condition, ConditionFactors};
use crate::domain::error::SpreadtesterError;
use crate::domain::price_bar::Asset;
use crate::domain::rule::Rule;
use crate::domain::rule_parser;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const FACTOR_KEYS: [&str; 4] = [
    "profit_below",
    "profit_above",
    "liquidate_below",
    "liquidate_above",
];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SpreadtesterError> {
    let asset = parse_asset(config)?;
    parse_start_from(config)?;
    parse_entry_rule(config)?;
    validate_condition_config(config)?;
    validate_data_config(config, asset)?;
    Ok(())
}

/// Builds the condition template (open price 1) so that factor combinations
/// the domain rejects are reported here.
pub fn validate_condition_config(config: &dyn ConfigPort) -> Result<(), SpreadtesterError> {
    let period_days = parse_period_days(config)?;
    let factors = parse_factors(config)?;
    Condition::new(1.0, period_days, factors)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort, asset: Asset) -> Result<(), SpreadtesterError> {
    require(config, "data", "fear_and_greed")?;
    require(config, "data", &format!("{}_prices", asset.data_prefix()))?;
    require(config, "data", &format!("{}_volatility", asset.data_prefix()))?;
    parse_delimiter(config)?;
    Ok(())
}

pub fn parse_asset(config: &dyn ConfigPort) -> Result<Asset, SpreadtesterError> {
    let value = require(config, "backtest", "asset")?;
    value
        .parse::<Asset>()
        .map_err(|reason| invalid("backtest", "asset", reason))
}

pub fn parse_start_from(config: &dyn ConfigPort) -> Result<Option<NaiveDate>, SpreadtesterError> {
    match config.get_non_empty("backtest", "start_from") {
        None => Ok(None),
        Some(s) => parse_date(&s)
            .map(Some)
            .map_err(|_| invalid("backtest", "start_from", "expected YYYY-MM-DD")),
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
}

/// `None` when no rule is configured; the backtest then enters on every window.
pub fn parse_entry_rule(config: &dyn ConfigPort) -> Result<Option<Rule>, SpreadtesterError> {
    match config.get_non_empty("backtest", "entry_rule") {
        None => Ok(None),
        Some(text) => Ok(Some(rule_parser::parse(&text)?)),
    }
}

pub fn parse_period_days(config: &dyn ConfigPort) -> Result<usize, SpreadtesterError> {
    let value = require(config, "condition", "period_days")?;
    let days: i64 = value
        .parse()
        .map_err(|_| invalid("condition", "period_days", "must be an integer"))?;
    if days < 1 {
        return Err(invalid("condition", "period_days", "must be at least 1"));
    }
    usize::try_from(days).map_err(|_| invalid("condition", "period_days", "out of range"))
}

pub fn parse_factors(config: &dyn ConfigPort) -> Result<ConditionFactors, SpreadtesterError> {
    let [profit_below, profit_above, liquidate_below, liquidate_above] = FACTOR_KEYS;
    Ok(ConditionFactors {
        profit_below: parse_factor(config, profit_below)?,
        profit_above: parse_factor(config, profit_above)?,
        liquidate_below: parse_factor(config, liquidate_below)?,
        liquidate_above: parse_factor(config, liquidate_above)?,
    })
}

fn parse_factor(config: &dyn ConfigPort, key: &str) -> Result<Option<f64>, SpreadtesterError> {
    let Some(value) = config.get_non_empty("condition", key) else {
        return Ok(None);
    };
    let factor: f64 = value
        .parse()
        .map_err(|_| invalid("condition", key, "must be a number"))?;
    if !factor.is_finite() || factor < 0.0 {
        return Err(invalid("condition", key, "must be a finite, non-negative number"));
    }
    Ok(Some(factor))
}

/// Delimiter of the volatility CSVs. `;` and `#` open INI comments, so the
/// common separators are spelled out.
pub fn parse_delimiter(config: &dyn ConfigPort) -> Result<u8, SpreadtesterError> {
    let Some(value) = config.get_non_empty("data", "volatility_delimiter") else {
        return Ok(b',');
    };
    match value.to_lowercase().as_str() {
        "comma" => Ok(b','),
        "semicolon" => Ok(b';'),
        "tab" => Ok(b'\t'),
        "pipe" => Ok(b'|'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        _ => Err(invalid(
            "data",
            "volatility_delimiter",
            "expected comma, semicolon, tab, pipe or a single character",
        )),
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SpreadtesterError> {
    config
        .get_non_empty(section, key)
        .ok_or_else(|| SpreadtesterError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SpreadtesterError {
    SpreadtesterError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::error::ConditionError;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = r#"
[backtest]
name = condor
asset = eth
start_from = 2020-01-01
entry_rule = AND(BELOW(fear_and_greed, 70), BELOW(volatility, 90))

[condition]
period_days = 14
profit_below = 0.1
profit_above = 0.1
liquidate_below = 0.2
liquidate_above = 0.2

[data]
fear_and_greed = fng.csv
ethereum_prices = eth.csv
ethereum_volatility = eth-vol.csv
volatility_delimiter = semicolon
"#;

    fn condition_only(body: &str) -> FileConfigAdapter {
        make_config(&format!("[condition]\n{body}"))
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_backtest_config(&make_config(VALID)).is_ok());
    }

    #[test]
    fn missing_asset_fails() {
        let config = make_config(&VALID.replace("asset = eth\n", ""));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigMissing { key, .. } if key == "asset"));
    }

    #[test]
    fn unknown_asset_fails() {
        let config = make_config(&VALID.replace("asset = eth", "asset = doge"));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigInvalid { key, .. } if key == "asset"));
    }

    #[test]
    fn bad_start_from_fails() {
        let config = make_config(&VALID.replace("2020-01-01", "01/01/2020"));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigInvalid { key, .. } if key == "start_from"));
    }

    #[test]
    fn start_from_is_optional() {
        let config = make_config(&VALID.replace("start_from = 2020-01-01\n", ""));
        assert_eq!(parse_start_from(&config).unwrap(), None);
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn bad_entry_rule_is_a_rule_error() {
        let config = make_config(&VALID.replace("BELOW(volatility, 90)", "BELOW(volatility 90)"));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SpreadtesterError::RuleParse(_)));
    }

    #[test]
    fn missing_entry_rule_means_none() {
        let config = make_config("[backtest]\nasset = btc\n");
        assert!(parse_entry_rule(&config).unwrap().is_none());
    }

    #[test]
    fn period_days_missing_fails() {
        let err = validate_condition_config(&condition_only("profit_above = 0.1\n")).unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigMissing { key, .. } if key == "period_days"));
    }

    #[test]
    fn period_days_zero_fails() {
        let err = validate_condition_config(&condition_only("period_days = 0\nprofit_above = 0.1\n"))
            .unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigInvalid { key, .. } if key == "period_days"));
    }

    #[test]
    fn period_days_not_integer_fails() {
        let err =
            validate_condition_config(&condition_only("period_days = 1.5\nprofit_above = 0.1\n"))
                .unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigInvalid { key, .. } if key == "period_days"));
    }

    #[test]
    fn negative_factor_fails() {
        let err = validate_condition_config(&condition_only(
            "period_days = 7\nprofit_above = 0.1\nliquidate_above = -0.2\n",
        ))
        .unwrap_err();
        assert!(
            matches!(err, SpreadtesterError::ConfigInvalid { key, .. } if key == "liquidate_above")
        );
    }

    #[test]
    fn non_numeric_factor_fails() {
        let err = validate_condition_config(&condition_only("period_days = 7\nprofit_below = ten\n"))
            .unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigInvalid { key, .. } if key == "profit_below"));
    }

    #[test]
    fn no_profit_factor_is_a_condition_error() {
        let err = validate_condition_config(&condition_only("period_days = 7\nliquidate_below = 0.2\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            SpreadtesterError::Condition(ConditionError::NoProfitBound)
        ));
    }

    #[test]
    fn factors_are_optional_individually() {
        let factors = parse_factors(&condition_only("period_days = 7\nprofit_above = 0.05\n")).unwrap();
        assert_eq!(factors.profit_above, Some(0.05));
        assert_eq!(factors.profit_below, None);
        assert_eq!(factors.liquidate_below, None);
        assert_eq!(factors.liquidate_above, None);
    }

    #[test]
    fn data_paths_follow_asset() {
        let config = make_config(&VALID.replace("asset = eth", "asset = btc"));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigMissing { key, .. } if key == "bitcoin_prices"));
    }

    #[test]
    fn missing_fear_and_greed_fails() {
        let config = make_config(&VALID.replace("fear_and_greed = fng.csv\n", ""));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SpreadtesterError::ConfigMissing { key, .. } if key == "fear_and_greed"));
    }

    #[test]
    fn delimiter_names() {
        assert_eq!(parse_delimiter(&make_config("[data]\n")).unwrap(), b',');
        assert_eq!(
            parse_delimiter(&make_config("[data]\nvolatility_delimiter = Semicolon\n")).unwrap(),
            b';'
        );
        assert_eq!(
            parse_delimiter(&make_config("[data]\nvolatility_delimiter = tab\n")).unwrap(),
            b'\t'
        );
        assert_eq!(
            parse_delimiter(&make_config("[data]\nvolatility_delimiter = pipe\n")).unwrap(),
            b'|'
        );
        let err = parse_delimiter(&make_config("[data]\nvolatility_delimiter = spaces\n")).unwrap_err();
        assert!(
            matches!(err, SpreadtesterError::ConfigInvalid { key, .. } if key == "volatility_delimiter")
        );
    }

    #[test]
    fn delimiter_single_character() {
        assert_eq!(
            parse_delimiter(&make_config("[data]\nvolatility_delimiter = |\n")).unwrap(),
            b'|'
        );
        assert_eq!(
            parse_delimiter(&make_config("[data]\nvolatility_delimiter = ^\n")).unwrap(),
            b'^'
        );
        assert!(parse_delimiter(&make_config("[data]\nvolatility_delimiter = é\n")).is_err());
    }
}
