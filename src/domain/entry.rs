//! Entry decision seam between the backtest engine and callers.

use crate::domain::price_bar::PriceBar;
use crate::domain::rule::Rule;
use crate::domain::rule_eval::evaluate_latest;

/// Decides whether to open a position given the history visible before the
/// evaluation window. `lookback` may be empty.
pub trait EntrySignal {
    fn should_enter(&self, lookback: &[PriceBar]) -> bool;
}

impl<F> EntrySignal for F
where
    F: Fn(&[PriceBar]) -> bool,
{
    fn should_enter(&self, lookback: &[PriceBar]) -> bool {
        self(lookback)
    }
}

/// A parsed rule is evaluated on the latest lookback bar.
impl EntrySignal for Rule {
    fn should_enter(&self, lookback: &[PriceBar]) -> bool {
        evaluate_latest(self, lookback)
    }
}

/// Opens a position on every window, including those with empty lookback.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysEnter;

impl EntrySignal for AlwaysEnter {
    fn should_enter(&self, _lookback: &[PriceBar]) -> bool {
        true
    }
}
