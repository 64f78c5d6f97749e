//! Position conditions: profit and liquidation bounds derived from an open
//! price and percentage factors.
//!
//! A `Condition` is an immutable value. Each simulated window derives its own
//! condition from the template via [`Condition::reopen`], so windows never
//! share mutable bound state and can be evaluated in any order.

use crate::domain::bound::Bound;
use crate::domain::error::ConditionError;
use crate::domain::outcome::Outcome;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyType {
    LongCondor,
    BullPutSpread,
    BearCallSpread,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyType::LongCondor => "Long Condor",
            StrategyType::BullPutSpread => "Bull Put Spread",
            StrategyType::BearCallSpread => "Bear Call Spread",
        };
        f.write_str(name)
    }
}

/// Fractional distances from the open price. `0.1` means 10%.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConditionFactors {
    pub profit_below: Option<f64>,
    pub profit_above: Option<f64>,
    pub liquidate_below: Option<f64>,
    pub liquidate_above: Option<f64>,
}

impl ConditionFactors {
    fn validate(&self) -> Result<(), ConditionError> {
        let named = [
            ("profit_below", self.profit_below),
            ("profit_above", self.profit_above),
            ("liquidate_below", self.liquidate_below),
            ("liquidate_above", self.liquidate_above),
        ];
        for (name, factor) in named {
            if let Some(value) = factor.filter(|v| !v.is_finite() || *v < 0.0) {
                return Err(ConditionError::InvalidFactor { name, value });
            }
        }
        Ok(())
    }

    fn strategy(&self) -> Result<StrategyType, ConditionError> {
        match (self.profit_below, self.profit_above) {
            (Some(_), Some(_)) => Ok(StrategyType::LongCondor),
            (None, Some(_)) => Ok(StrategyType::BullPutSpread),
            (Some(_), None) => Ok(StrategyType::BearCallSpread),
            (None, None) => Err(ConditionError::NoProfitBound),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    open_price: f64,
    period_days: usize,
    factors: ConditionFactors,
    strategy: StrategyType,
    profit_bound: Bound,
    liquidate_bound: Bound,
}

impl Condition {
    pub fn new(
        open_price: f64,
        period_days: usize,
        factors: ConditionFactors,
    ) -> Result<Self, ConditionError> {
        if period_days == 0 {
            return Err(ConditionError::ZeroPeriod);
        }
        if !open_price.is_finite() {
            return Err(ConditionError::InvalidOpenPrice(open_price));
        }
        factors.validate()?;
        let strategy = factors.strategy()?;
        Ok(Self::derive(open_price, period_days, factors, strategy))
    }

    fn derive(
        open_price: f64,
        period_days: usize,
        factors: ConditionFactors,
        strategy: StrategyType,
    ) -> Self {
        let below = |f: Option<f64>| f.map(|x| open_price * (1.0 - x));
        let above = |f: Option<f64>| f.map(|x| open_price * (1.0 + x));
        Self {
            open_price,
            period_days,
            factors,
            strategy,
            profit_bound: Bound::inside(below(factors.profit_below), above(factors.profit_above)),
            liquidate_bound: Bound::outside(
                below(factors.liquidate_below),
                above(factors.liquidate_above),
            ),
        }
    }

    /// Same period and factors around a new open price.
    pub fn reopen(&self, new_open_price: f64) -> Condition {
        Self::derive(new_open_price, self.period_days, self.factors, self.strategy)
    }

    /// Liquidation takes priority over profitability. Never returns `Skipped`.
    pub fn classify(&self, current_price: f64) -> Outcome {
        if self.liquidate_bound.contains(current_price) {
            Outcome::Liquidated
        } else if self.profit_bound.contains(current_price) {
            Outcome::Profitable
        } else {
            Outcome::Unprofitable
        }
    }

    pub fn open_price(&self) -> f64 {
        self.open_price
    }

    pub fn period_days(&self) -> usize {
        self.period_days
    }

    pub fn factors(&self) -> &ConditionFactors {
        &self.factors
    }

    pub fn strategy(&self) -> StrategyType {
        self.strategy
    }

    pub fn profit_bound(&self) -> &Bound {
        &self.profit_bound
    }

    pub fn liquidate_bound(&self) -> &Bound {
        &self.liquidate_bound
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Condition(")?;
        writeln!(f, "    profit_bound={},", self.profit_bound)?;
        writeln!(f, "    liquidate_bound={},", self.liquidate_bound)?;
        writeln!(f, "    strategy={},", self.strategy)?;
        writeln!(f, "    period_days={}", self.period_days)?;
        write!(f, ")")
    }
}
