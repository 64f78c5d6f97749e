//! Entry rule evaluation.
//!
//! Evaluates rules against a bar slice at a given index.
//!
//! # Evaluation Semantics
//!
//! - Comparison rules: Evaluate at the given bar index
//! - Missing readings (no volatility, no previous bar for `change`) resolve to
//!   NaN, so every comparison involving them is `false`
//! - `CROSS_ABOVE`/`CROSS_BELOW`: Require `index >= 1`, return `false` at index 0
//! - `AND`: Short-circuits on first `false`
//! - `OR`: Short-circuits on first `true`
//! - `CONSECUTIVE(rule, N)`: Child must be true for N consecutive bars ending at current
//! - `ANY_OF(rule, N)`: Child must be true at least once in the last N bars

use crate::domain::price_bar::PriceBar;
use crate::domain::rule::{Operand, Rule};

const EPSILON: f64 = 1e-9;

pub fn evaluate(rule: &Rule, bars: &[PriceBar], bar_index: usize) -> bool {
    match rule {
        Rule::CrossAbove { left, right } => {
            if bar_index == 0 {
                return false;
            }
            let left_curr = resolve_operand(left, bars, bar_index);
            let right_curr = resolve_operand(right, bars, bar_index);
            let left_prev = resolve_operand(left, bars, bar_index - 1);
            let right_prev = resolve_operand(right, bars, bar_index - 1);

            left_curr > right_curr && left_prev <= right_prev
        }
        Rule::CrossBelow { left, right } => {
            if bar_index == 0 {
                return false;
            }
            let left_curr = resolve_operand(left, bars, bar_index);
            let right_curr = resolve_operand(right, bars, bar_index);
            let left_prev = resolve_operand(left, bars, bar_index - 1);
            let right_prev = resolve_operand(right, bars, bar_index - 1);

            left_curr < right_curr && left_prev >= right_prev
        }
        Rule::Above { left, right } => {
            resolve_operand(left, bars, bar_index) > resolve_operand(right, bars, bar_index)
        }
        Rule::Below { left, right } => {
            resolve_operand(left, bars, bar_index) < resolve_operand(right, bars, bar_index)
        }
        Rule::Between {
            operand,
            lower,
            upper,
        } => {
            let val = resolve_operand(operand, bars, bar_index);
            val >= *lower && val <= *upper
        }
        Rule::Equals { left, right } => {
            let left_val = resolve_operand(left, bars, bar_index);
            let right_val = resolve_operand(right, bars, bar_index);
            (left_val - right_val).abs() < EPSILON
        }
        Rule::And(rules) => rules.iter().all(|r| evaluate(r, bars, bar_index)),
        Rule::Or(rules) => rules.iter().any(|r| evaluate(r, bars, bar_index)),
        Rule::Not(rule) => !evaluate(rule, bars, bar_index),
        Rule::Consecutive { rule, count } => {
            if bar_index + 1 < *count {
                return false;
            }
            ((bar_index + 1 - *count)..=bar_index).all(|i| evaluate(rule, bars, i))
        }
        Rule::AnyOf { rule, count } => {
            let start = bar_index.saturating_sub(count.saturating_sub(1));
            (start..=bar_index).any(|i| evaluate(rule, bars, i))
        }
    }
}

/// Evaluates `rule` on the most recent bar of `bars`. An empty slice has no
/// bar to evaluate and yields `false`.
pub fn evaluate_latest(rule: &Rule, bars: &[PriceBar]) -> bool {
    match bars.len() {
        0 => false,
        n => evaluate(rule, bars, n - 1),
    }
}

fn resolve_operand(operand: &Operand, bars: &[PriceBar], bar_index: usize) -> f64 {
    let bar = &bars[bar_index];
    match operand {
        Operand::Open => bar.open,
        Operand::High => bar.high,
        Operand::Low => bar.low,
        Operand::Close => bar.close,
        Operand::Volatility => bar.volatility.unwrap_or(f64::NAN),
        Operand::FearAndGreed => bar.fear_and_greed.unwrap_or(f64::NAN),
        Operand::Change => match bar_index.checked_sub(1).map(|i| bars[i].close) {
            Some(prev) if prev != 0.0 => bar.close / prev - 1.0,
            _ => f64::NAN,
        },
        Operand::Constant(v) => *v,
    }
}
