//! Core domain types and logic.

pub mod error;
pub mod price_bar;
pub mod bound;
pub mod outcome;
pub mod condition;
pub mod window;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod entry;
pub mod backtest;
pub mod aggregate;
pub mod config_validation;
