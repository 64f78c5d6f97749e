//! Entry rule AST.
//!
//! - `Operand`: a bar field (price, volatility, sentiment, day change) or a constant
//! - `Rule`: comparison, composite, and temporal variants

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volatility,
    FearAndGreed,
    /// Close-to-close change against the previous bar, as a fraction.
    Change,
    Constant(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    Between {
        operand: Operand,
        lower: f64,
        upper: f64,
    },
    Equals {
        left: Operand,
        right: Operand,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
    Consecutive {
        rule: Box<Rule>,
        count: usize,
    },
    AnyOf {
        rule: Box<Rule>,
        count: usize,
    },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Open => f.write_str("open"),
            Operand::High => f.write_str("high"),
            Operand::Low => f.write_str("low"),
            Operand::Close => f.write_str("close"),
            Operand::Volatility => f.write_str("volatility"),
            Operand::FearAndGreed => f.write_str("fear_and_greed"),
            Operand::Change => f.write_str("change"),
            Operand::Constant(v) => write!(f, "{v}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, rules: &[Rule]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, r) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{r}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({left}, {right})"),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({left}, {right})"),
            Rule::Above { left, right } => write!(f, "ABOVE({left}, {right})"),
            Rule::Below { left, right } => write!(f, "BELOW({left}, {right})"),
            Rule::Between {
                operand,
                lower,
                upper,
            } => write!(f, "BETWEEN({operand}, {lower}, {upper})"),
            Rule::Equals { left, right } => write!(f, "EQUALS({left}, {right})"),
            Rule::And(rules) => write_list(f, "AND", rules),
            Rule::Or(rules) => write_list(f, "OR", rules),
            Rule::Not(rule) => write!(f, "NOT({rule})"),
            Rule::Consecutive { rule, count } => write!(f, "CONSECUTIVE({rule}, {count})"),
            Rule::AnyOf { rule, count } => write!(f, "ANY_OF({rule}, {count})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_constant() {
        let c = Operand::Constant(100.5);
        assert_eq!(c, Operand::Constant(100.5));
        assert_ne!(c, Operand::Constant(99.0));
    }

    #[test]
    fn display_comparison() {
        let rule = Rule::Below {
            left: Operand::FearAndGreed,
            right: Operand::Constant(70.0),
        };
        assert_eq!(rule.to_string(), "BELOW(fear_and_greed, 70)");
    }

    #[test]
    fn display_nested() {
        let rule = Rule::And(vec![
            Rule::Below {
                left: Operand::FearAndGreed,
                right: Operand::Constant(70.0),
            },
            Rule::Not(Box::new(Rule::Above {
                left: Operand::Volatility,
                right: Operand::Constant(0.9),
            })),
            Rule::Consecutive {
                rule: Box::new(Rule::Between {
                    operand: Operand::Change,
                    lower: -0.05,
                    upper: 0.05,
                }),
                count: 3,
            },
        ]);
        assert_eq!(
            rule.to_string(),
            "AND(BELOW(fear_and_greed, 70), NOT(ABOVE(volatility, 0.9)), \
             CONSECUTIVE(BETWEEN(change, -0.05, 0.05), 3))"
        );
    }
}
