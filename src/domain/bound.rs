//! Numeric range membership with inclusive ("inside") and exclusive
//! ("outside") modes.
//!
//! An inside bound contains values between its edges, edges included. An
//! outside bound contains values strictly beyond either edge and is how
//! liquidation zones are expressed. A bound with neither edge contains
//! nothing.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub inside: bool,
}

impl Bound {
    pub fn inside(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self {
            lower,
            upper,
            inside: true,
        }
    }

    pub fn outside(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self {
            lower,
            upper,
            inside: false,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        match (self.inside, self.lower, self.upper) {
            (true, Some(lo), Some(hi)) => lo <= value && value <= hi,
            (true, Some(lo), None) => value >= lo,
            (true, None, Some(hi)) => value <= hi,
            (false, Some(lo), Some(hi)) => value < lo || value > hi,
            (false, Some(lo), None) => value < lo,
            (false, None, Some(hi)) => value > hi,
            (_, None, None) => false,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn edge(v: Option<f64>) -> String {
            v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "none".into())
        }
        write!(
            f,
            "Bound(lower={}, upper={}, inside={})",
            edge(self.lower),
            edge(self.upper),
            self.inside
        )
    }
}
