//! Domain error types.

/// A parse error with position information for entry-rule parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Rejected condition parameters. Raised at construction, never during simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("period_days must be at least 1")]
    ZeroPeriod,

    #[error("at least one of profit_below / profit_above must be set")]
    NoProfitBound,

    #[error("invalid {name} factor {value}: must be a finite, non-negative number")]
    InvalidFactor { name: &'static str, value: f64 },

    #[error("invalid open price {0}")]
    InvalidOpenPrice(f64),
}

/// Top-level error type for spreadtester.
#[derive(Debug, thiserror::Error)]
pub enum SpreadtesterError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid condition: {0}")]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("data contract violated by {source_name}: {reason}")]
    DataContract { source_name: String, reason: String },

    #[error("no data for {asset}")]
    NoData { asset: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SpreadtesterError> for std::process::ExitCode {
    fn from(err: &SpreadtesterError) -> Self {
        let code: u8 = match err {
            SpreadtesterError::Io(_) | SpreadtesterError::Csv(_) => 1,
            SpreadtesterError::ConfigParse { .. }
            | SpreadtesterError::ConfigMissing { .. }
            | SpreadtesterError::ConfigInvalid { .. }
            | SpreadtesterError::Condition(_) => 2,
            SpreadtesterError::RuleParse(_) => 4,
            SpreadtesterError::DataContract { .. } | SpreadtesterError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
