//! Core error types.

use thiserror::Error;

/// Errors from the duration/throughput estimators.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EstimateError {
    /// The estimate denominator is zero; callers must pre-filter
    /// zero-capacity and zero-size tables.
    #[error("estimate is undefined: {0}")]
    DivisionUndefined(String),
}

/// Errors loading or validating the account configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
}
