//! Error types for cohort comparisons and analysis configuration.

use crate::testing::utils::GroupLabel;
use thiserror::Error;

/// Failure of a single feature's comparison.
///
/// Empty samples are not errors; they surface as
/// [`ComparisonOutcome::Skipped`](crate::testing::comparator::ComparisonOutcome::Skipped).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComparisonError {
    #[error("Invalid input for feature '{feature}': non-finite value {value} at position {position} of the {group} sample")]
    InvalidInput {
        feature: String,
        group: GroupLabel,
        position: usize,
        value: f64,
    },
}

/// Invalid or unreadable analysis configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Feature '{0}' is not a column of the input table")]
    UnknownFeature(String),

    #[error("Feature '{0}' is selected more than once")]
    DuplicateFeature(String),

    #[error("Column '{0}' is an identifier or label column and cannot be compared")]
    ReservedFeature(String),

    #[error("Feature selection is empty")]
    EmptySelection,
}
