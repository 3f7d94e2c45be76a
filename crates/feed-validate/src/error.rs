//! Error types for rule configuration.

use feed_model::FieldKind;
use thiserror::Error;

/// A rule configuration that cannot be turned into a rule model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read rule configuration {path}: {message}")]
    Io { path: String, message: String },

    #[error("malformed rule configuration: {message}")]
    Syntax { message: String },

    #[error("field '{field}': unknown kind '{kind}'")]
    UnknownKind { field: String, kind: String },

    #[error("field '{field}': minimum {min} is greater than maximum {max}")]
    InconsistentBounds {
        field: String,
        min: String,
        max: String,
    },

    #[error("field '{field}': {constraint} does not apply to {kind} values")]
    ConstraintNotApplicable {
        field: String,
        constraint: &'static str,
        kind: FieldKind,
    },

    #[error("field '{field}': invalid {constraint} '{value}'")]
    InvalidBound {
        field: String,
        constraint: &'static str,
        value: String,
    },

    #[error("field '{field}': invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        field: String,
        pattern: String,
        message: String,
    },

    #[error("field '{field}': {constraint} '{value}' is not a date")]
    InvalidDateBound {
        field: String,
        constraint: &'static str,
        value: String,
    },

    #[error("field '{field}': invalid date format '{format}'")]
    InvalidDateFormat { field: String, format: String },

    #[error("field '{field}' is configured more than once")]
    DuplicateField { field: String },
}
