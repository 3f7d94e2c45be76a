//! Error types for feed ingestion.

use thiserror::Error;

/// Errors raised while turning a payload into a record set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// Declared input type is not one of the supported formats.
    #[error("unsupported format: {declared}")]
    UnsupportedFormat { declared: String },

    /// The source parsed but yielded zero records.
    #[error("no '{container}' records found")]
    EmptyResult { container: String },

    /// The payload is not well-formed for its declared format.
    #[error("failed to parse {format} payload: {message}")]
    Parse { format: String, message: String },
}

impl NormalizeError {
    pub(crate) fn parse(format: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.to_string(),
            message: message.into(),
        }
    }
}

/// Transport failure while fetching a source.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("failed to fetch {location}: {message}")]
pub struct FetchError {
    pub location: String,
    pub message: String,
}

impl FetchError {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Errors from the load stage (fetch + normalize).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("load of {location} was cancelled")]
    Cancelled { location: String },
}
