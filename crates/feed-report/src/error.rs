use thiserror::Error;

/// Failure while writing records or reports.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("delimited export failed: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("json export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
}

impl From<std::io::Error> for ExportError {
    fn from(source: std::io::Error) -> Self {
        ExportError::Io {
            path: "<buffer>".to_string(),
            source,
        }
    }
}
