use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown field: {field}")]
    UnknownField { field: String },
    #[error("no record with index {index}")]
    UnknownRecord { index: usize },
}

pub type Result<T> = std::result::Result<T, ModelError>;
