use thiserror::Error;

use crate::engine::ValidationErrors;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("allocation failed: {0}")]
    Exhausted(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("external command failed: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
