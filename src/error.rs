//! Error types for the mini-rdbms engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data corruption: {0}")]
    Corruption(String),

    // SQL-related errors
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Plan error: {0}")]
    PlanError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Row not found: {0}")]
    RowNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Coarse error classes a front end can map onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Plan,
    Constraint,
    NotFound,
    Cancelled,
    Io,
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::ParseError(_) => ErrorKind::Parse,
            DbError::PlanError(_) => ErrorKind::Plan,
            DbError::ConstraintViolation(_) | DbError::TypeError(_) | DbError::TableExists(_) => {
                ErrorKind::Constraint
            }
            DbError::TableNotFound(_) | DbError::ColumnNotFound(_) | DbError::RowNotFound(_) => {
                ErrorKind::NotFound
            }
            DbError::Cancelled => ErrorKind::Cancelled,
            DbError::Io(_) | DbError::Serialization(_) | DbError::Corruption(_) => ErrorKind::Io,
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}
