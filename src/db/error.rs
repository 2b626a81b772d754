use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for DbError {
    fn from(e: validator::ValidationErrors) -> Self {
        DbError::Validation(e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
