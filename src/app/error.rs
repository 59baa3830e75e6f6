use thiserror::Error;

/// Failures a service operation reports to its caller. Everything except
/// `Internal` is caused by the request itself and is safe to show to the client.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidReference(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Name of the unique constraint `err` violated, if that is what it is.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    constraint_violation(err, UNIQUE_VIOLATION)
}

pub(crate) fn foreign_key_violation(err: &sqlx::Error) -> Option<String> {
    constraint_violation(err, FOREIGN_KEY_VIOLATION)
}

fn constraint_violation(err: &sqlx::Error, expected: &str) -> Option<String> {
    let db_err = err.as_database_error()?;
    if db_err.code().as_deref() != Some(expected) {
        return None;
    }
    Some(db_err.constraint().unwrap_or_default().to_string())
}
