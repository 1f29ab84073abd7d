use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;

/// Messages raised by the category triggers in `migrations/`.
pub(crate) const DEFAULT_DELETE_MESSAGE: &str = "default category cannot be deleted";
pub(crate) const DEFAULT_UNSET_MESSAGE: &str = "default category cannot be unset";
pub(crate) const NO_DEFAULT_MESSAGE: &str = "owner has no default category";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing or invalid identity token")]
    Unauthenticated,

    #[error("record belongs to another user")]
    AuthorizationDenied,

    #[error("the default category cannot be deleted")]
    DefaultCategoryProtected,

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("record not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Connection, pool or I/O failure. The only kind a caller may retry.
    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AuthorizationDenied => "authorization_denied",
            Self::DefaultCategoryProtected => "default_category_protected",
            Self::ConstraintViolation(_) => "constraint_violation",
            Self::NotFound => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Storage(_) => "storage_unavailable",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if let Some(mapped) = classify(db.as_ref()) {
                return mapped;
            }
        }
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

fn classify(db: &dyn DatabaseError) -> Option<AppError> {
    let message = db.message();
    if message.contains(DEFAULT_DELETE_MESSAGE) || message.contains(DEFAULT_UNSET_MESSAGE) {
        return Some(AppError::DefaultCategoryProtected);
    }
    if message.contains(NO_DEFAULT_MESSAGE) {
        return Some(AppError::ConstraintViolation(message.to_string()));
    }
    match db.kind() {
        ErrorKind::UniqueViolation
        | ErrorKind::ForeignKeyViolation
        | ErrorKind::NotNullViolation
        | ErrorKind::CheckViolation => Some(AppError::ConstraintViolation(message.to_string())),
        _ => None,
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::warn!(error = %err, "rejected identity token");
        Self::Unauthenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_errors_are_transient() {
        assert!(AppError::Storage(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!AppError::NotFound.is_transient());
        assert!(!AppError::DefaultCategoryProtected.is_transient());
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn pool_timeout_stays_transient() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), "storage_unavailable");
    }
}
