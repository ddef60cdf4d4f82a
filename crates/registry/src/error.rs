use fitreg_core::error::CoreError;
use fitreg_db::errors::{classify, DbErrorClass};
use serde::Serialize;

/// Error type returned by every [`Registry`](crate::Registry) operation.
///
/// Wraps [`CoreError`] for domain errors and [`sqlx::Error`] for failures
/// raised directly by repository queries or by the commit itself.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A domain-level error from `fitreg_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for registry return values.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    /// Nothing was applied; the operation may be retried unchanged.
    Unavailable,
    Internal,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Core(core) => match core {
                CoreError::NotFound { .. } => ErrorKind::NotFound,
                CoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                CoreError::Conflict(_) => ErrorKind::Conflict,
                CoreError::Unavailable(_) => ErrorKind::Unavailable,
                CoreError::Internal(_) => ErrorKind::Internal,
            },
            RegistryError::Database(err) => classify_sqlx_error(err),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}

/// Caller-facing kind of a sqlx error, see [`fitreg_db::errors::classify`].
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorKind {
    match classify(err) {
        DbErrorClass::Missing => ErrorKind::NotFound,
        DbErrorClass::Transient => ErrorKind::Unavailable,
        DbErrorClass::Duplicate => ErrorKind::Conflict,
        DbErrorClass::Fatal => {
            tracing::error!(error = %err, "Database error");
            ErrorKind::Internal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_kind() {
        let err = RegistryError::from(CoreError::Conflict("dup".into()));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());

        let err = RegistryError::from(CoreError::Unavailable("timeout".into()));
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.is_retryable());
    }

    #[test]
    fn row_not_found_is_not_found() {
        let err = RegistryError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn pool_errors_are_retryable() {
        assert!(RegistryError::from(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(RegistryError::from(sqlx::Error::PoolClosed).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(RegistryError::from(sqlx::Error::Io(io)).is_retryable());
    }
}
