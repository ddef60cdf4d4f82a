//! Classification of sqlx errors, shared by the store adapter and the
//! registry's caller-facing error kinds.

use fitreg_core::error::CoreError;

/// What a failed query means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorClass {
    /// Nothing was applied and the same call may succeed on retry.
    Transient,
    /// A `uq_*` unique constraint rejected the write.
    Duplicate,
    /// A query that expected a row found none.
    Missing,
    /// Anything else; retrying will not help.
    Fatal,
}

/// Classify a sqlx error.
///
/// Pool exhaustion, I/O and a closed pool are transient. Database errors are
/// classified by SQLSTATE, see [`classify_code`].
pub fn classify(err: &sqlx::Error) -> DbErrorClass {
    match err {
        sqlx::Error::RowNotFound => DbErrorClass::Missing,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            DbErrorClass::Transient
        }
        sqlx::Error::Database(db_err) => classify_code(db_err.code().as_deref(), db_err.constraint()),
        _ => DbErrorClass::Fatal,
    }
}

/// Map a PostgreSQL SQLSTATE (and violated constraint, if any) to a class.
///
/// - `23505` on a constraint named `uq_*` is a duplicate.
/// - Serialization failure, deadlock, lock timeout and statement
///   cancellation are transient.
/// - Everything else, including the `23P01` active-sequence exclusion, is
///   fatal.
pub fn classify_code(code: Option<&str>, constraint: Option<&str>) -> DbErrorClass {
    match code {
        Some("23505") if constraint.is_some_and(|c| c.starts_with("uq_")) => {
            DbErrorClass::Duplicate
        }
        Some("40001" | "40P01" | "55P03" | "57014") => DbErrorClass::Transient,
        _ => DbErrorClass::Fatal,
    }
}

/// Convert a sqlx error into a domain error, prefixing `context`.
pub fn to_core_error(context: &str, err: &sqlx::Error) -> CoreError {
    let message = format!("{context}: {err}");
    match classify(err) {
        DbErrorClass::Transient => CoreError::Unavailable(message),
        DbErrorClass::Duplicate => CoreError::Conflict(message),
        DbErrorClass::Missing | DbErrorClass::Fatal => CoreError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_on_uq_constraint_is_duplicate() {
        assert_eq!(
            classify_code(Some("23505"), Some("uq_categories_active_name")),
            DbErrorClass::Duplicate
        );
    }

    #[test]
    fn unique_violation_on_other_constraint_is_fatal() {
        assert_eq!(classify_code(Some("23505"), Some("categories_pkey")), DbErrorClass::Fatal);
        assert_eq!(classify_code(Some("23505"), None), DbErrorClass::Fatal);
    }

    #[test]
    fn exclusion_violation_is_fatal() {
        assert_eq!(
            classify_code(Some("23P01"), Some("ex_categories_active_sequence")),
            DbErrorClass::Fatal
        );
    }

    #[test]
    fn transient_states() {
        for code in ["40001", "40P01", "55P03", "57014"] {
            assert_eq!(classify_code(Some(code), None), DbErrorClass::Transient);
        }
    }

    #[test]
    fn unknown_code_is_fatal() {
        assert_eq!(classify_code(Some("22001"), None), DbErrorClass::Fatal);
        assert_eq!(classify_code(None, None), DbErrorClass::Fatal);
    }

    #[test]
    fn pool_and_io_errors_become_unavailable() {
        assert!(to_core_error("count", &sqlx::Error::PoolTimedOut).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(to_core_error("count", &sqlx::Error::Io(io)).is_retryable());
    }

    #[test]
    fn decode_failures_are_internal() {
        let err = to_core_error("slot on categories", &sqlx::Error::RowNotFound);
        assert!(matches!(err, CoreError::Internal(ref m) if m.starts_with("slot on categories")));
        assert!(!err.is_retryable());
    }
}
