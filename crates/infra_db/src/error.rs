//! SQLx error mapping
//!
//! Translates SQLx failures into the storage port's error vocabulary.
//! PostgreSQL error codes:
//! https://www.postgresql.org/docs/current/errcodes-appendix.html

use domain_ledger::StoreError;

const UNIQUE_VIOLATION: &str = "23505";

/// Returns true if the error is a unique constraint violation, which on
/// the documents table means a number collision.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
        }
        _ => false,
    }
}

/// Maps a SQLx error to the storage port's error type
pub(crate) fn map_sqlx(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::PoolTimedOut => StoreError::Connection("connection pool exhausted".into()),
        sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
        sqlx::Error::Database(db_err) => StoreError::Backend(db_err.message().to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_maps_to_connection() {
        let mapped = map_sqlx(sqlx::Error::PoolTimedOut);
        assert!(matches!(mapped, StoreError::Connection(_)));
    }

    #[test]
    fn test_row_not_found_maps_to_backend() {
        // Lookups use fetch_optional and report NotFound themselves;
        // RowNotFound leaking through is a backend fault
        let mapped = map_sqlx(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, StoreError::Backend(_)));
    }
}
