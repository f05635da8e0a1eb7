//! PostgreSQL error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} failed: {error}")]
    MigrationFailed { version: i32, error: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

impl PostgresError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Transient: the server went away, a connection could not be obtained,
    /// or the statement was cancelled by a timeout or lock. Everything else
    /// (constraint violations, schema drift, bad SQL) is permanent and will
    /// fail identically on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Database(e) => sqlx_error_is_transient(e),
            _ => false,
        }
    }
}

fn sqlx_error_is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.code().is_some_and(|code| {
            // SQLSTATE classes: 08 connection exception, 40 transaction
            // rollback (serialization/deadlock), 53 insufficient resources,
            // 57 operator intervention (admin shutdown), plus
            // lock_not_available and query_canceled.
            code.starts_with("08")
                || code.starts_with("40")
                || code.starts_with("53")
                || code.starts_with("57")
                || code == "55P03"
        }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = PostgresError::Database(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
    }

    #[test]
    fn test_query_timeout_is_transient() {
        let err = PostgresError::Timeout(Duration::from_secs(10));
        assert!(err.is_transient());
    }

    #[test]
    fn test_config_error_is_permanent() {
        let err = PostgresError::Config("missing URL".to_string());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_row_not_found_is_permanent() {
        let err = PostgresError::Database(sqlx::Error::RowNotFound);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_migration_failed_display() {
        let err = PostgresError::MigrationFailed {
            version: 2,
            error: "syntax error".to_string(),
        };
        assert_eq!(err.to_string(), "Migration 2 failed: syntax error");
    }
}
