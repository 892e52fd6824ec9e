// Error handling framework

use thiserror::Error;

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Errors surfaced by the polling loop.
///
/// A failed work unit is fatal to the process: the loop performs no
/// retry or backoff and relies on the supervisor's restart policy.
#[derive(Error, Debug)]
pub enum PollerError {
    #[error("Work unit failed: {0}")]
    WorkUnit(#[from] DatabaseError),

    #[error("Failed to install signal handlers: {0}")]
    SignalInstall(#[from] std::io::Error),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionFailed(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                DatabaseError::QueryFailed(db_err.message().to_string())
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_display() {
        let err = DatabaseError::QueryFailed("relation \"stats\" does not exist".to_string());
        assert!(err.to_string().contains("Query execution failed"));
    }

    #[test]
    fn test_poller_error_wraps_database_error() {
        let err: PollerError = DatabaseError::TransactionFailed("commit failed".to_string()).into();
        assert!(err.to_string().contains("Work unit failed"));
    }
}
