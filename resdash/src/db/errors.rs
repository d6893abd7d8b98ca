use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// The pool could not be built from the configured settings
    #[error("Database pool initialization failed: {reason}")]
    Construction { reason: String },

    /// Too many callers are already waiting on the pool
    #[error("Connection queue limit reached ({limit} waiting)")]
    QueueFull { limit: usize },

    /// Error reported by the driver
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    pub fn construction(reason: impl Into<String>) -> Self {
        DbError::Construction { reason: reason.into() }
    }

    /// Whether this error means the pool itself is unusable, rather than a single
    /// statement having failed.
    ///
    /// Pool faults cause the accessor to drop its memoized pool so the next request
    /// builds a fresh one. Statement-level errors (bad SQL, missing table) and
    /// saturation (`PoolTimedOut`, `QueueFull`) leave the pool in place.
    pub fn is_pool_fault(&self) -> bool {
        match self {
            DbError::Sqlx(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed
            ),
            DbError::Construction { .. } | DbError::QueueFull { .. } | DbError::Other(_) => false,
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_pool_faults() {
        let err = DbError::from(sqlx::Error::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer")));
        assert!(err.is_pool_fault());
        assert!(DbError::from(sqlx::Error::PoolClosed).is_pool_fault());
    }

    #[test]
    fn test_statement_errors_are_not_pool_faults() {
        assert!(!DbError::from(sqlx::Error::RowNotFound).is_pool_fault());
        assert!(!DbError::from(sqlx::Error::PoolTimedOut).is_pool_fault());
        assert!(!DbError::QueueFull { limit: 3 }.is_pool_fault());
        assert!(!DbError::construction("no host").is_pool_fault());
    }

    #[test]
    fn test_construction_message() {
        let err = DbError::construction("database.host is not set");
        assert_eq!(err.to_string(), "Database pool initialization failed: database.host is not set");
    }
}
