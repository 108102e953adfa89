//! Unified error types for the data layer.
//!
//! Domain rejections (`ImmutableRecord`, `Validation`, `IntegrityGuard`) are never
//! retried: the caller must change its input or stop. Infrastructure failures are
//! wrapped as they come out of `sea-orm` or the filesystem.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// A write-once record was asked to change or disappear
    #[error("{entity} #{id} is immutable: cannot {operation}")]
    ImmutableRecord {
        /// Table-level name of the record kind (e.g. `"activity_log"`)
        entity: &'static str,
        /// Primary key of the record
        id: i64,
        /// What was attempted (e.g. "delete", "modify column `action`")
        operation: String,
    },

    /// A pre-save check rejected the input
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Field (or pseudo-field such as `status`) that failed validation
        field: &'static str,
        /// Human-readable reason
        message: String,
    },

    /// Reference data cannot be deleted while other rows still point at it
    #[error("Cannot delete {entity} #{id}: still referenced by {dependents}")]
    IntegrityGuard {
        /// Kind of the row being deleted
        entity: &'static str,
        /// Primary key of the row being deleted
        id: i64,
        /// Summary of the dependents, e.g. "2 companies, 0 deals"
        dependents: String,
    },

    /// Lookup by primary key found nothing
    #[error("{entity} #{id} not found")]
    NotFound {
        /// Kind of the missing row
        entity: &'static str,
        /// Requested primary key
        id: i64,
    },

    /// Settings or seed file could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong while loading configuration
        message: String,
    },

    /// Error bubbled up from the database driver
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for building a [`Error::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for building a [`Error::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::ImmutableRecord {
            entity: "activity_log",
            id: 7,
            operation: "delete".to_string(),
        };
        assert_eq!(err.to_string(), "activity_log #7 is immutable: cannot delete");

        let err = Error::validation("end_date", "must not be before start_date");
        assert_eq!(
            err.to_string(),
            "Invalid end_date: must not be before start_date"
        );

        let err = Error::IntegrityGuard {
            entity: "sector",
            id: 3,
            dependents: "1 companies, 0 deals".to_string(),
        };
        assert!(err.to_string().contains("still referenced by 1 companies"));
    }
}
