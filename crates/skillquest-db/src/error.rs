//! Error types for the storage layer.
//!
//! Both store implementations report failures through [`DbError`]. Rule
//! violations from the progression engine pass through unchanged in
//! [`DbError::Progression`] so the API can map them precisely.

use skillquest_progression::ProgressionError;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A progression rule refused the operation.
    #[error(transparent)]
    Progression(#[from] ProgressionError),

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The write would violate a uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The request is structurally valid but semantically wrong.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// A stored value could not be mapped back to its Rust type.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Build a [`DbError::NotFound`] naming the entity and its ID.
    pub fn not_found(entity: &str, id: impl core::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} {id}"))
    }
}

/// Map a unique-constraint violation to [`DbError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> DbError {
    let is_unique = err
        .as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation);
    if is_unique {
        DbError::Conflict(message.to_owned())
    } else {
        DbError::Postgres(err)
    }
}
