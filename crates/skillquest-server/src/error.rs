//! Error types for the server binary.

use crate::config::ConfigError;

/// Top-level error for the server binary.
///
/// Each variant wraps one startup or runtime failure so `main` can
/// propagate everything with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Connecting to storage or migrating it failed.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: skillquest_db::DbError,
    },

    /// The HTTP server could not bind or stopped with an error.
    #[error("http error: {source}")]
    Http {
        /// The underlying server error.
        #[from]
        source: skillquest_api::ServerError,
    },

    /// The log subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
