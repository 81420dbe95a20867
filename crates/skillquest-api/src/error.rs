//! Error types for the REST API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Storage
//! and progression errors convert into it with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use skillquest_db::DbError;
use skillquest_progression::ProgressionError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request is malformed or breaks a rule checked before any write.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body failed `validator` checks.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The caller may not perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The operation conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A UUID could not be parsed from the request path or query.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// An internal error occurred. The message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProgressionError> for ApiError {
    fn from(err: ProgressionError) -> Self {
        let message = err.to_string();
        match err {
            ProgressionError::InvalidTransition { .. } | ProgressionError::AlreadyGraded => {
                Self::Conflict(message)
            }
            ProgressionError::MissingFeedback
            | ProgressionError::MissingFixedXp
            | ProgressionError::InvalidSchedule { .. } => Self::BadRequest(message),
            ProgressionError::LevelTooLow { .. } => Self::Forbidden(message),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Progression(inner) => inner.into(),
            DbError::NotFound(what) => Self::NotFound(what),
            DbError::Conflict(msg) => Self::Conflict(msg),
            DbError::Forbidden(msg) => Self::Forbidden(msg),
            DbError::Invalid(msg) => Self::BadRequest(msg),
            other @ (DbError::Postgres(_)
            | DbError::Migration(_)
            | DbError::Corrupt(_)
            | DbError::Config(_)) => Self::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    /// HTTP status this error is reported with.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Validation(_) | Self::InvalidUuid(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::NotFound(msg) => format!("{msg} not found"),
            Self::BadRequest(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::InvalidUuid(msg) => msg.clone(),
            Self::Validation(errors) => errors.to_string(),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed with internal error");
                String::from("internal server error")
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use skillquest_types::QuestStatus;

    use super::*;

    #[test]
    fn progression_errors_map_to_client_statuses() {
        let cases = [
            (ProgressionError::AlreadyGraded, StatusCode::CONFLICT),
            (ProgressionError::MissingFeedback, StatusCode::BAD_REQUEST),
            (ProgressionError::MissingFixedXp, StatusCode::BAD_REQUEST),
            (
                ProgressionError::LevelTooLow {
                    required: 5,
                    actual: 2,
                },
                StatusCode::FORBIDDEN,
            ),
            (
                ProgressionError::InvalidTransition {
                    from: QuestStatus::Completed,
                    action: skillquest_progression::QuestAction::Submit,
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(DbError::Progression(err)).status(), status);
        }
    }

    #[test]
    fn storage_failures_are_internal() {
        let err = ApiError::from(DbError::Corrupt(String::from("bad level")));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_keeps_entity_name() {
        let err = ApiError::from(DbError::not_found("quest", "42"));
        assert!(matches!(err, ApiError::NotFound(ref what) if what == "quest 42"));
    }
}
