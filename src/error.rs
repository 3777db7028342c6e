//! Error types for the work-item tracker.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Missing referenced row: {0}")]
    ForeignKey(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatabaseError {
    /// Classify a libSQL failure, keeping unique and foreign-key violations
    /// apart from generic query errors.
    pub(crate) fn from_libsql(context: &str, err: libsql::Error) -> Self {
        Self::classify(context, &err.to_string())
    }

    fn classify(context: &str, message: &str) -> Self {
        if message.contains("UNIQUE constraint failed") {
            DatabaseError::Constraint(format!("{context}: {message}"))
        } else if message.contains("FOREIGN KEY constraint failed") {
            DatabaseError::ForeignKey(format!("{context}: {message}"))
        } else {
            DatabaseError::Query(format!("{context}: {message}"))
        }
    }
}

/// Failures of tracker operations, one per HTTP outcome class.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Invalid assignee {user_id}: {reason}")]
    InvalidAssignee { user_id: Uuid, reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Database(DatabaseError),
}

impl TrackerError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        TrackerError::NotFound { entity, id }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        TrackerError::Invalid(message.into())
    }

    /// HTTP status for this failure class.
    pub fn status(&self) -> StatusCode {
        match self {
            TrackerError::NotFound { .. } => StatusCode::NOT_FOUND,
            TrackerError::Invalid(_) | TrackerError::InvalidAssignee { .. } => {
                StatusCode::BAD_REQUEST
            }
            TrackerError::Conflict(_) => StatusCode::CONFLICT,
            TrackerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DatabaseError> for TrackerError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Constraint(msg) => TrackerError::Conflict(msg),
            DatabaseError::ForeignKey(msg) => TrackerError::Invalid(msg),
            other => TrackerError::Database(other),
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}
