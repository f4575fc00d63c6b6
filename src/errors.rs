//! # Error Handling
//!
//! Every manager operation returns [`ApiError`], which maps onto an HTTP status code and
//! renders as `{"detail": "..."}` when returned from an Axum handler.
//!
//! - Missing rows (`get_or_404`, `exists_or_404`) become **404 Not Found**
//! - Malformed query values (`comma_list`) become **400 Bad Request**
//! - Failed database validation (missing foreign key target, duplicate unique value,
//!   unknown ordering field, bad page parameters) becomes **422 Unprocessable Entity**
//! - Unique violations reported by the database driver become **409 Conflict**
//! - Anything else coming from the database becomes **500** and is logged, never sent
//!
//! ## Usage
//!
//! ```rust,ignore
//! use axum_sea_toolkit::ApiError;
//!
//! async fn retrieve(
//!     State(db): State<DatabaseConnection>,
//!     Path(id): Path<Uuid>,
//! ) -> Result<Json<child::Model>, ApiError> {
//!     let child = CHILDREN
//!         .get_or_404(&db, CHILDREN.query().filter_by(child::Column::Id, id))
//!         .await?;
//!     Ok(Json(child))
//! }
//! ```
//!
//! Internal errors are logged with `tracing`; install a subscriber to see them.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - no row matched the given filters
    NotFound {
        /// User-facing error message
        message: String,
    },

    /// 400 Bad Request - malformed input
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 409 Conflict - the database rejected a duplicate value
    Conflict {
        /// User-facing error message
        message: String,
    },

    /// 422 Unprocessable Entity - database validation failed
    ValidationFailed {
        /// User-facing validation errors
        errors: Vec<String>,
    },

    /// 500 Internal Server Error - database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - misconfiguration or unexpected state
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    // ============================================================================
    // Constructors
    // ============================================================================

    /// Create a 404 Not Found error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::not_found("child with slug=abc not found"));
    /// ```
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 409 Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a 422 error carrying a single message
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::unprocessable("parent with id 42 does not exist."));
    /// ```
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            errors: vec![message.into()],
        }
    }

    /// Create a 422 error carrying several messages
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { message }
            | Self::BadRequest { message }
            | Self::Conflict { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => match errors.as_slice() {
                [single] => single.clone(),
                _ => format!("Validation failed: {}", errors.join(", ")),
            },
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error body sent to clients
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub detail: String,
    /// Individual validation errors, present when more than one check failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let errors = match &self {
            Self::ValidationFailed { errors } if errors.len() > 1 => Some(errors.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            detail: self.user_message(),
            errors,
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database { internal, .. } => Some(internal),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

/// Convert Sea-ORM `DbErr` to `ApiError`
///
/// - `DbErr::RecordNotFound` becomes 404
/// - a unique violation raised by the driver becomes 409
/// - a foreign key violation raised by the driver becomes 422
/// - everything else becomes 500 (logged internally, sanitized for users)
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(msg) = &err {
            return Self::not_found(msg.clone());
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                tracing::debug!(error = ?err, "Unique constraint violated");
                Self::conflict("A record with the same unique values already exists")
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                tracing::debug!(error = ?err, "Foreign key constraint violated");
                Self::unprocessable("A referenced record does not exist")
            }
            _ => Self::database(err),
        }
    }
}
