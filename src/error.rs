// Error handling module for the storefront API
// Provides the crate-wide error taxonomy and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use tracing::{debug, error, warn};

/// Main error type for the API
///
/// Every domain error converts into this enum, so all handlers answer with
/// the same JSON shape. Each variant maps to one HTTP status code and one
/// stable `error_code` string.
#[derive(Debug)]
pub enum ApiError {
    /// Field-level validation errors from the `validator` crate
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Malformed or missing input that is not tied to a single field
    /// Maps to HTTP 400 Bad Request
    BadRequest(String),

    /// Resource not found by ID or slug
    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Duplicate unique field
    /// Maps to HTTP 409 Conflict
    Conflict { message: String },

    /// Database operation errors
    /// Maps to HTTP 500, details stay in the logs
    DatabaseError(String),

    /// Payment provider (or other upstream) failure
    /// Maps to HTTP 500, details stay in the logs
    GatewayError(String),

    /// Unexpected internal failure
    /// Maps to HTTP 500, details stay in the logs
    InternalError(String),

    /// Missing or invalid credential or signature
    /// Maps to HTTP 401 Unauthorized
    Unauthorized(String),

    /// Authenticated, but the role does not allow the operation
    /// Maps to HTTP 403 Forbidden
    Forbidden(String),
}

/// Consistent error response structure
///
/// `error_code` is the machine-readable reason, `message` is safe to show
/// to end users.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional field-level details, omitted from JSON when None
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging level follows severity: `error!` for 500s, `warn!` for auth
    /// failures and conflicts, `debug!` for expected client errors.
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let response = match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                let mut response = ErrorResponse::new("VALIDATION_ERROR", "Request validation failed");
                response.details = serde_json::to_value(errors).ok();
                response
            }
            ApiError::BadRequest(message) => {
                debug!("Bad request: {}", message);
                ErrorResponse::new("BAD_REQUEST", message.clone())
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id))
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                ErrorResponse::new("CONFLICT", message.clone())
            }
            ApiError::DatabaseError(details) => {
                error!("Database error: {}", details);
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
            }
            ApiError::GatewayError(details) => {
                error!("Payment gateway error: {}", details);
                ErrorResponse::new("GATEWAY_ERROR", "The payment provider could not complete the request")
            }
            ApiError::InternalError(details) => {
                error!("Internal error: {}", details);
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred")
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthorized access attempt: {}", message);
                ErrorResponse::new("UNAUTHORIZED", message.clone())
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                ErrorResponse::new("FORBIDDEN", message.clone())
            }
        };
        (status, response)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::GatewayError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Shorthand for a NotFound error
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<crate::db::StoreError> for ApiError {
    fn from(error: crate::db::StoreError) -> Self {
        match error {
            crate::db::StoreError::UniqueViolation(constraint) => ApiError::Conflict {
                message: format!("Duplicate value for {}", constraint),
            },
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}
