// Authentication and authorization error types

use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::auth::models::Role;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    /// Authenticated, but the role does not allow the operation
    #[error("Insufficient permissions: required role '{required}'")]
    InsufficientPermissions { required: Role, actual: Role },
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions { required, actual } => {
                warn!("Authorization failed: required role '{}', user has role '{}'", required, actual);
                ApiError::Forbidden(err.to_string())
            }
            other => {
                warn!("Rejected credential: {}", other);
                ApiError::Unauthorized(other.to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
