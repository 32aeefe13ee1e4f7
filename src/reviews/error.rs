use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::ApiError;

/// Error types for review operations
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Review not found: {0}")]
    NotFound(Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("You have already reviewed this product")]
    Duplicate,

    #[error("Review {0} belongs to another user")]
    Forbidden(Uuid),

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ReviewError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) => ReviewError::Duplicate,
            other => ReviewError::Store(other),
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::NotFound(id) => ApiError::not_found("Review", id),
            ReviewError::ProductNotFound(key) => ApiError::not_found("Product", key),
            err @ ReviewError::Duplicate => ApiError::Conflict {
                message: err.to_string(),
            },
            err @ ReviewError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            err @ ReviewError::EmptyUpdate => ApiError::BadRequest(err.to_string()),
            ReviewError::Validation(errors) => ApiError::ValidationError(errors),
            ReviewError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
