use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::ApiError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {0} belongs to another user")]
    Forbidden(Uuid),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    InvalidPage(String),

    #[error("Order {0} changed while it was being updated")]
    ConcurrentUpdate(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => ApiError::not_found("Order", id),
            err @ OrderError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            OrderError::InvalidTransition(message) | OrderError::InvalidPage(message) => {
                ApiError::BadRequest(message)
            }
            err @ OrderError::ConcurrentUpdate(_) => ApiError::Conflict {
                message: err.to_string(),
            },
            OrderError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
