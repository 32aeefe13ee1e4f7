use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::cart::MAX_LINE_QUANTITY;
use crate::db::StoreError;
use crate::error::ApiError;

/// Error types for cart operations
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Quantity must be between 1 and {max}, got {0}", max = MAX_LINE_QUANTITY)]
    InvalidQuantity(i32),

    #[error("A cart line holds at most {max} units of product {0}", max = MAX_LINE_QUANTITY)]
    LineLimitExceeded(Uuid),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Cart has no line for product {0}")]
    ItemNotFound(Uuid),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            err @ (CartError::InvalidQuantity(_) | CartError::LineLimitExceeded(_)) => {
                ApiError::BadRequest(err.to_string())
            }
            CartError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CartError::ItemNotFound(id) => ApiError::not_found("Cart item", id),
            CartError::Validation(errors) => ApiError::ValidationError(errors),
            CartError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for CartError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
