use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum WishlistError {
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<WishlistError> for ApiError {
    fn from(err: WishlistError) -> Self {
        match err {
            WishlistError::ProductNotFound(id) => ApiError::not_found("Product", id),
            WishlistError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for WishlistError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
