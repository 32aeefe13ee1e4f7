use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::ApiError;

/// Error types for catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Category does not exist: {0}")]
    UnknownCategory(Uuid),

    #[error("Product with name '{0}' already exists")]
    DuplicateName(String),

    #[error("Product name must contain letters or digits")]
    UnsluggableName,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(key) => ApiError::not_found("Product", key),
            CatalogError::UnknownCategory(id) => {
                ApiError::BadRequest(format!("Category {} does not exist", id))
            }
            CatalogError::DuplicateName(name) => ApiError::Conflict {
                message: format!("Product with name '{}' already exists", name),
            },
            err @ CatalogError::UnsluggableName => ApiError::BadRequest(err.to_string()),
            CatalogError::InvalidQuery(msg) => ApiError::BadRequest(msg),
            CatalogError::Validation(errors) => ApiError::ValidationError(errors),
            CatalogError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
