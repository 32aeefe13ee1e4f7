use axum::response::{IntoResponse, Response};

use crate::coupons::CouponRejection;
use crate::db::StoreError;
use crate::error::ApiError;

/// Error types for coupon operations
#[derive(Debug, thiserror::Error)]
pub enum CouponError {
    #[error("{}", .0.message())]
    Rejected(CouponRejection),

    #[error("Total must be a positive amount")]
    InvalidTotal,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CouponError> for ApiError {
    fn from(err: CouponError) -> Self {
        match err {
            err @ CouponError::Rejected(_) => ApiError::BadRequest(err.to_string()),
            err @ CouponError::InvalidTotal => {
                let mut errors = validator::ValidationErrors::new();
                let mut field = validator::ValidationError::new("positive");
                field.message = Some(err.to_string().into());
                errors.add("total", field);
                ApiError::ValidationError(errors)
            }
            CouponError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for CouponError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
