use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::checkout::gateway::GatewayError;
use crate::coupons::CouponError;
use crate::db::StoreError;
use crate::error::ApiError;

/// Error types for checkout operations
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    CartEmpty,

    #[error("Hosted checkout must be started through /api/checkout/session")]
    HostedCheckoutRequiresSession,

    #[error("Product {0} is no longer available")]
    ProductUnavailable(uuid::Uuid),

    #[error("An order already exists for this payment")]
    DuplicateOrder,

    #[error("Missing webhook signature")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("session_id is required")]
    MissingSessionId,

    #[error("Checkout session not found: {0}")]
    SessionNotFound(String),

    #[error("Amount cannot be charged: {0}")]
    InvalidAmount(String),

    #[error("Could not record payment event: {0}")]
    EventLog(StoreError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Gateway(GatewayError),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GatewayError> for CheckoutError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidSignature(reason) => {
                warn!("Rejected webhook: {}", reason);
                CheckoutError::InvalidSignature
            }
            GatewayError::SessionNotFound(id) => CheckoutError::SessionNotFound(id),
            other => CheckoutError::Gateway(other),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            err @ (CheckoutError::CartEmpty
            | CheckoutError::HostedCheckoutRequiresSession
            | CheckoutError::MissingSignature
            | CheckoutError::InvalidSignature
            | CheckoutError::MissingSessionId
            | CheckoutError::InvalidAmount(_)
            | CheckoutError::ProductUnavailable(_)) => ApiError::BadRequest(err.to_string()),
            err @ CheckoutError::DuplicateOrder => ApiError::Conflict {
                message: err.to_string(),
            },
            CheckoutError::SessionNotFound(id) => ApiError::not_found("Checkout session", id),
            CheckoutError::EventLog(err) => ApiError::DatabaseError(err.to_string()),
            CheckoutError::Coupon(err) => err.into(),
            CheckoutError::Gateway(err) => ApiError::GatewayError(err.to_string()),
            CheckoutError::Validation(errors) => ApiError::ValidationError(errors),
            CheckoutError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
