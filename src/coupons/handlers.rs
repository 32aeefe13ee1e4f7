// HTTP handlers for coupon endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::coupons::{CouponError, CouponQuote, CouponValidation, QuoteParams};
use crate::error::ErrorResponse;
use crate::AppState;

/// Handler for GET /api/coupons/:code/validate
#[utoipa::path(
    get,
    path = "/api/coupons/{code}/validate",
    params(("code" = String, Path, description = "Coupon code (case-sensitive)")),
    responses(
        (status = 200, description = "Validity report; invalid codes are not an error", body = CouponValidation)
    ),
    tag = "coupons"
)]
pub async fn validate_coupon_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CouponValidation>, CouponError> {
    Ok(Json(state.coupons.validate(&code).await?))
}

/// Handler for GET /api/coupons/:code/quote?total=
#[utoipa::path(
    get,
    path = "/api/coupons/{code}/quote",
    params(("code" = String, Path, description = "Coupon code"), QuoteParams),
    responses(
        (status = 200, description = "Discount on the given total", body = CouponQuote),
        (status = 400, description = "Unusable coupon or invalid total", body = ErrorResponse)
    ),
    tag = "coupons"
)]
pub async fn quote_coupon_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<CouponQuote>, CouponError> {
    let total = params.total.ok_or(CouponError::InvalidTotal)?;
    Ok(Json(state.coupons.quote(&code, total).await?))
}
