// HTTP handlers for review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::error::ErrorResponse;
use crate::reviews::{CreateReviewRequest, Review, ReviewError, UpdateReviewRequest, VisibilityRequest};
use crate::AppState;

/// Visible reviews of a product
/// GET /api/products/:slug/reviews
#[utoipa::path(
    get,
    path = "/api/products/{slug}/reviews",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Visible reviews, newest first", body = [Review]),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "reviews"
)]
pub async fn list_product_reviews_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Review>>, ReviewError> {
    Ok(Json(state.reviews.for_product(&slug).await?))
}

/// Create a new review
/// POST /api/reviews
#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = Review),
        (status = 400, description = "Invalid rating or comment", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 409, description = "Caller already reviewed this product", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn create_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ReviewError> {
    let review = state.reviews.create(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Update the caller's review
/// PUT /api/reviews/:id
#[utoipa::path(
    put,
    path = "/api/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review id")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = Review),
        (status = 400, description = "Nothing to update or invalid input", body = ErrorResponse),
        (status = 403, description = "Review belongs to another user", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn update_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(review_id): Path<Uuid>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, ReviewError> {
    Ok(Json(state.reviews.update(user.user_id, review_id, request).await?))
}

/// DELETE /api/reviews/:id
#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review id")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Neither the author nor an admin", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn delete_review_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(review_id): Path<Uuid>,
) -> Result<StatusCode, ReviewError> {
    state
        .reviews
        .delete(user.user_id, review_id, user.is_admin())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/reviews/:id/visibility
#[utoipa::path(
    patch,
    path = "/api/reviews/{id}/visibility",
    params(("id" = Uuid, Path, description = "Review id")),
    request_body = VisibilityRequest,
    responses(
        (status = 200, description = "Visibility set, rating recomputed", body = Review),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn set_review_visibility_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(review_id): Path<Uuid>,
    Json(request): Json<VisibilityRequest>,
) -> Result<Json<Review>, ReviewError> {
    Ok(Json(state.reviews.set_visibility(review_id, request.is_visible).await?))
}
