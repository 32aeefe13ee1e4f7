// HTTP handlers for wishlist endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ErrorResponse;
use crate::wishlist::{AddWishlistRequest, WishlistChange, WishlistError, WishlistView};
use crate::AppState;

/// Handler for GET /api/wishlist
#[utoipa::path(
    get,
    path = "/api/wishlist",
    responses(
        (status = 200, description = "Caller's wishlist", body = WishlistView),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "wishlist"
)]
pub async fn view_wishlist_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<WishlistView>, WishlistError> {
    Ok(Json(state.wishlist.view(user.user_id).await?))
}

/// Handler for POST /api/wishlist
#[utoipa::path(
    post,
    path = "/api/wishlist",
    request_body = AddWishlistRequest,
    responses(
        (status = 200, description = "Product added, or already present", body = WishlistChange),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "wishlist"
)]
pub async fn add_wishlist_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AddWishlistRequest>,
) -> Result<Json<WishlistChange>, WishlistError> {
    Ok(Json(state.wishlist.add(user.user_id, request.product_id).await?))
}

/// Handler for DELETE /api/wishlist/:product_id
#[utoipa::path(
    delete,
    path = "/api/wishlist/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product removed", body = WishlistView),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "wishlist"
)]
pub async fn remove_wishlist_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<WishlistView>, WishlistError> {
    Ok(Json(state.wishlist.remove(user.user_id, product_id).await?))
}

/// Handler for DELETE /api/wishlist
#[utoipa::path(
    delete,
    path = "/api/wishlist",
    responses(
        (status = 204, description = "Wishlist emptied"),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "wishlist"
)]
pub async fn clear_wishlist_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, WishlistError> {
    state.wishlist.clear(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
