// HTTP handlers for cart endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::cart::{AddCartItemRequest, CartError, CartView, UpdateCartItemRequest};
use crate::error::ErrorResponse;
use crate::AppState;

/// Handler for GET /api/cart
#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Caller's cart with live product data", body = CartView),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn view_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CartView>, CartError> {
    Ok(Json(state.cart.view(user.user_id).await?))
}

/// Handler for POST /api/cart/items
#[utoipa::path(
    post,
    path = "/api/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Line added or merged", body = CartView),
        (status = 400, description = "Quantity out of range or line limit reached", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn add_cart_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AddCartItemRequest>,
) -> Result<Json<CartView>, CartError> {
    Ok(Json(state.cart.add_item(user.user_id, request).await?))
}

/// Handler for PATCH /api/cart/items/:product_id
#[utoipa::path(
    patch,
    path = "/api/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id of the line")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity set", body = CartView),
        (status = 400, description = "Quantity out of range", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 404, description = "No line for this product", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn update_cart_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartView>, CartError> {
    request.validate()?;
    let view = state
        .cart
        .update_quantity(user.user_id, product_id, request.quantity)
        .await?;
    Ok(Json(view))
}

/// Handler for DELETE /api/cart/items/:product_id
#[utoipa::path(
    delete,
    path = "/api/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id of the line")),
    responses(
        (status = 200, description = "Line removed, or was not there", body = CartView),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn remove_cart_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>, CartError> {
    Ok(Json(state.cart.remove_item(user.user_id, product_id).await?))
}

/// Handler for DELETE /api/cart
#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 204, description = "Cart emptied"),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn clear_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, CartError> {
    state.cart.clear(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
