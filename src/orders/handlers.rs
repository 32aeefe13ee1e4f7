// HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::checkout::CheckoutError;
use crate::error::ErrorResponse;
use crate::orders::{
    CreateOrderRequest, OrderCount, OrderError, OrderPage, OrderResponse, UpdatePaymentRequest,
    UpdateStatusRequest,
};
use crate::query::{Page, PageParams};
use crate::AppState;

const ADMIN_PAGE_SIZE: u32 = 20;
const ADMIN_MAX_PAGE_SIZE: u32 = 100;

/// Handler for POST /api/orders
/// Turns the caller's cart into an order (cash on delivery / external redirect)
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created, cart cleared", body = OrderResponse),
        (status = 400, description = "Empty cart, invalid coupon or invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), CheckoutError> {
    let order = state.checkout.place_direct_order(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Handler for GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "Caller's orders, newest first", body = [OrderResponse]),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn order_history_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    Ok(Json(state.orders.history(user.user_id).await?))
}

/// Handler for GET /api/orders/:id
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to another user", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state.orders.get(id, user.user_id, user.is_admin()).await?;
    Ok(Json(order))
}

/// Handler for GET /api/admin/orders
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(PageParams),
    responses(
        (status = 200, description = "One page of all orders, newest first", body = OrderPage),
        (status = 400, description = "Invalid page or limit", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_all_orders_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<PageParams>,
) -> Result<Json<OrderPage>, OrderError> {
    let page = Page::from_params(params.page, params.limit, ADMIN_PAGE_SIZE, ADMIN_MAX_PAGE_SIZE)
        .map_err(OrderError::InvalidPage)?;
    Ok(Json(state.orders.list_all(page).await?))
}

/// Handler for GET /api/admin/orders/count
#[utoipa::path(
    get,
    path = "/api/admin/orders/count",
    responses(
        (status = 200, description = "Number of orders", body = OrderCount),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn count_orders_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<OrderCount>, OrderError> {
    let count = state.orders.count().await?;
    Ok(Json(OrderCount { count }))
}

/// Handler for PATCH /api/admin/orders/:id/status
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order_status_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    Ok(Json(state.orders.update_status(id, request.status).await?))
}

/// Handler for PATCH /api/admin/orders/:id/payment
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment status updated", body = OrderResponse),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order changed concurrently", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_payment_status_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state.orders.update_payment_status(id, request.payment_status).await?;
    Ok(Json(order))
}

/// Handler for DELETE /api/admin/orders/:id
#[utoipa::path(
    delete,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 204, description = "Order soft-deleted"),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn delete_order_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, OrderError> {
    state.orders.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
