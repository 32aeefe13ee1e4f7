// HTTP handlers for hosted checkout and gateway webhooks

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};

use crate::auth::AuthenticatedUser;
use crate::checkout::signature::SIGNATURE_HEADER;
use crate::checkout::{
    CheckoutError, CheckoutSession, CreateSessionRequest, SessionStatus, VerifyParams, WebhookAck,
};
use crate::error::ErrorResponse;
use crate::AppState;

/// Handler for POST /api/checkout/session
#[utoipa::path(
    post,
    path = "/api/checkout/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Hosted checkout opened", body = CheckoutSession),
        (status = 400, description = "Empty cart, invalid coupon or invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 500, description = "Payment provider failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "checkout"
)]
pub async fn create_session_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CheckoutSession>, CheckoutError> {
    let session = state.checkout.create_session(user.user_id, request).await?;
    Ok(Json(session))
}

/// Handler for POST /api/checkout/webhook
///
/// Takes the body as raw bytes; the signature covers them exactly.
#[utoipa::path(
    post,
    path = "/api/checkout/webhook",
    request_body(content = String, description = "Raw gateway event", content_type = "application/json"),
    params(("stripe-signature" = String, Header, description = "t=<unix>,v1=<hex>")),
    responses(
        (status = 200, description = "Event authenticated and handled (or deliberately ignored)", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature", body = ErrorResponse),
        (status = 500, description = "Event could not be recorded; the gateway should retry", body = ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, CheckoutError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    state.checkout.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookAck { received: true }))
}

/// Handler for GET /api/checkout/verify?session_id=
#[utoipa::path(
    get,
    path = "/api/checkout/verify",
    params(VerifyParams),
    responses(
        (status = 200, description = "Gateway's view of the session", body = SessionStatus),
        (status = 400, description = "session_id missing", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn verify_session_handler(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<SessionStatus>, CheckoutError> {
    let status = state.checkout.verify_session(params.session_id.as_deref()).await?;
    Ok(Json(status))
}
