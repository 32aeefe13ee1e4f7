use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_locale, validate_not_blank};

/// Event type that confirms a hosted checkout was paid
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

pub const DEFAULT_LOCALE: &str = "en";

/// Request body for POST /api/checkout/session
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    pub shipping_address: String,
    #[validate(length(min = 5, max = 30))]
    pub phone_number: String,
    pub coupon_code: Option<String>,
    /// Frontend locale used in the return URLs, defaults to `en`
    #[validate(custom = "validate_locale")]
    #[schema(example = "en")]
    pub locale: Option<String>,
}

/// Session handed back to the client unmodified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[schema(example = "cs_test_a1b2c3")]
    pub session_id: String,
    pub url: String,
}

/// One line on the hosted payment page, amounts in minor units
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i32,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// Opaque metadata carried through the gateway and back on the webhook
///
/// Every value travels as a string; the gateway stores nothing else for us.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub discount_amount: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl CheckoutMetadata {
    /// Key/value pairs in wire naming, empty values omitted
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("userId", &self.user_id),
            ("shippingAddress", &self.shipping_address),
            ("phoneNumber", &self.phone_number),
            ("totalAmount", &self.total_amount),
            ("discountAmount", &self.discount_amount),
            ("couponCode", &self.coupon_code),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id.as_deref().and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    }

    pub fn total_amount(&self) -> Option<Decimal> {
        parse_amount(self.total_amount.as_deref())
    }

    pub fn discount_amount(&self) -> Option<Decimal> {
        parse_amount(self.discount_amount.as_deref())
    }

    pub fn coupon_code(&self) -> Option<String> {
        non_empty(self.coupon_code.as_deref())
    }
}

fn parse_amount(raw: Option<&str>) -> Option<Decimal> {
    raw.and_then(|value| Decimal::from_str(value.trim()).ok())
        .filter(|amount| *amount >= Decimal::ZERO)
}

pub(crate) fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Everything the gateway needs to open a hosted checkout
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub line_items: Vec<GatewayLineItem>,
    pub metadata: CheckoutMetadata,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// The session object inside a completed-checkout event
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

impl CompletedSession {
    /// Key the resulting order is deduplicated on
    pub fn payment_reference(&self) -> String {
        non_empty(self.payment_intent.as_deref()).unwrap_or_else(|| self.id.clone())
    }
}

/// Authenticated gateway event
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub id: String,
    pub event_type: String,
    pub body: EventBody,
    pub payload: serde_json::Value,
}

/// What an authenticated event turned out to carry
#[derive(Debug, Clone, PartialEq)]
pub enum EventBody {
    CompletedSession(CompletedSession),
    /// Any event type the store does not act on
    Other,
    /// Signed by the gateway but not decodable; carries the decode error
    Unreadable(String),
}

/// Gateway's current view of a session
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SessionStatus {
    #[schema(example = "paid")]
    pub status: String,
    #[schema(value_type = Object)]
    pub buyer: serde_json::Value,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyParams {
    pub session_id: Option<String>,
}

/// What happened to an authenticated webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    OrderCreated(Uuid),
    /// An order already exists for this payment reference
    Duplicate,
    MissingUser,
    /// Nothing to turn into an order, usually a redelivery after clearing
    CartEmpty,
    Ignored,
    Unreadable,
    Failed,
    TimedOut,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::OrderCreated(_) => "order_created",
            WebhookOutcome::Duplicate => "duplicate",
            WebhookOutcome::MissingUser => "missing_user",
            WebhookOutcome::CartEmpty => "cart_empty",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::Unreadable => "unreadable",
            WebhookOutcome::Failed => "failed",
            WebhookOutcome::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

/// Row for the payment-event log
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentEvent {
    pub event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
}
