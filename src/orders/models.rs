use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::pricing::PriceCalculator;
use crate::validation::validate_not_blank;

/// How the buyer pays for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    ExternalRedirect,
    HostedCheckout,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::ExternalRedirect => "external_redirect",
            PaymentMethod::HostedCheckout => "hosted_checkout",
        }
    }

    /// Payment status an order starts in
    ///
    /// Only hosted checkout settles before the order exists.
    pub fn initial_payment_status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::HostedCheckout => PaymentStatus::Paid,
            PaymentMethod::CashOnDelivery | PaymentMethod::ExternalRedirect => PaymentStatus::Pending,
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::CashOnDelivery
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fulfillment lifecycle of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Processing => "processing",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Delivered => "delivered",
            FulfillmentStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for FulfillmentStatus {
    fn default() -> Self {
        FulfillmentStatus::Pending
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order header row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub phone_number: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub external_payment_ref: Option<String>,
    pub coupon_code: Option<String>,
    pub status: FulfillmentStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Frozen line item; never re-priced after the order is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrderItem {
    pub order_id: Uuid,
    pub line_no: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
    pub subtotal: Decimal,
}

/// An order together with its line items
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Line item about to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl NewOrderItem {
    pub fn subtotal(&self) -> Decimal {
        PriceCalculator::calculate_subtotal(self.quantity, self.price_at_purchase)
    }
}

/// Order about to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub items: Vec<NewOrderItem>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub phone_number: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub external_payment_ref: Option<String>,
    pub coupon_code: Option<String>,
}

impl NewOrder {
    /// Sum of the frozen line subtotals
    pub fn line_subtotal(items: &[NewOrderItem]) -> Decimal {
        let subtotals: Vec<Decimal> = items.iter().map(NewOrderItem::subtotal).collect();
        PriceCalculator::calculate_total(&subtotals)
    }
}

/// Result of inserting an order
#[derive(Debug, Clone, PartialEq)]
pub enum OrderInsert {
    Created(OrderWithItems),
    /// Another order already carries this external payment reference
    DuplicatePaymentRef,
}

/// Request body for POST /api/orders (direct checkout)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    #[schema(example = "12 Rue de la Paix, Paris")]
    pub shipping_address: String,
    #[validate(length(min = 5, max = 30))]
    #[schema(example = "+33123456789")]
    pub phone_number: String,
    /// Defaults to cash on delivery; hosted checkout goes through /api/checkout/session
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

/// Request DTO for updating fulfillment status
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: FulfillmentStatus,
}

/// Request DTO for updating payment status
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
}

/// Response DTO for an order with items
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItemResponse>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub phone_number: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub external_payment_ref: Option<String>,
    pub coupon_code: Option<String>,
    pub status: FulfillmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response DTO for an order item
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
    pub subtotal: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase,
            size: item.size,
            color: item.color,
            subtotal: item.subtotal,
        }
    }
}

impl From<OrderWithItems> for OrderResponse {
    fn from(record: OrderWithItems) -> Self {
        let order = record.order;
        Self {
            id: order.id,
            user_id: order.user_id,
            items: record.items.into_iter().map(Into::into).collect(),
            subtotal: order.subtotal,
            discount_amount: order.discount_amount,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address,
            phone_number: order.phone_number,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            external_payment_ref: order.external_payment_ref,
            coupon_code: order.coupon_code,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Admin listing page
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPage {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCount {
    pub count: i64,
}
