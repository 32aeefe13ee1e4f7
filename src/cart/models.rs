use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::Product;
use crate::pricing::PriceCalculator;

/// Most units of one product a cart line may hold
pub const MAX_LINE_QUANTITY: i32 = 1000;

/// Line item stored in a cart
///
/// `unit_price` and `unit_discount` are captured when the product is first
/// added and feed checkout; display data is always resolved live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Decimal,
    pub unit_discount: Decimal,
    pub added_at: DateTime<Utc>,
}

/// A user's cart; at most one line per product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|item| item.product_id).collect()
    }
}

/// Line item about to be merged into a cart
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Decimal,
    pub unit_discount: Decimal,
}

/// Request body for POST /api/cart/items
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    #[schema(example = 1, minimum = 1, maximum = 1000)]
    pub quantity: i32,
    #[schema(example = "M")]
    pub size: Option<String>,
    #[schema(example = "white")]
    pub color: Option<String>,
}

/// Request body for PATCH /api/cart/items/:product_id
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    #[schema(minimum = 1, maximum = 1000)]
    pub quantity: i32,
}

/// Cart line resolved against the live catalog
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub image: Option<String>,
    /// Current effective product price, which may differ from `unit_price`
    pub current_price: Option<Decimal>,
    /// False once the product is deleted or out of stock
    pub available: bool,
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Decimal,
    pub unit_discount: Decimal,
    pub line_total: Decimal,
}

/// Cart with totals computed at read time
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartView {
    pub user_id: Uuid,
    pub items: Vec<CartLineView>,
    pub item_count: i32,
    pub total_price: Decimal,
    pub total_discount: Decimal,
}

impl CartView {
    /// Resolve a cart against `products`, which must carry fresh derived fields
    pub fn build(cart: &Cart, products: &[Product]) -> Self {
        let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

        let items: Vec<CartLineView> = cart
            .items
            .iter()
            .map(|item| {
                let product = by_id.get(&item.product_id).copied();
                CartLineView {
                    product_id: item.product_id,
                    name: product.map(|p| p.name.clone()),
                    slug: product.map(|p| p.slug.clone()),
                    image: product.and_then(|p| p.primary_image().map(str::to_string)),
                    current_price: product.map(Product::effective_price),
                    available: product.is_some_and(|p| !p.is_deleted && p.in_stock()),
                    quantity: item.quantity,
                    size: item.size.clone(),
                    color: item.color.clone(),
                    unit_price: item.unit_price,
                    unit_discount: item.unit_discount,
                    line_total: PriceCalculator::calculate_subtotal(item.quantity, item.unit_price),
                }
            })
            .collect();

        let total_price = cart
            .items
            .iter()
            .map(|item| PriceCalculator::calculate_subtotal(item.quantity, item.unit_price))
            .sum();
        let total_discount = cart
            .items
            .iter()
            .map(|item| PriceCalculator::calculate_subtotal(item.quantity, item.unit_discount))
            .sum();

        Self {
            user_id: cart.user_id,
            item_count: cart.items.iter().map(|item| item.quantity).sum(),
            items,
            total_price,
            total_discount,
        }
    }
}
