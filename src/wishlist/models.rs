use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::Product;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WishlistItem {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddWishlistRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WishlistEntry {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub effective_price: Decimal,
    pub in_stock: bool,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WishlistView {
    pub user_id: Uuid,
    pub items: Vec<WishlistEntry>,
    pub count: usize,
}

impl WishlistView {
    /// Resolve entries against live products; deleted or missing ones are skipped
    pub fn build(user_id: Uuid, entries: &[WishlistItem], products: &[Product]) -> Self {
        let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();
        let items: Vec<WishlistEntry> = entries
            .iter()
            .filter_map(|entry| {
                let product = by_id.get(&entry.product_id).filter(|p| !p.is_deleted)?;
                Some(WishlistEntry {
                    product_id: product.id,
                    name: product.name.clone(),
                    slug: product.slug.clone(),
                    image: product.primary_image().map(str::to_string),
                    price: product.price,
                    effective_price: product.effective_price(),
                    in_stock: product.in_stock(),
                    added_at: entry.added_at,
                })
            })
            .collect();
        Self {
            user_id,
            count: items.len(),
            items,
        }
    }
}

/// Result of an add
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WishlistChange {
    pub already_present: bool,
    pub wishlist: WishlistView,
}
