use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::pricing::{DiscountEvaluation, PricingPolicy};
use crate::validation::{
    validate_non_negative_amount, validate_not_blank, validate_percentage, validate_positive_price,
};

/// Product row
///
/// `discount_active`, `discount_price` and `is_new` are derived fields: they
/// always equal [`PricingPolicy`] evaluated over the source columns at the
/// time of the last sweep or write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub category_id: Uuid,
    pub quantity: i32,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub images: Vec<String>,
    pub rating: f64,
    pub review_ids: Vec<Uuid>,
    pub discount_percentage: Decimal,
    pub discount_price: Decimal,
    pub discount_start: Option<DateTime<Utc>>,
    pub discount_end: Option<DateTime<Utc>>,
    pub discount_active: bool,
    pub is_new: bool,
    pub new_until: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Evaluate the discount window at `now`
    pub fn evaluate_discount(&self, now: DateTime<Utc>) -> DiscountEvaluation {
        PricingPolicy::evaluate_discount(
            self.price,
            self.discount_percentage,
            self.discount_start,
            self.discount_end,
            now,
        )
    }

    /// Recompute derived fields in place
    pub fn refresh_derived(&mut self, now: DateTime<Utc>) {
        let evaluation = self.evaluate_discount(now);
        self.discount_active = evaluation.is_active;
        self.discount_price = evaluation.discounted_price;
        self.is_new = PricingPolicy::is_new(self.new_until, now);
    }

    /// Stored derived fields differ from a fresh evaluation at `now`
    ///
    /// Returns the update that would bring them back in line, or `None` when
    /// the row is already consistent.
    pub fn stale_derived(&self, now: DateTime<Utc>) -> Option<DerivedUpdate> {
        let evaluation = self.evaluate_discount(now);
        let is_new = PricingPolicy::is_new(self.new_until, now);

        let consistent = evaluation.is_active == self.discount_active
            && evaluation.discounted_price == self.discount_price
            && is_new == self.is_new;
        if consistent {
            return None;
        }

        Some(DerivedUpdate {
            product_id: self.id,
            discount_active: evaluation.is_active,
            discount_price: evaluation.discounted_price,
            is_new,
            expected: SourceFields::of(self),
        })
    }

    /// Price a buyer pays for one unit, using the stored derived fields
    pub fn effective_price(&self) -> Decimal {
        if self.discount_active {
            self.discount_price
        } else {
            self.price
        }
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Columns the derived fields are computed from
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFields {
    pub price: Decimal,
    pub discount_percentage: Decimal,
    pub discount_start: Option<DateTime<Utc>>,
    pub discount_end: Option<DateTime<Utc>>,
    pub new_until: Option<DateTime<Utc>>,
}

impl SourceFields {
    pub fn of(product: &Product) -> Self {
        Self {
            price: product.price,
            discount_percentage: product.discount_percentage,
            discount_start: product.discount_start,
            discount_end: product.discount_end,
            new_until: product.new_until,
        }
    }
}

/// A conditional write of derived fields
///
/// Stores apply it only while the product's source fields still equal
/// `expected`, so a concurrent admin edit is never clobbered.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedUpdate {
    pub product_id: Uuid,
    pub discount_active: bool,
    pub discount_price: Decimal,
    pub is_new: bool,
    pub expected: SourceFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Shirts")]
    pub name: String,
    #[schema(example = "shirts")]
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// Discount sub-record as exposed to clients
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiscountView {
    #[schema(example = 20)]
    pub percentage: Decimal,
    #[schema(example = 80)]
    pub discounted_price: Decimal,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Novelty sub-record as exposed to clients
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NoveltyView {
    pub is_new: bool,
    pub new_until: Option<DateTime<Utc>>,
}

/// Product response body
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    #[schema(example = "Linen Shirt")]
    pub name: String,
    #[schema(example = "linen-shirt")]
    pub slug: String,
    pub description: Option<String>,
    #[schema(example = 100)]
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub effective_price: Decimal,
    pub category_id: Uuid,
    pub quantity: i32,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub images: Vec<String>,
    #[schema(example = 4.5, minimum = 0.0, maximum = 5.0)]
    pub rating: f64,
    pub review_ids: Vec<Uuid>,
    pub discount: DiscountView,
    pub novelty: NoveltyView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let effective_price = product.effective_price();
        Self {
            id: product.id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            old_price: product.old_price,
            effective_price,
            category_id: product.category_id,
            quantity: product.quantity,
            colors: product.colors,
            sizes: product.sizes,
            images: product.images,
            rating: product.rating,
            review_ids: product.review_ids,
            discount: DiscountView {
                percentage: product.discount_percentage,
                discounted_price: product.discount_price,
                window_start: product.discount_start,
                window_end: product.discount_end,
                is_active: product.discount_active,
            },
            novelty: NoveltyView {
                is_new: product.is_new,
                new_until: product.new_until,
            },
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Discount window supplied on create/update
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DiscountInput {
    #[validate(custom = "validate_percentage")]
    #[schema(example = 20)]
    pub percentage: Decimal,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
}

/// Request body for POST /api/products
///
/// `is_new` defaults to true, which opens a 24h novelty window.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    #[schema(example = "Linen Shirt")]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_positive_price")]
    #[schema(example = 100)]
    pub price: Decimal,
    #[validate(custom = "validate_non_negative_amount")]
    pub old_price: Option<Decimal>,
    pub category_id: Uuid,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate]
    pub discount: Option<DiscountInput>,
    pub is_new: Option<bool>,
}

/// Request body for PUT /api/products/:slug
///
/// Omitted fields keep their stored value; the slug is never changed.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 120), custom = "validate_not_blank")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_positive_price")]
    pub price: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    pub old_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    pub colors: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    #[validate]
    pub discount: Option<DiscountInput>,
    pub is_new: Option<bool>,
}

/// Paginated product listing
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPage {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// How far through its window the longest-running discount is
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DiscountProgress {
    pub total_duration_ms: i64,
    pub elapsed_duration_ms: i64,
    pub percent_complete: f64,
}

impl DiscountProgress {
    /// Progress of a window `[start, end]` at `now`, clamped to 0..=100 percent
    pub fn of_window(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let total = (end - start).num_milliseconds().max(0);
        let elapsed = (now - start).num_milliseconds().clamp(0, total);
        let percent_complete = if total == 0 {
            100.0
        } else {
            elapsed as f64 / total as f64 * 100.0
        };
        Self {
            total_duration_ms: total,
            elapsed_duration_ms: elapsed,
            percent_complete,
        }
    }
}

/// Response for GET /api/products/discounted
#[derive(Debug, Serialize, ToSchema)]
pub struct DiscountedProducts {
    pub items: Vec<ProductResponse>,
    pub longest_expiry: Option<DateTime<Utc>>,
    pub discount_progress: Option<DiscountProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct CategoryCount {
    pub category_id: Uuid,
    pub name: String,
    pub count: i64,
}

/// Filter facets offered to the storefront
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ProductFacets {
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub categories: Vec<CategoryCount>,
    pub new_count: i64,
    pub discounted_count: i64,
    pub in_stock_count: i64,
    pub out_of_stock_count: i64,
}

/// Outcome of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    pub scanned: usize,
    pub updated: usize,
    /// Stale rows whose source fields changed between read and write
    pub skipped: usize,
}
