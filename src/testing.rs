//! In-memory stores and a fake payment gateway for service and HTTP tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::cart::{Cart, CartItem, CartStore, NewCartItem, MAX_LINE_QUANTITY};
use crate::catalog::query::{ProductFilter, ProductSort};
use crate::catalog::slug::slugify;
use crate::catalog::{
    CatalogStore, Category, CategoryCount, DerivedUpdate, Product, ProductFacets, SourceFields,
};
use crate::checkout::gateway::{GatewayError, PaymentGateway};
use crate::checkout::signature;
use crate::checkout::stripe::decode_event;
use crate::checkout::{CheckoutSession, GatewayEvent, NewPaymentEvent, PaymentEventLog, SessionRequest, SessionStatus};
use crate::coupons::{Coupon, CouponStore};
use crate::db::{StoreError, StoreResult};
use crate::orders::{
    FulfillmentStatus, NewOrder, Order, OrderInsert, OrderItem, OrderStore, OrderWithItems, PaymentStatus,
};
use crate::query::Page;
use crate::reviews::{NewReview, Review, ReviewStore, ReviewTally};
use crate::wishlist::{WishlistItem, WishlistStore};

/// In-process evaluation of the predicates the SQL listing builder emits
fn filter_matches(filter: &ProductFilter, product: &Product) -> bool {
    if !filter.include_deleted && product.is_deleted {
        return false;
    }
    if !filter.category_ids.is_empty() && !filter.category_ids.contains(&product.category_id) {
        return false;
    }
    if filter.min_price.is_some_and(|min| product.price < min) {
        return false;
    }
    if filter.max_price.is_some_and(|max| product.price > max) {
        return false;
    }
    if !filter.colors.is_empty() && !product.colors.iter().any(|c| filter.colors.contains(c)) {
        return false;
    }
    if !filter.sizes.is_empty() && !product.sizes.iter().any(|s| filter.sizes.contains(s)) {
        return false;
    }
    if let Some(ref search) = filter.search {
        let needle = search.to_lowercase();
        let in_name = product.name.to_lowercase().contains(&needle);
        let in_description = product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle));
        if !in_name && !in_description {
            return false;
        }
    }
    if filter.discount_only && !product.discount_active {
        return false;
    }
    if filter.new_only && !product.is_new {
        return false;
    }
    !(filter.in_stock_only && !product.in_stock())
}

/// Mirrors [`ProductSort::order_by`], ties broken on id
fn sort_order(sort: ProductSort, a: &Product, b: &Product) -> Ordering {
    let primary = match sort {
        ProductSort::Newest => b.created_at.cmp(&a.created_at),
        ProductSort::PriceAsc => a.price.cmp(&b.price),
        ProductSort::PriceDesc => b.price.cmp(&a.price),
        ProductSort::NameAsc => a.name.cmp(&b.name),
        ProductSort::NameDesc => b.name.cmp(&a.name),
        ProductSort::Discount => b.discount_percentage.cmp(&a.discount_percentage),
        ProductSort::Rating => b.rating.total_cmp(&a.rating),
        ProductSort::DiscountEndingLast => match (a.discount_end, b.discount_end) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub event: NewPaymentEvent,
    pub outcome: Option<String>,
    pub attempts: i32,
}

#[derive(Default)]
struct State {
    categories: Vec<Category>,
    products: Vec<Product>,
    carts: HashMap<Uuid, Cart>,
    orders: Vec<OrderWithItems>,
    coupons: Vec<Coupon>,
    events: HashMap<String, RecordedEvent>,
    reviews: Vec<Review>,
    wishlist: Vec<WishlistItem>,
    fail_cart_clear: bool,
    fail_event_record: bool,
    fail_order_insert: bool,
    order_insert_delay: Option<Duration>,
    fail_review_summary: bool,
}

/// Every store trait over one shared in-memory state
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_category(&self, name: &str) -> Uuid {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            description: None,
            image_url: None,
            is_active: true,
            is_deleted: false,
            created_at: Utc::now(),
        };
        let id = category.id;
        self.lock().categories.push(category);
        id
    }

    pub fn seed_product(&self, product: Product) -> Product {
        self.lock().products.push(product.clone());
        product
    }

    pub fn product(&self, id: Uuid) -> Option<Product> {
        self.lock().products.iter().find(|p| p.id == id).cloned()
    }

    /// Change a product's base price behind the services' back
    pub fn set_price(&self, id: Uuid, price: Decimal) {
        let mut state = self.lock();
        if let Some(product) = state.products.iter_mut().find(|p| p.id == id) {
            product.price = price;
            product.refresh_derived(Utc::now());
        }
    }

    pub fn add_coupon(&self, code: &str, percentage: Decimal, expires_in: ChronoDuration, is_active: bool) {
        let now = Utc::now();
        self.lock().coupons.push(Coupon {
            id: Uuid::new_v4(),
            code: code.to_string(),
            percentage,
            expires_at: now + expires_in,
            is_active,
            max_uses: 100,
            created_at: now,
        });
    }

    pub fn orders(&self) -> Vec<OrderWithItems> {
        self.lock().orders.clone()
    }

    pub fn cart_lines(&self, user_id: Uuid) -> usize {
        self.lock().carts.get(&user_id).map_or(0, |c| c.items.len())
    }

    pub fn recorded_event(&self, event_id: &str) -> Option<RecordedEvent> {
        self.lock().events.get(event_id).cloned()
    }

    /// Make every later cart clear fail
    pub fn fail_cart_clears(&self) {
        self.lock().fail_cart_clear = true;
    }

    /// Make every later payment-event record fail
    pub fn fail_event_records(&self) {
        self.lock().fail_event_record = true;
    }

    /// Make every later order insert fail
    pub fn fail_order_inserts(&self) {
        self.lock().fail_order_insert = true;
    }

    /// Make product review summaries fail to save until switched back
    pub fn fail_review_summaries(&self, fail: bool) {
        self.lock().fail_review_summary = fail;
    }

    /// Hold every later order insert for `delay` before writing
    pub fn slow_order_inserts(&self, delay: Duration) {
        self.lock().order_insert_delay = Some(delay);
    }
}

fn newest_first(orders: &[OrderWithItems], keep: impl Fn(&Order) -> bool) -> Vec<OrderWithItems> {
    let mut selected: Vec<OrderWithItems> = orders.iter().rev().filter(|o| keep(&o.order)).cloned().collect();
    selected.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
    selected
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<Product> {
        let mut state = self.lock();
        if state.products.iter().any(|p| p.slug == product.slug) {
            return Err(StoreError::UniqueViolation("products_slug_key".to_string()));
        }
        state.products.push(product.clone());
        Ok(product.clone())
    }

    async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        Ok(self.lock().products.iter().any(|p| p.slug == slug))
    }

    async fn name_exists(&self, name: &str, exclude: Option<Uuid>) -> StoreResult<bool> {
        let name = name.to_lowercase();
        Ok(self
            .lock()
            .products
            .iter()
            .any(|p| !p.is_deleted && Some(p.id) != exclude && p.name.to_lowercase() == name))
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> StoreResult<Option<Product>> {
        Ok(self
            .lock()
            .products
            .iter()
            .find(|p| p.id == id && (include_deleted || !p.is_deleted))
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str, include_deleted: bool) -> StoreResult<Option<Product>> {
        Ok(self
            .lock()
            .products
            .iter()
            .find(|p| p.slug == slug && (include_deleted || !p.is_deleted))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        Ok(self
            .lock()
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn query(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Product>, i64)> {
        let mut matching: Vec<Product> = self
            .lock()
            .products
            .iter()
            .filter(|p| filter_matches(filter, p))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        matching.sort_by(|a, b| sort_order(sort, a, b));
        let items = match page {
            Some(page) => page.slice(&matching),
            None => matching,
        };
        Ok((items, total))
    }

    async fn update_product(&self, product: &Product) -> StoreResult<Option<Product>> {
        let mut state = self.lock();
        let Some(stored) = state
            .products
            .iter_mut()
            .find(|p| p.id == product.id && !p.is_deleted)
        else {
            return Ok(None);
        };
        *stored = Product {
            slug: stored.slug.clone(),
            rating: stored.rating,
            review_ids: stored.review_ids.clone(),
            created_at: stored.created_at,
            is_deleted: false,
            updated_at: Utc::now(),
            ..product.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn soft_delete(&self, slug: &str) -> StoreResult<bool> {
        let mut state = self.lock();
        match state.products.iter_mut().find(|p| p.slug == slug && !p.is_deleted) {
            Some(product) => {
                product.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn sweep_candidates(&self) -> StoreResult<Vec<Product>> {
        Ok(self.lock().products.iter().filter(|p| !p.is_deleted).cloned().collect())
    }

    async fn write_derived(&self, update: &DerivedUpdate) -> StoreResult<bool> {
        let mut state = self.lock();
        let Some(product) = state.products.iter_mut().find(|p| {
            p.id == update.product_id && !p.is_deleted && SourceFields::of(p) == update.expected
        }) else {
            return Ok(false);
        };
        product.discount_active = update.discount_active;
        product.discount_price = update.discount_price;
        product.is_new = update.is_new;
        Ok(true)
    }

    async fn set_review_summary(&self, product_id: Uuid, review_ids: &[Uuid], rating: f64) -> StoreResult<bool> {
        let mut state = self.lock();
        if state.fail_review_summary {
            return Err(StoreError::Unavailable("catalog store offline".to_string()));
        }
        let Some(product) = state.products.iter_mut().find(|p| p.id == product_id) else {
            return Ok(false);
        };
        product.review_ids = review_ids.to_vec();
        product.rating = rating;
        Ok(true)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .lock()
            .categories
            .iter()
            .filter(|c| c.is_active && !c.is_deleted)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn category_exists(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self
            .lock()
            .categories
            .iter()
            .any(|c| c.id == id && c.is_active && !c.is_deleted))
    }

    async fn facets(&self) -> StoreResult<ProductFacets> {
        let state = self.lock();
        let live: Vec<&Product> = state.products.iter().filter(|p| !p.is_deleted).collect();

        let colors: BTreeSet<String> = live.iter().flat_map(|p| p.colors.iter().cloned()).collect();
        let sizes: BTreeSet<String> = live.iter().flat_map(|p| p.sizes.iter().cloned()).collect();
        let count = |keep: &dyn Fn(&Product) -> bool| live.iter().filter(|p| keep(**p)).count() as i64;

        let mut categories: Vec<CategoryCount> = state
            .categories
            .iter()
            .filter(|c| c.is_active && !c.is_deleted)
            .map(|c| CategoryCount {
                category_id: c.id,
                name: c.name.clone(),
                count: count(&|p| p.category_id == c.id),
            })
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ProductFacets {
            colors: colors.into_iter().collect(),
            sizes: sizes.into_iter().collect(),
            min_price: live.iter().map(|p| p.price).min(),
            max_price: live.iter().map(|p| p.price).max(),
            categories,
            new_count: count(&|p| p.is_new),
            discounted_count: count(&|p| p.discount_active),
            in_stock_count: count(&|p| p.in_stock()),
            out_of_stock_count: count(&|p| !p.in_stock()),
        })
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_or_create(&self, user_id: Uuid) -> StoreResult<Cart> {
        let mut state = self.lock();
        let now = Utc::now();
        let cart = state.carts.entry(user_id).or_insert_with(|| Cart {
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        });
        Ok(cart.clone())
    }

    async fn find(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        Ok(self.lock().carts.get(&user_id).cloned())
    }

    async fn add_item(&self, user_id: Uuid, item: &NewCartItem) -> StoreResult<Option<CartItem>> {
        let now = Utc::now();
        let mut state = self.lock();
        let cart = state.carts.entry(user_id).or_insert_with(|| Cart {
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        });
        cart.updated_at = now;
        if let Some(line) = cart.items.iter_mut().find(|l| l.product_id == item.product_id) {
            let merged = line.quantity + item.quantity;
            if merged > MAX_LINE_QUANTITY {
                return Ok(None);
            }
            line.quantity = merged;
            return Ok(Some(line.clone()));
        }
        let line = CartItem {
            user_id,
            product_id: item.product_id,
            quantity: item.quantity,
            size: item.size.clone(),
            color: item.color.clone(),
            unit_price: item.unit_price,
            unit_discount: item.unit_discount,
            added_at: now,
        };
        cart.items.push(line.clone());
        Ok(Some(line))
    }

    async fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<bool> {
        let mut state = self.lock();
        let line = state
            .carts
            .get_mut(&user_id)
            .and_then(|c| c.items.iter_mut().find(|l| l.product_id == product_id));
        match line {
            Some(line) => {
                line.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let mut state = self.lock();
        let Some(cart) = state.carts.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = cart.items.len();
        cart.items.retain(|l| l.product_id != product_id);
        Ok(cart.items.len() < before)
    }

    async fn clear(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut state = self.lock();
        if state.fail_cart_clear {
            return Err(StoreError::Unavailable("cart store offline".to_string()));
        }
        let removed = state.carts.get_mut(&user_id).map_or(0, |cart| {
            let removed = cart.items.len() as u64;
            cart.items.clear();
            removed
        });
        Ok(removed)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, new_order: &NewOrder) -> StoreResult<OrderInsert> {
        let delay = self.lock().order_insert_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        if state.fail_order_insert {
            return Err(StoreError::Unavailable("order store offline".to_string()));
        }
        if let Some(reference) = &new_order.external_payment_ref {
            let taken = state
                .orders
                .iter()
                .any(|o| o.order.external_payment_ref.as_ref() == Some(reference));
            if taken {
                return Ok(OrderInsert::DuplicatePaymentRef);
            }
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: new_order.user_id,
            subtotal: new_order.subtotal,
            discount_amount: new_order.discount_amount,
            total_amount: new_order.total_amount,
            shipping_address: new_order.shipping_address.clone(),
            phone_number: new_order.phone_number.clone(),
            payment_method: new_order.payment_method,
            payment_status: new_order.payment_status,
            external_payment_ref: new_order.external_payment_ref.clone(),
            coupon_code: new_order.coupon_code.clone(),
            status: FulfillmentStatus::Pending,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = new_order
            .items
            .iter()
            .zip(1..)
            .map(|(item, line_no)| OrderItem {
                order_id: order.id,
                line_no,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                price_at_purchase: item.price_at_purchase,
                size: item.size.clone(),
                color: item.color.clone(),
                subtotal: item.subtotal(),
            })
            .collect();
        let record = OrderWithItems { order, items };
        state.orders.push(record.clone());
        Ok(OrderInsert::Created(record))
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> StoreResult<Option<OrderWithItems>> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.order.id == id && (include_deleted || !o.order.is_deleted))
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OrderWithItems>> {
        Ok(newest_first(&self.lock().orders, |o| o.user_id == user_id && !o.is_deleted))
    }

    async fn list_all(&self, page: Page) -> StoreResult<(Vec<OrderWithItems>, i64)> {
        let all = newest_first(&self.lock().orders, |o| !o.is_deleted);
        let total = all.len() as i64;
        Ok((page.slice(&all), total))
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.lock().orders.iter().filter(|o| !o.order.is_deleted).count() as i64)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: FulfillmentStatus,
        status: FulfillmentStatus,
    ) -> StoreResult<Option<Order>> {
        let mut state = self.lock();
        let record = state
            .orders
            .iter_mut()
            .find(|o| o.order.id == id && !o.order.is_deleted && o.order.status == expected);
        Ok(record.map(|record| {
            record.order.status = status;
            record.order.updated_at = Utc::now();
            record.order.clone()
        }))
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> StoreResult<Option<Order>> {
        let mut state = self.lock();
        let record = state
            .orders
            .iter_mut()
            .find(|o| o.order.id == id && !o.order.is_deleted && o.order.payment_status == expected);
        Ok(record.map(|record| {
            record.order.payment_status = status;
            record.order.updated_at = Utc::now();
            record.order.clone()
        }))
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.lock();
        match state.orders.iter_mut().find(|o| o.order.id == id && !o.order.is_deleted) {
            Some(record) => {
                record.order.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Coupon>> {
        Ok(self.lock().coupons.iter().find(|c| c.code == code).cloned())
    }
}

#[async_trait]
impl PaymentEventLog for MemoryStore {
    async fn record(&self, event: &NewPaymentEvent) -> StoreResult<bool> {
        let mut state = self.lock();
        if state.fail_event_record {
            return Err(StoreError::Unavailable("event log offline".to_string()));
        }
        if state.events.contains_key(&event.event_id) {
            return Ok(false);
        }
        state.events.insert(
            event.event_id.clone(),
            RecordedEvent {
                event: event.clone(),
                outcome: None,
                attempts: 0,
            },
        );
        Ok(true)
    }

    async fn mark_processed(&self, event_id: &str, outcome: &str) -> StoreResult<()> {
        if let Some(recorded) = self.lock().events.get_mut(event_id) {
            recorded.outcome = Some(outcome.to_string());
            recorded.attempts += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert(&self, review: &NewReview) -> StoreResult<Review> {
        let mut state = self.lock();
        if state
            .reviews
            .iter()
            .any(|r| r.user_id == review.user_id && r.product_id == review.product_id)
        {
            return Err(StoreError::UniqueViolation("reviews_user_id_product_id_key".to_string()));
        }
        let now = Utc::now();
        let created = Review {
            id: Uuid::new_v4(),
            user_id: review.user_id,
            product_id: review.product_id,
            rating: review.rating,
            comment: review.comment.clone(),
            images: review.images.clone(),
            is_visible: true,
            created_at: now,
            updated_at: now,
        };
        state.reviews.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Review>> {
        Ok(self.lock().reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_user_and_product(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<Review>> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .find(|r| r.user_id == user_id && r.product_id == product_id)
            .cloned())
    }

    async fn list_visible(&self, product_id: Uuid) -> StoreResult<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .lock()
            .reviews
            .iter()
            .rev()
            .filter(|r| r.product_id == product_id && r.is_visible)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn tally(&self, product_id: Uuid) -> StoreResult<Vec<ReviewTally>> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .map(|r| ReviewTally {
                id: r.id,
                rating: r.rating,
                is_visible: r.is_visible,
            })
            .collect())
    }

    async fn update(&self, id: Uuid, rating: Option<i16>, comment: Option<&str>) -> StoreResult<Option<Review>> {
        let mut state = self.lock();
        Ok(state.reviews.iter_mut().find(|r| r.id == id).map(|review| {
            if let Some(rating) = rating {
                review.rating = rating;
            }
            if let Some(comment) = comment {
                review.comment = comment.to_string();
            }
            review.updated_at = Utc::now();
            review.clone()
        }))
    }

    async fn set_visibility(&self, id: Uuid, is_visible: bool) -> StoreResult<Option<Review>> {
        let mut state = self.lock();
        Ok(state.reviews.iter_mut().find(|r| r.id == id).map(|review| {
            review.is_visible = is_visible;
            review.updated_at = Utc::now();
            review.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.lock();
        let before = state.reviews.len();
        state.reviews.retain(|r| r.id != id);
        Ok(state.reviews.len() < before)
    }
}

#[async_trait]
impl WishlistStore for MemoryStore {
    async fn items(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>> {
        Ok(self
            .lock()
            .wishlist
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let mut state = self.lock();
        if state
            .wishlist
            .iter()
            .any(|w| w.user_id == user_id && w.product_id == product_id)
        {
            return Ok(false);
        }
        state.wishlist.push(WishlistItem {
            user_id,
            product_id,
            added_at: Utc::now(),
        });
        Ok(true)
    }

    async fn remove(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let mut state = self.lock();
        let before = state.wishlist.len();
        state
            .wishlist
            .retain(|w| !(w.user_id == user_id && w.product_id == product_id));
        Ok(state.wishlist.len() < before)
    }

    async fn clear(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut state = self.lock();
        let before = state.wishlist.len();
        state.wishlist.retain(|w| w.user_id != user_id);
        Ok((before - state.wishlist.len()) as u64)
    }
}

/// Builds consistent products for seeding
pub struct ProductBuilder {
    product: Product,
}

impl ProductBuilder {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            product: Product {
                id: Uuid::new_v4(),
                name: name.to_string(),
                slug: slugify(name),
                description: Some(format!("{} description", name)),
                price: Decimal::TEN,
                old_price: None,
                category_id: Uuid::new_v4(),
                quantity: 10,
                colors: Vec::new(),
                sizes: Vec::new(),
                images: vec![format!("https://img.example.com/{}.png", slugify(name))],
                rating: 0.0,
                review_ids: Vec::new(),
                discount_percentage: Decimal::ZERO,
                discount_price: Decimal::ZERO,
                discount_start: None,
                discount_end: None,
                discount_active: false,
                is_new: false,
                new_until: None,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn price(mut self, price: Decimal) -> Self {
        self.product.price = price;
        self
    }

    pub fn category(mut self, category_id: Uuid) -> Self {
        self.product.category_id = category_id;
        self
    }

    pub fn quantity(mut self, quantity: i32) -> Self {
        self.product.quantity = quantity;
        self
    }

    /// Discount window open from an hour ago to an hour from now
    pub fn active_discount(mut self, percentage: Decimal) -> Self {
        let now = Utc::now();
        self.product.discount_percentage = percentage;
        self.product.discount_start = Some(now - ChronoDuration::hours(1));
        self.product.discount_end = Some(now + ChronoDuration::hours(1));
        self
    }

    pub fn new_until(mut self, until: DateTime<Utc>) -> Self {
        self.product.new_until = Some(until);
        self
    }

    pub fn build(mut self) -> Product {
        self.product.refresh_derived(Utc::now());
        self.product
    }
}

pub const FAKE_WEBHOOK_SECRET: &str = "whsec_fake";

/// [`PaymentGateway`] that signs and verifies like the real one but never
/// leaves the process
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<Vec<SessionRequest>>,
    fail_create: Mutex<bool>,
}

impl FakeGateway {
    /// Signature header for `body`, as the gateway would send it now
    pub fn sign(body: &[u8]) -> String {
        signature::sign(body, FAKE_WEBHOOK_SECRET, Utc::now().timestamp())
    }

    pub fn sessions(&self) -> Vec<SessionRequest> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn fail_session_creation(&self) {
        *self.fail_create.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = true;
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<CheckoutSession, GatewayError> {
        if *self.fail_create.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            return Err(GatewayError::Timeout);
        }
        let mut sessions = self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.push(request.clone());
        let session_id = format!("cs_test_{}", sessions.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.example.com/pay/{}", session_id),
            session_id,
        })
    }

    fn verify_event(&self, raw_body: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError> {
        signature::verify(
            raw_body,
            signature,
            FAKE_WEBHOOK_SECRET,
            Duration::from_secs(300),
            Utc::now().timestamp(),
        )?;
        Ok(decode_event(raw_body))
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError> {
        let sessions = self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = session_id
            .strip_prefix("cs_test_")
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n >= 1 && *n <= sessions.len())
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        let request = &sessions[index - 1];
        Ok(SessionStatus {
            status: "paid".to_string(),
            buyer: serde_json::json!({"email": "buyer@example.com"}),
            metadata: request
                .metadata
                .pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }
}
