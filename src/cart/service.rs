use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::cart::{AddCartItemRequest, CartError, CartStore, CartView, NewCartItem, MAX_LINE_QUANTITY};
use crate::catalog::{CatalogStore, Product};

/// Service for cart business logic
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { carts, catalog }
    }

    /// Current cart resolved to live product data
    pub async fn view(&self, user_id: Uuid) -> Result<CartView, CartError> {
        let cart = self.carts.get_or_create(user_id).await?;
        let products = self.resolve_products(&cart.product_ids()).await?;
        debug!("Cart for user {} has {} lines", user_id, cart.items.len());
        Ok(CartView::build(&cart, &products))
    }

    /// Add a product, merging into an existing line for the same product
    ///
    /// The unit price is the product's effective price right now and the
    /// unit discount is what that price saves against the base price.
    pub async fn add_item(&self, user_id: Uuid, request: AddCartItemRequest) -> Result<CartView, CartError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&request.quantity) {
            return Err(CartError::InvalidQuantity(request.quantity));
        }
        request.validate()?;

        let mut product = self
            .catalog
            .find_by_id(request.product_id, false)
            .await?
            .ok_or(CartError::ProductNotFound(request.product_id))?;
        product.refresh_derived(Utc::now());

        let unit_price = product.effective_price();
        let item = NewCartItem {
            product_id: product.id,
            quantity: request.quantity,
            size: request.size,
            color: request.color,
            unit_price,
            unit_discount: product.price - unit_price,
        };

        let line = self
            .carts
            .add_item(user_id, &item)
            .await?
            .ok_or(CartError::LineLimitExceeded(item.product_id))?;
        info!(
            "User {} added {} x {} (line quantity now {})",
            user_id, item.quantity, item.product_id, line.quantity
        );
        self.view(user_id).await
    }

    /// Set the absolute quantity of an existing line
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(CartError::InvalidQuantity(quantity));
        }
        if !self.carts.set_quantity(user_id, product_id, quantity).await? {
            return Err(CartError::ItemNotFound(product_id));
        }
        self.view(user_id).await
    }

    /// Remove a line; removing an absent line is not an error
    pub async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView, CartError> {
        if !self.carts.remove_item(user_id, product_id).await? {
            debug!("Product {} was not in cart of user {}", product_id, user_id);
        }
        self.view(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<(), CartError> {
        let removed = self.carts.clear(user_id).await?;
        info!("Cleared {} lines from cart of user {}", removed, user_id);
        Ok(())
    }

    async fn resolve_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, CartError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut products = self.catalog.find_by_ids(ids).await?;
        let now = Utc::now();
        for product in &mut products {
            product.refresh_derived(now);
        }
        Ok(products)
    }
}
