use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::wishlist::{WishlistChange, WishlistError, WishlistStore, WishlistView};

#[derive(Clone)]
pub struct WishlistService {
    wishlists: Arc<dyn WishlistStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl WishlistService {
    pub fn new(wishlists: Arc<dyn WishlistStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { wishlists, catalog }
    }

    pub async fn view(&self, user_id: Uuid) -> Result<WishlistView, WishlistError> {
        let entries = self.wishlists.items(user_id).await?;
        let ids: Vec<Uuid> = entries.iter().map(|e| e.product_id).collect();
        let mut products = if ids.is_empty() {
            Vec::new()
        } else {
            self.catalog.find_by_ids(&ids).await?
        };
        let now = Utc::now();
        for product in &mut products {
            product.refresh_derived(now);
        }
        Ok(WishlistView::build(user_id, &entries, &products))
    }

    /// Add a live product; adding it twice is not an error
    pub async fn add(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistChange, WishlistError> {
        if self.catalog.find_by_id(product_id, false).await?.is_none() {
            return Err(WishlistError::ProductNotFound(product_id));
        }
        let inserted = self.wishlists.add(user_id, product_id).await?;
        if inserted {
            info!("User {} wishlisted product {}", user_id, product_id);
        } else {
            debug!("Product {} already on wishlist of user {}", product_id, user_id);
        }
        Ok(WishlistChange {
            already_present: !inserted,
            wishlist: self.view(user_id).await?,
        })
    }

    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<WishlistView, WishlistError> {
        self.wishlists.remove(user_id, product_id).await?;
        self.view(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<(), WishlistError> {
        let removed = self.wishlists.clear(user_id).await?;
        info!("Cleared {} entries from wishlist of user {}", removed, user_id);
        Ok(())
    }
}
