use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::catalog::query::{ProductFilter, ProductQuery, ProductSort};
use crate::query::Page;
use crate::catalog::slug::{candidate, slugify};
use crate::catalog::{
    CatalogError, CatalogStore, Category, CreateProductRequest, DiscountInput, DiscountProgress,
    DiscountedProducts, Product, ProductFacets, ProductPage, ProductResponse, SweepReport,
    UpdateProductRequest,
};
use crate::pricing::PricingPolicy;

/// Number of products returned by the best-selling listing
pub const BEST_SELLING_LIMIT: u32 = 8;

/// Service for catalog business logic
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Create a product
    ///
    /// # Validation
    /// - Request fields pass `validator` rules
    /// - Category must exist and be active
    /// - Name must be unique among live products
    /// - Slug is derived from the name and never changes afterwards
    /// - Novelty defaults to on, opening a 24h window
    pub async fn create_product(&self, request: CreateProductRequest) -> Result<Product, CatalogError> {
        request.validate()?;

        if !self.store.category_exists(request.category_id).await? {
            return Err(CatalogError::UnknownCategory(request.category_id));
        }

        let name = request.name.trim().to_string();
        if self.store.name_exists(&name, None).await? {
            warn!("Attempt to create duplicate product: {}", name);
            return Err(CatalogError::DuplicateName(name));
        }

        let slug = self.assign_slug(&name).await?;
        let now = Utc::now();
        let (discount_percentage, discount_start, discount_end) = discount_fields(request.discount);

        let mut product = Product {
            id: Uuid::new_v4(),
            name,
            slug,
            description: request.description,
            price: request.price,
            old_price: request.old_price,
            category_id: request.category_id,
            quantity: request.quantity,
            colors: request.colors,
            sizes: request.sizes,
            images: request.images,
            rating: 0.0,
            review_ids: Vec::new(),
            discount_percentage,
            discount_price: Decimal::ZERO,
            discount_start,
            discount_end,
            discount_active: false,
            is_new: false,
            new_until: request
                .is_new
                .unwrap_or(true)
                .then(|| PricingPolicy::novelty_deadline(now)),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        product.refresh_derived(now);

        let created = self.store.insert_product(&product).await?;
        info!("Created product {} with slug {}", created.id, created.slug);
        Ok(created)
    }

    /// First free slug among `base`, `base-1`, `base-2`, ...
    async fn assign_slug(&self, name: &str) -> Result<String, CatalogError> {
        let base = slugify(name);
        if base.is_empty() {
            return Err(CatalogError::UnsluggableName);
        }

        let mut n = 0;
        loop {
            let slug = candidate(&base, n);
            if !self.store.slug_exists(&slug).await? {
                return Ok(slug);
            }
            n += 1;
        }
    }

    /// Fetch a live product by slug with derived fields evaluated now
    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        let mut product = self
            .store
            .find_by_slug(slug, false)
            .await?
            .ok_or_else(|| CatalogError::NotFound(slug.to_string()))?;
        product.refresh_derived(Utc::now());
        Ok(product)
    }

    /// Fetch a live product by id with derived fields evaluated now
    pub async fn get_by_id(&self, id: Uuid) -> Result<Product, CatalogError> {
        let mut product = self
            .store
            .find_by_id(id, false)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        product.refresh_derived(Utc::now());
        Ok(product)
    }

    /// Partially update a product identified by slug
    pub async fn update_product(
        &self,
        slug: &str,
        request: UpdateProductRequest,
    ) -> Result<Product, CatalogError> {
        request.validate()?;

        let mut product = self
            .store
            .find_by_slug(slug, false)
            .await?
            .ok_or_else(|| CatalogError::NotFound(slug.to_string()))?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name != product.name && self.store.name_exists(&name, Some(product.id)).await? {
                warn!("Attempt to rename product {} to duplicate name: {}", product.id, name);
                return Err(CatalogError::DuplicateName(name));
            }
            product.name = name;
        }
        if let Some(category_id) = request.category_id {
            if category_id != product.category_id && !self.store.category_exists(category_id).await? {
                return Err(CatalogError::UnknownCategory(category_id));
            }
            product.category_id = category_id;
        }
        if let Some(description) = request.description {
            product.description = Some(description);
        }
        if let Some(price) = request.price {
            product.price = price;
        }
        if let Some(old_price) = request.old_price {
            product.old_price = Some(old_price);
        }
        if let Some(quantity) = request.quantity {
            product.quantity = quantity;
        }
        if let Some(colors) = request.colors {
            product.colors = colors;
        }
        if let Some(sizes) = request.sizes {
            product.sizes = sizes;
        }
        if let Some(images) = request.images {
            product.images = images;
        }

        let now = Utc::now();
        if request.discount.is_some() {
            let (percentage, start, end) = discount_fields(request.discount);
            product.discount_percentage = percentage;
            product.discount_start = start;
            product.discount_end = end;
        }
        match request.is_new {
            Some(true) => product.new_until = Some(PricingPolicy::novelty_deadline(now)),
            Some(false) => product.new_until = None,
            None => {}
        }
        product.refresh_derived(now);

        let updated = self
            .store
            .update_product(&product)
            .await?
            .ok_or_else(|| CatalogError::NotFound(slug.to_string()))?;

        info!("Updated product {}", updated.id);
        Ok(updated)
    }

    pub async fn soft_delete(&self, slug: &str) -> Result<(), CatalogError> {
        if !self.store.soft_delete(slug).await? {
            return Err(CatalogError::NotFound(slug.to_string()));
        }
        info!("Soft-deleted product {}", slug);
        Ok(())
    }

    /// Re-evaluate derived fields on every live product and persist the ones
    /// that changed
    ///
    /// Idempotent; a second run right after the first finds nothing stale.
    pub async fn sweep(&self) -> Result<SweepReport, CatalogError> {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, CatalogError> {
        let products = self.store.sweep_candidates().await?;
        let mut report = SweepReport {
            scanned: products.len(),
            ..Default::default()
        };

        for update in products.iter().filter_map(|p| p.stale_derived(now)) {
            if self.store.write_derived(&update).await? {
                report.updated += 1;
            } else {
                debug!("Product {} changed during sweep, leaving it to the next pass", update.product_id);
                report.skipped += 1;
            }
        }

        if report.updated > 0 {
            info!(
                "Sweep refreshed {} of {} products ({} skipped)",
                report.updated, report.scanned, report.skipped
            );
        }
        Ok(report)
    }

    /// Sweep ahead of a listing; a failed sweep leaves derived fields stale
    /// rather than failing the read
    async fn sweep_before_read(&self) {
        if let Err(err) = self.sweep().await {
            warn!("Sweep before catalog read failed: {}", err);
        }
    }

    async fn fetch(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: Option<Page>,
    ) -> Result<(Vec<Product>, i64), CatalogError> {
        self.sweep_before_read().await;
        let (mut items, total) = self.store.query(filter, sort, page).await?;
        let now = Utc::now();
        for product in &mut items {
            product.refresh_derived(now);
        }
        Ok((items, total))
    }

    /// Filtered, sorted, paginated listing
    pub async fn list(&self, query: ProductQuery) -> Result<ProductPage, CatalogError> {
        debug!("Listing products: {:?}", query);
        let (items, total) = self.fetch(&query.filter, query.sort, Some(query.page)).await?;

        Ok(ProductPage {
            items: items.into_iter().map(ProductResponse::from).collect(),
            total,
            page: query.page.number,
            limit: query.page.size,
            total_pages: query.page.total_pages(total),
        })
    }

    /// Every product currently flagged new, newest first
    pub async fn new_products(&self) -> Result<Vec<Product>, CatalogError> {
        let filter = ProductFilter {
            new_only: true,
            ..Default::default()
        };
        let (items, _) = self.fetch(&filter, ProductSort::Newest, None).await?;
        Ok(items)
    }

    /// Products with an active discount, latest window end first, plus the
    /// progress of the longest-running one
    pub async fn discounted_products(&self) -> Result<DiscountedProducts, CatalogError> {
        let filter = ProductFilter {
            discount_only: true,
            ..Default::default()
        };
        let (items, _) = self
            .fetch(&filter, ProductSort::DiscountEndingLast, None)
            .await?;

        let now = Utc::now();
        let longest = items.first().and_then(|p| p.discount_start.zip(p.discount_end));

        Ok(DiscountedProducts {
            longest_expiry: longest.map(|(_, end)| end),
            discount_progress: longest.map(|(start, end)| DiscountProgress::of_window(start, end, now)),
            items: items.into_iter().map(ProductResponse::from).collect(),
        })
    }

    /// Top products by rating
    pub async fn best_selling(&self) -> Result<Vec<Product>, CatalogError> {
        let (items, _) = self
            .fetch(
                &ProductFilter::default(),
                ProductSort::Rating,
                Some(Page::new(1, BEST_SELLING_LIMIT)),
            )
            .await?;
        Ok(items)
    }

    pub async fn facets(&self) -> Result<ProductFacets, CatalogError> {
        self.sweep_before_read().await;
        Ok(self.store.facets().await?)
    }

    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }
}

fn discount_fields(
    discount: Option<DiscountInput>,
) -> (Decimal, Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match discount {
        Some(d) => (d.percentage, d.window_start, d.window_end),
        None => (Decimal::ZERO, None, None),
    }
}

/// Run the sweep every `interval` until the task is aborted
pub fn spawn_sweeper(service: CatalogService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(err) = service.sweep().await {
                warn!("Background sweep failed: {}", err);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::query::ProductQueryParams;
    use crate::testing::{MemoryStore, ProductBuilder};
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    fn request(name: &str, category_id: Uuid) -> CreateProductRequest {
        CreateProductRequest {
            name: name.to_string(),
            description: Some("Breathable summer shirt".into()),
            price: dec!(100),
            old_price: None,
            category_id,
            quantity: 5,
            colors: vec!["white".into()],
            sizes: vec!["M".into()],
            images: vec![],
            discount: None,
            is_new: None,
        }
    }

    fn setup() -> (CatalogService, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::default());
        let category_id = store.add_category("Shirts");
        (CatalogService::new(store.clone()), store, category_id)
    }

    #[tokio::test]
    async fn test_create_assigns_slug_and_novelty() {
        let (service, _, category) = setup();
        let product = service.create_product(request("Linen Shirt", category)).await.unwrap();

        assert_eq!(product.slug, "linen-shirt");
        assert!(product.is_new);
        let window = product.new_until.unwrap() - product.created_at;
        assert_eq!(window, ChronoDuration::hours(24));
    }

    #[tokio::test]
    async fn test_slug_collisions_get_numeric_suffix() {
        let (service, _, category) = setup();
        service.create_product(request("Linen Shirt", category)).await.unwrap();
        let second = service.create_product(request("Linen  Shirt!", category)).await.unwrap();
        let third = service.create_product(request("Linen Shirt?", category)).await.unwrap();

        assert_eq!(second.slug, "linen-shirt-1");
        assert_eq!(third.slug, "linen-shirt-2");
    }

    #[tokio::test]
    async fn test_name_without_ascii_slug_is_rejected() {
        let (service, store, category) = setup();
        let result = service.create_product(request("قميص كتان", category)).await;

        assert!(matches!(result, Err(CatalogError::UnsluggableName)));
        assert!(store.sweep_candidates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() {
        let (service, _, category) = setup();
        service.create_product(request("Linen Shirt", category)).await.unwrap();
        let result = service.create_product(request("linen shirt", category)).await;
        assert!(matches!(result, Err(CatalogError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_unknown_category_rejected() {
        let (service, _, _) = setup();
        let result = service.create_product(request("Linen Shirt", Uuid::new_v4())).await;
        assert!(matches!(result, Err(CatalogError::UnknownCategory(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_slug_and_recomputes_discount() {
        let (service, _, category) = setup();
        service.create_product(request("Linen Shirt", category)).await.unwrap();

        let now = Utc::now();
        let update = UpdateProductRequest {
            name: Some("Linen Shirt Deluxe".into()),
            discount: Some(DiscountInput {
                percentage: dec!(20),
                window_start: Some(now - ChronoDuration::hours(1)),
                window_end: Some(now + ChronoDuration::hours(1)),
            }),
            ..Default::default()
        };
        let updated = service.update_product("linen-shirt", update).await.unwrap();

        assert_eq!(updated.slug, "linen-shirt");
        assert_eq!(updated.name, "Linen Shirt Deluxe");
        assert!(updated.discount_active);
        assert_eq!(updated.discount_price, dec!(80));
    }

    #[tokio::test]
    async fn test_soft_deleted_product_is_hidden() {
        let (service, _, category) = setup();
        service.create_product(request("Linen Shirt", category)).await.unwrap();
        service.soft_delete("linen-shirt").await.unwrap();

        assert!(matches!(
            service.get_by_slug("linen-shirt").await,
            Err(CatalogError::NotFound(_))
        ));
        let page = service
            .list(ProductQuery::from_params(ProductQueryParams::default()).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(matches!(
            service.soft_delete("linen-shirt").await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let (service, store, category) = setup();
        let product = service.create_product(request("Linen Shirt", category)).await.unwrap();

        // Novelty window elapses without anyone touching the row
        let later = product.new_until.unwrap() + ChronoDuration::seconds(1);
        let first = service.sweep_at(later).await.unwrap();
        let second = service.sweep_at(later).await.unwrap();

        assert_eq!(first.updated, 1);
        assert_eq!(second.updated, 0);
        assert!(!store.product(product.id).unwrap().is_new);
    }

    #[tokio::test]
    async fn test_sweep_skips_rows_edited_since_read() {
        let (service, store, category) = setup();
        let product = service.create_product(request("Linen Shirt", category)).await.unwrap();
        let later = product.new_until.unwrap() + ChronoDuration::seconds(1);

        let mut update = store.product(product.id).unwrap().stale_derived(later).unwrap();
        update.expected.price = dec!(1);
        assert!(!store.write_derived(&update).await.unwrap());
    }

    /// Two rows whose stored flags disagree with the clock: one discount window
    /// opened without the flag being set, one novelty window that has elapsed
    fn seed_stale_rows(store: &MemoryStore, category: Uuid) -> (Uuid, Uuid) {
        let now = Utc::now();
        let mut opened = ProductBuilder::new("Opened Sale").category(category).build();
        opened.discount_percentage = dec!(25);
        opened.discount_start = Some(now - ChronoDuration::hours(1));
        opened.discount_end = Some(now + ChronoDuration::hours(2));
        opened.discount_active = false;
        opened.discount_price = Decimal::ZERO;

        let mut expired = ProductBuilder::new("Last Season").category(category).build();
        expired.is_new = true;
        expired.new_until = Some(now - ChronoDuration::hours(1));

        let opened = store.seed_product(opened);
        let expired = store.seed_product(expired);
        (opened.id, expired.id)
    }

    #[tokio::test]
    async fn test_listing_filters_on_current_discount_state() {
        let (service, store, category) = setup();
        let (opened, _) = seed_stale_rows(&store, category);

        let params = ProductQueryParams {
            discount: Some(true),
            ..Default::default()
        };
        let page = service.list(ProductQuery::from_params(params).unwrap()).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, opened);
        assert_eq!(page.items[0].discount.discounted_price, dec!(75));
    }

    #[tokio::test]
    async fn test_new_and_discounted_views_ignore_stale_flags() {
        let (service, store, category) = setup();
        let (opened, expired) = seed_stale_rows(&store, category);

        let new_products = service.new_products().await.unwrap();
        assert!(new_products.iter().all(|p| p.id != expired));

        let discounted = service.discounted_products().await.unwrap();
        assert_eq!(discounted.items.len(), 1);
        assert_eq!(discounted.items[0].id, opened);
        assert!(discounted.items[0].discount.is_active);
        assert_eq!(discounted.items[0].discount.discounted_price, dec!(75));

        // The read repaired the stored rows too
        assert!(store.product(opened).unwrap().discount_active);
        assert!(!store.product(expired).unwrap().is_new);
    }

    #[tokio::test]
    async fn test_list_total_is_independent_of_page() {
        let (service, _, category) = setup();
        for i in 0..5 {
            service
                .create_product(request(&format!("Shirt {}", i), category))
                .await
                .unwrap();
        }

        let params = ProductQueryParams {
            limit: Some(2),
            page: Some(3),
            sort: Some("name-asc".into()),
            ..Default::default()
        };
        let page = service.list(ProductQuery::from_params(params).unwrap()).await.unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].name, "Shirt 4");
    }

    #[tokio::test]
    async fn test_discounted_products_report_progress() {
        let (service, _, category) = setup();
        let now = Utc::now();
        let mut req = request("Linen Shirt", category);
        req.discount = Some(DiscountInput {
            percentage: dec!(10),
            window_start: Some(now - ChronoDuration::hours(1)),
            window_end: Some(now + ChronoDuration::hours(3)),
        });
        service.create_product(req).await.unwrap();
        service.create_product(request("Plain Tee", category)).await.unwrap();

        let discounted = service.discounted_products().await.unwrap();
        assert_eq!(discounted.items.len(), 1);
        assert_eq!(discounted.longest_expiry, Some(now + ChronoDuration::hours(3)));
        let progress = discounted.discount_progress.unwrap();
        assert_eq!(progress.total_duration_ms, 4 * 3_600_000);
        assert!(progress.percent_complete > 20.0 && progress.percent_complete < 30.0);
    }
}
