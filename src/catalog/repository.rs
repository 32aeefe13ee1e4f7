use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::query::{ProductFilter, ProductQueryBuilder, ProductSort, SqlParam, PRODUCT_COLUMNS};
use crate::query::Page;
use crate::catalog::{Category, CategoryCount, DerivedUpdate, Product, ProductFacets};
use crate::db::StoreResult;

/// Persistence for products and categories
///
/// Soft-deleted rows are only returned when a method is asked for them
/// explicitly; nothing filters implicitly.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<Product>;

    /// Any product (deleted or not) already owns this slug
    async fn slug_exists(&self, slug: &str) -> StoreResult<bool>;

    /// A live product other than `exclude` has this name (case-insensitive)
    async fn name_exists(&self, name: &str, exclude: Option<Uuid>) -> StoreResult<bool>;

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> StoreResult<Option<Product>>;

    async fn find_by_slug(&self, slug: &str, include_deleted: bool) -> StoreResult<Option<Product>>;

    /// Products with the given ids, deleted ones included
    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;

    /// Matching products for one page (all of them when `page` is `None`)
    /// together with the total match count
    async fn query(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Product>, i64)>;

    /// Overwrite the editable and derived columns of a live product
    async fn update_product(&self, product: &Product) -> StoreResult<Option<Product>>;

    async fn soft_delete(&self, slug: &str) -> StoreResult<bool>;

    /// Every live product, for the derived-field sweep
    async fn sweep_candidates(&self) -> StoreResult<Vec<Product>>;

    /// Apply a derived-field update if the source fields are unchanged
    ///
    /// Returns false when the row moved on (or vanished) since it was read.
    async fn write_derived(&self, update: &DerivedUpdate) -> StoreResult<bool>;

    /// Overwrite the review references and rating in one write
    async fn set_review_summary(&self, product_id: Uuid, review_ids: &[Uuid], rating: f64) -> StoreResult<bool>;

    /// Active, non-deleted categories by name
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    async fn category_exists(&self, id: Uuid) -> StoreResult<bool>;

    async fn facets(&self) -> StoreResult<ProductFacets>;
}

/// PostgreSQL implementation of [`CatalogStore`]
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_rows<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    params: Vec<SqlParam>,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Text(value) => query.bind(value),
            SqlParam::Decimal(value) => query.bind(value),
            SqlParam::Uuids(value) => query.bind(value),
            SqlParam::Texts(value) => query.bind(value),
        };
    }
    query
}

fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    params: Vec<SqlParam>,
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Text(value) => query.bind(value),
            SqlParam::Decimal(value) => query.bind(value),
            SqlParam::Uuids(value) => query.bind(value),
            SqlParam::Texts(value) => query.bind(value),
        };
    }
    query
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (
                id, name, slug, description, price, old_price, category_id, quantity,
                colors, sizes, images, rating, review_ids, discount_percentage, discount_price,
                discount_start, discount_end, discount_active, is_new, new_until, is_deleted,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let created = sqlx::query_as::<_, Product>(&sql)
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.slug)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.old_price)
            .bind(product.category_id)
            .bind(product.quantity)
            .bind(&product.colors)
            .bind(&product.sizes)
            .bind(&product.images)
            .bind(product.rating)
            .bind(&product.review_ids)
            .bind(product.discount_percentage)
            .bind(product.discount_price)
            .bind(product.discount_start)
            .bind(product.discount_end)
            .bind(product.discount_active)
            .bind(product.is_new)
            .bind(product.new_until)
            .bind(product.is_deleted)
            .bind(product.created_at)
            .bind(product.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn name_exists(&self, name: &str, exclude: Option<Uuid>) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM products
                WHERE LOWER(name) = LOWER($1)
                  AND is_deleted = FALSE
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> StoreResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = $1 AND ($2 OR is_deleted = FALSE)",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn find_by_slug(&self, slug: &str, include_deleted: bool) -> StoreResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE slug = $1 AND ($2 OR is_deleted = FALSE)",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(slug)
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn query(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: Option<Page>,
    ) -> StoreResult<(Vec<Product>, i64)> {
        let builder = ProductQueryBuilder::new(filter);

        let (page_sql, page_params) = builder.build_page(sort, page);
        let items = bind_rows(sqlx::query_as::<_, Product>(&page_sql), page_params)
            .fetch_all(&self.pool)
            .await?;

        let (count_sql, count_params) = builder.build_count();
        let total: i64 = bind_scalar(sqlx::query_scalar(&count_sql), count_params)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }

    async fn update_product(&self, product: &Product) -> StoreResult<Option<Product>> {
        let sql = format!(
            r#"
            UPDATE products
            SET name = $2,
                description = $3,
                price = $4,
                old_price = $5,
                category_id = $6,
                quantity = $7,
                colors = $8,
                sizes = $9,
                images = $10,
                discount_percentage = $11,
                discount_price = $12,
                discount_start = $13,
                discount_end = $14,
                discount_active = $15,
                is_new = $16,
                new_until = $17,
                updated_at = NOW()
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.old_price)
            .bind(product.category_id)
            .bind(product.quantity)
            .bind(&product.colors)
            .bind(&product.sizes)
            .bind(&product.images)
            .bind(product.discount_percentage)
            .bind(product.discount_price)
            .bind(product.discount_start)
            .bind(product.discount_end)
            .bind(product.discount_active)
            .bind(product.is_new)
            .bind(product.new_until)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    async fn soft_delete(&self, slug: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET is_deleted = TRUE, updated_at = NOW() WHERE slug = $1 AND is_deleted = FALSE",
        )
        .bind(slug)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sweep_candidates(&self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products WHERE is_deleted = FALSE", PRODUCT_COLUMNS);
        let products = sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?;
        Ok(products)
    }

    async fn write_derived(&self, update: &DerivedUpdate) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET discount_active = $2,
                discount_price = $3,
                is_new = $4
            WHERE id = $1
              AND is_deleted = FALSE
              AND price = $5
              AND discount_percentage = $6
              AND discount_start IS NOT DISTINCT FROM $7
              AND discount_end IS NOT DISTINCT FROM $8
              AND new_until IS NOT DISTINCT FROM $9
            "#,
        )
        .bind(update.product_id)
        .bind(update.discount_active)
        .bind(update.discount_price)
        .bind(update.is_new)
        .bind(update.expected.price)
        .bind(update.expected.discount_percentage)
        .bind(update.expected.discount_start)
        .bind(update.expected.discount_end)
        .bind(update.expected.new_until)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_review_summary(&self, product_id: Uuid, review_ids: &[Uuid], rating: f64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE products SET review_ids = $2, rating = $3 WHERE id = $1")
            .bind(product_id)
            .bind(review_ids)
            .bind(rating)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, slug, description, image_url, is_active, is_deleted, created_at
            FROM categories
            WHERE is_active = TRUE AND is_deleted = FALSE
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn category_exists(&self, id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND is_active = TRUE AND is_deleted = FALSE)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn facets(&self) -> StoreResult<ProductFacets> {
        let colors: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT c FROM products, unnest(colors) AS c WHERE is_deleted = FALSE ORDER BY c",
        )
        .fetch_all(&self.pool)
        .await?;

        let sizes: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT s FROM products, unnest(sizes) AS s WHERE is_deleted = FALSE ORDER BY s",
        )
        .fetch_all(&self.pool)
        .await?;

        let (min_price, max_price, new_count, discounted_count, in_stock_count, out_of_stock_count): (
            Option<Decimal>,
            Option<Decimal>,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT MIN(price),
                   MAX(price),
                   COUNT(*) FILTER (WHERE is_new),
                   COUNT(*) FILTER (WHERE discount_active),
                   COUNT(*) FILTER (WHERE quantity > 0),
                   COUNT(*) FILTER (WHERE quantity <= 0)
            FROM products
            WHERE is_deleted = FALSE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let categories = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT c.id AS category_id, c.name, COUNT(p.id) AS count
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id AND p.is_deleted = FALSE
            WHERE c.is_active = TRUE AND c.is_deleted = FALSE
            GROUP BY c.id, c.name
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ProductFacets {
            colors,
            sizes,
            min_price,
            max_price,
            categories,
            new_count,
            discounted_count,
            in_stock_count,
            out_of_stock_count,
        })
    }
}
