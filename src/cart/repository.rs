use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::cart::{Cart, CartItem, NewCartItem, MAX_LINE_QUANTITY};
use crate::db::StoreResult;

/// Persistence for the single active cart per user
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Existing cart, or a newly created empty one
    async fn get_or_create(&self, user_id: Uuid) -> StoreResult<Cart>;

    async fn find(&self, user_id: Uuid) -> StoreResult<Option<Cart>>;

    /// Merge a line into the cart
    ///
    /// An existing line for the product has its quantity incremented and
    /// keeps its size, color and prices. Returns the resulting line.
    /// `None` when the merged quantity would exceed [`MAX_LINE_QUANTITY`];
    /// the cart is left unchanged.
    async fn add_item(&self, user_id: Uuid, item: &NewCartItem) -> StoreResult<Option<CartItem>>;

    /// Set an absolute quantity; false if the line does not exist
    async fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<bool>;

    /// Remove a line; false if it was not there
    async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;

    /// Remove every line; returns how many were removed
    async fn clear(&self, user_id: Uuid) -> StoreResult<u64>;
}

/// PostgreSQL implementation of [`CartStore`]
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, user_id: Uuid) -> StoreResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT user_id, product_id, quantity, size, color, unit_price, unit_discount, added_at
            FROM cart_items
            WHERE user_id = $1
            ORDER BY added_at, product_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn get_or_create(&self, user_id: Uuid) -> StoreResult<Cart> {
        let (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING created_at, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Cart {
            user_id,
            items: self.load_items(user_id).await?,
            created_at,
            updated_at,
        })
    }

    async fn find(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        let header: Option<(DateTime<Utc>, DateTime<Utc>)> =
            sqlx::query_as("SELECT created_at, updated_at FROM carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        match header {
            Some((created_at, updated_at)) => Ok(Some(Cart {
                user_id,
                items: self.load_items(user_id).await?,
                created_at,
                updated_at,
            })),
            None => Ok(None),
        }
    }

    async fn add_item(&self, user_id: Uuid, item: &NewCartItem) -> StoreResult<Option<CartItem>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO carts (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        // Atomic merge: concurrent adds for the same product never lose an increment
        let line = sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity, size, color, unit_price, unit_discount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity + EXCLUDED.quantity <= $8
            RETURNING user_id, product_id, quantity, size, color, unit_price, unit_discount, added_at
            "#,
        )
        .bind(user_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(&item.size)
        .bind(&item.color)
        .bind(item.unit_price)
        .bind(item.unit_discount)
        .bind(MAX_LINE_QUANTITY)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls back the cart touch as well
        let Some(line) = line else {
            return Ok(None);
        };

        tx.commit().await?;
        Ok(Some(line))
    }

    async fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
