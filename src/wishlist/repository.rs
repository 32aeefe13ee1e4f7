use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreResult;
use crate::wishlist::WishlistItem;

/// Persistence for per-user wishlists
///
/// A wishlist exists as soon as it has an entry; `(user_id, product_id)` is
/// the key, so a product appears at most once.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// Oldest first
    async fn items(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>>;

    /// False when the product was already on the list
    async fn add(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;

    async fn remove(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;

    async fn clear(&self, user_id: Uuid) -> StoreResult<u64>;
}

/// PostgreSQL implementation of [`WishlistStore`]
#[derive(Clone)]
pub struct PgWishlistStore {
    pool: PgPool,
}

impl PgWishlistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WishlistStore for PgWishlistStore {
    async fn items(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>> {
        let items = sqlx::query_as::<_, WishlistItem>(
            r#"
            SELECT user_id, product_id, added_at
            FROM wishlist_items
            WHERE user_id = $1
            ORDER BY added_at, product_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn add(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO wishlist_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
