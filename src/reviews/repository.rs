use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreResult;
use crate::reviews::{NewReview, Review, ReviewTally};

const REVIEW_COLUMNS: &str =
    "id, user_id, product_id, rating, comment, images, is_visible, created_at, updated_at";

/// Persistence for reviews
///
/// `insert` surfaces a second review for the same (user, product) pair as
/// [`StoreError::UniqueViolation`](crate::db::StoreError::UniqueViolation).
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, review: &NewReview) -> StoreResult<Review>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Review>>;

    async fn find_by_user_and_product(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<Review>>;

    /// Visible reviews for a product, newest first
    async fn list_visible(&self, product_id: Uuid) -> StoreResult<Vec<Review>>;

    /// Id, rating and visibility of every review of a product, oldest first
    async fn tally(&self, product_id: Uuid) -> StoreResult<Vec<ReviewTally>>;

    /// Apply the given fields; `None` leaves a field unchanged
    async fn update(&self, id: Uuid, rating: Option<i16>, comment: Option<&str>) -> StoreResult<Option<Review>>;

    async fn set_visibility(&self, id: Uuid, is_visible: bool) -> StoreResult<Option<Review>>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

/// PostgreSQL implementation of [`ReviewStore`]
#[derive(Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn insert(&self, review: &NewReview) -> StoreResult<Review> {
        let sql = format!(
            r#"
            INSERT INTO reviews (id, user_id, product_id, rating, comment, images)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "#
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(Uuid::new_v4())
            .bind(review.user_id)
            .bind(review.product_id)
            .bind(review.rating)
            .bind(&review.comment)
            .bind(&review.images)
            .fetch_one(&self.pool)
            .await?;
        Ok(review)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn find_by_user_and_product(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 AND product_id = $2");
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn list_visible(&self, product_id: Uuid) -> StoreResult<Vec<Review>> {
        let sql = format!(
            r#"
            SELECT {REVIEW_COLUMNS}
            FROM reviews
            WHERE product_id = $1 AND is_visible = TRUE
            ORDER BY created_at DESC
            "#
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(reviews)
    }

    async fn tally(&self, product_id: Uuid) -> StoreResult<Vec<ReviewTally>> {
        let rows = sqlx::query_as::<_, ReviewTally>(
            "SELECT id, rating, is_visible FROM reviews WHERE product_id = $1 ORDER BY created_at, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update(&self, id: Uuid, rating: Option<i16>, comment: Option<&str>) -> StoreResult<Option<Review>> {
        let sql = format!(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "#
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(rating)
            .bind(comment)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn set_visibility(&self, id: Uuid, is_visible: bool) -> StoreResult<Option<Review>> {
        let sql = format!(
            "UPDATE reviews SET is_visible = $2, updated_at = NOW() WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(is_visible)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
