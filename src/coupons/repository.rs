use async_trait::async_trait;
use sqlx::PgPool;

use crate::coupons::Coupon;
use crate::db::StoreResult;

/// Read access to coupons; coupon administration happens elsewhere
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Exact, case-sensitive code lookup
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Coupon>>;
}

/// PostgreSQL implementation of [`CouponStore`]
#[derive(Clone)]
pub struct PgCouponStore {
    pool: PgPool,
}

impl PgCouponStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponStore for PgCouponStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT id, code, percentage, expires_at, is_active, max_uses, created_at
            FROM coupons
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(coupon)
    }
}
