use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::StoreResult;
use crate::orders::{
    FulfillmentStatus, NewOrder, Order, OrderInsert, OrderItem, OrderWithItems, PaymentStatus,
};
use crate::query::Page;

const ORDER_COLUMNS: &str = "id, user_id, subtotal, discount_amount, total_amount, shipping_address, \
     phone_number, payment_method, payment_status, external_payment_ref, coupon_code, status, \
     is_deleted, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "order_id, line_no, product_id, product_name, quantity, price_at_purchase, size, color, subtotal";

/// Persistence for orders and their frozen line items
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order with its items atomically
    ///
    /// When `external_payment_ref` is already taken nothing is written and
    /// [`OrderInsert::DuplicatePaymentRef`] is returned.
    async fn insert(&self, order: &NewOrder) -> StoreResult<OrderInsert>;

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> StoreResult<Option<OrderWithItems>>;

    /// Non-deleted orders of one user, newest first
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OrderWithItems>>;

    /// One page of all non-deleted orders, newest first, plus the total count
    async fn list_all(&self, page: Page) -> StoreResult<(Vec<OrderWithItems>, i64)>;

    async fn count(&self) -> StoreResult<i64>;

    /// Move the fulfillment status, only if it is still `expected`
    async fn update_status(
        &self,
        id: Uuid,
        expected: FulfillmentStatus,
        status: FulfillmentStatus,
    ) -> StoreResult<Option<Order>>;

    /// Move the payment status, only if it is still `expected`
    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> StoreResult<Option<Order>>;

    /// Flag an order as deleted; false if it was missing or already deleted
    async fn soft_delete(&self, id: Uuid) -> StoreResult<bool>;
}

/// PostgreSQL implementation of [`OrderStore`]
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_items(&self, orders: Vec<Order>) -> StoreResult<Vec<OrderWithItems>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, line_no"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    async fn attach_one(&self, order: Option<Order>) -> StoreResult<Option<OrderWithItems>> {
        match order {
            Some(order) => Ok(self.attach_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, new_order: &NewOrder) -> StoreResult<OrderInsert> {
        let mut tx = self.pool.begin().await?;

        // A NULL reference never conflicts, so only gateway-backed orders are deduplicated
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (user_id, subtotal, discount_amount, total_amount, shipping_address,
                                phone_number, payment_method, payment_status, external_payment_ref,
                                coupon_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (external_payment_ref) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(new_order.user_id)
        .bind(new_order.subtotal)
        .bind(new_order.discount_amount)
        .bind(new_order.total_amount)
        .bind(&new_order.shipping_address)
        .bind(&new_order.phone_number)
        .bind(new_order.payment_method)
        .bind(new_order.payment_status)
        .bind(&new_order.external_payment_ref)
        .bind(&new_order.coupon_code)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = order else {
            tx.rollback().await?;
            return Ok(OrderInsert::DuplicatePaymentRef);
        };

        let mut items = Vec::with_capacity(new_order.items.len());
        for (line_no, item) in (1..).zip(&new_order.items) {
            let row = sqlx::query_as::<_, OrderItem>(&format!(
                r#"
                INSERT INTO order_items (order_id, line_no, product_id, product_name, quantity,
                                         price_at_purchase, size, color, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(order.id)
            .bind(line_no)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price_at_purchase)
            .bind(&item.size)
            .bind(&item.color)
            .bind(item.subtotal())
            .fetch_one(&mut *tx)
            .await?;
            items.push(row);
        }

        tx.commit().await?;
        Ok(OrderInsert::Created(OrderWithItems { order, items }))
    }

    async fn find_by_id(&self, id: Uuid, include_deleted: bool) -> StoreResult<Option<OrderWithItems>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND ($2 OR is_deleted = FALSE)"
        ))
        .bind(id)
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_one(order).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OrderWithItems>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE user_id = $1 AND is_deleted = FALSE
            ORDER BY created_at DESC, id
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_items(orders).await
    }

    async fn list_all(&self, page: Page) -> StoreResult<(Vec<OrderWithItems>, i64)> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE is_deleted = FALSE
            ORDER BY created_at DESC, id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(i64::from(page.size))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let total = self.count().await?;
        Ok((self.attach_items(orders).await?, total))
    }

    async fn count(&self) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE is_deleted = FALSE")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: FulfillmentStatus,
        status: FulfillmentStatus,
    ) -> StoreResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2 AND is_deleted = FALSE
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> StoreResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET payment_status = $3, updated_at = NOW()
            WHERE id = $1 AND payment_status = $2 AND is_deleted = FALSE
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn soft_delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
