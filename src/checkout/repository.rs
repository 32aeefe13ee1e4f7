use async_trait::async_trait;
use sqlx::PgPool;

use crate::checkout::NewPaymentEvent;
use crate::db::StoreResult;

/// Durable record of every authenticated gateway event
#[async_trait]
pub trait PaymentEventLog: Send + Sync {
    /// Record an event; false when this event id was already recorded
    async fn record(&self, event: &NewPaymentEvent) -> StoreResult<bool>;

    /// Note how processing ended
    async fn mark_processed(&self, event_id: &str, outcome: &str) -> StoreResult<()>;
}

/// PostgreSQL implementation of [`PaymentEventLog`]
#[derive(Clone)]
pub struct PgPaymentEventLog {
    pool: PgPool,
}

impl PgPaymentEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentEventLog for PgPaymentEventLog {
    async fn record(&self, event: &NewPaymentEvent) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_events (event_id, event_type, payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_processed(&self, event_id: &str, outcome: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE payment_events
            SET outcome = $2, processed_at = NOW(), attempts = attempts + 1
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(outcome)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
