use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::orders::{
    FulfillmentStatus, OrderError, OrderPage, OrderResponse, OrderStore, OrderWithItems,
    PaymentStatus, StatusMachine,
};
use crate::query::Page;

/// Service for order reads and admin lifecycle changes
///
/// Orders are created by the checkout coordinator; everything here works
/// on orders that already exist.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Order history of a user, newest first
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<OrderResponse>, OrderError> {
        let orders = self.store.list_for_user(user_id).await?;
        debug!("User {} has {} orders", user_id, orders.len());
        Ok(orders.into_iter().map(Into::into).collect())
    }

    /// One order, visible to its owner and to admins
    pub async fn get(&self, id: Uuid, requester: Uuid, is_admin: bool) -> Result<OrderResponse, OrderError> {
        let record = self.load(id).await?;
        if record.order.user_id != requester && !is_admin {
            warn!("User {} tried to read order {} of user {}", requester, id, record.order.user_id);
            return Err(OrderError::Forbidden(id));
        }
        Ok(record.into())
    }

    pub async fn list_all(&self, page: Page) -> Result<OrderPage, OrderError> {
        let (orders, total) = self.store.list_all(page).await?;
        Ok(OrderPage {
            items: orders.into_iter().map(Into::into).collect(),
            total,
            page: page.number,
            limit: page.size,
            total_pages: page.total_pages(total),
        })
    }

    pub async fn count(&self) -> Result<i64, OrderError> {
        Ok(self.store.count().await?)
    }

    /// Move the fulfillment status along the allowed transitions
    pub async fn update_status(&self, id: Uuid, status: FulfillmentStatus) -> Result<OrderResponse, OrderError> {
        let record = self.load(id).await?;
        let current = record.order.status;
        StatusMachine::transition(current, status).map_err(OrderError::InvalidTransition)?;
        if current == status {
            return Ok(record.into());
        }

        let order = self
            .store
            .update_status(id, current, status)
            .await?
            .ok_or(OrderError::ConcurrentUpdate(id))?;
        info!("Order {} status {} -> {}", id, current, status);
        Ok(OrderWithItems { order, items: record.items }.into())
    }

    /// Move the payment status along the allowed transitions
    pub async fn update_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<OrderResponse, OrderError> {
        let record = self.load(id).await?;
        let current = record.order.payment_status;
        StatusMachine::payment_transition(current, status).map_err(OrderError::InvalidTransition)?;
        if current == status {
            return Ok(record.into());
        }

        let order = self
            .store
            .update_payment_status(id, current, status)
            .await?
            .ok_or(OrderError::ConcurrentUpdate(id))?;
        info!("Order {} payment {} -> {}", id, current, status);
        Ok(OrderWithItems { order, items: record.items }.into())
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<(), OrderError> {
        if !self.store.soft_delete(id).await? {
            return Err(OrderError::NotFound(id));
        }
        info!("Order {} soft-deleted", id);
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<OrderWithItems, OrderError> {
        self.store
            .find_by_id(id, false)
            .await?
            .ok_or(OrderError::NotFound(id))
    }
}
