use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::cart::{Cart, CartStore};
use crate::catalog::{CatalogStore, Product};
use crate::checkout::gateway::PaymentGateway;
use crate::checkout::models::non_empty;
use crate::checkout::{
    CheckoutError, CheckoutMetadata, CheckoutSession, CompletedSession, CreateSessionRequest, EventBody,
    GatewayEvent, GatewayLineItem, NewPaymentEvent, PaymentEventLog, SessionRequest, SessionStatus,
    WebhookOutcome, DEFAULT_LOCALE,
};
use crate::config::AppConfig;
use crate::coupons::{Coupon, CouponService};
use crate::orders::{
    CreateOrderRequest, NewOrder, NewOrderItem, OrderInsert, OrderStore, OrderWithItems, PaymentMethod,
};
use crate::pricing::PriceCalculator;

const FALLBACK_PRODUCT_NAME: &str = "Product";

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub frontend_url: String,
    pub currency: String,
    /// Upper bound on turning an authenticated webhook event into an order
    pub processing_timeout: Duration,
}

impl CheckoutSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
            currency: config.checkout_currency.clone(),
            processing_timeout: config.webhook_processing_timeout,
        }
    }

    fn success_url(&self, locale: &str) -> String {
        format!(
            "{}/{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.frontend_url, locale
        )
    }

    fn cancel_url(&self, locale: &str) -> String {
        format!("{}/{}/checkout/cancel", self.frontend_url, locale)
    }
}

/// Turns carts into orders
///
/// Direct orders are created synchronously. Hosted checkouts create no order
/// until the gateway confirms payment through a webhook, and at most one
/// order is ever created per external payment reference.
#[derive(Clone)]
pub struct CheckoutCoordinator {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    events: Arc<dyn PaymentEventLog>,
    gateway: Arc<dyn PaymentGateway>,
    coupons: CouponService,
    settings: CheckoutSettings,
}

impl CheckoutCoordinator {
    pub fn new(
        carts: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        events: Arc<dyn PaymentEventLog>,
        gateway: Arc<dyn PaymentGateway>,
        coupons: CouponService,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            carts,
            catalog,
            orders,
            events,
            gateway,
            coupons,
            settings,
        }
    }

    /// Cash-on-delivery / external-redirect checkout
    ///
    /// The order is written first and the cart cleared second. A failed clear
    /// is logged and the order still stands; a client retry could then order
    /// the same cart twice.
    pub async fn place_direct_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderWithItems, CheckoutError> {
        request.validate()?;
        if request.payment_method == PaymentMethod::HostedCheckout {
            return Err(CheckoutError::HostedCheckoutRequiresSession);
        }

        let cart = self.non_empty_cart(user_id).await?;
        let products = self.available_products(&cart).await?;
        let items = order_items(&cart, &products);
        let subtotal = NewOrder::line_subtotal(&items);

        let coupon = self.coupon(request.coupon_code.as_deref()).await?;
        let discount_amount = coupon
            .as_ref()
            .map(|c| c.discount_on(subtotal))
            .unwrap_or(Decimal::ZERO);

        let new_order = NewOrder {
            user_id,
            items,
            subtotal,
            discount_amount,
            total_amount: subtotal - discount_amount,
            shipping_address: request.shipping_address.trim().to_string(),
            phone_number: request.phone_number.trim().to_string(),
            payment_method: request.payment_method,
            payment_status: request.payment_method.initial_payment_status(),
            external_payment_ref: None,
            coupon_code: coupon.map(|c| c.code),
        };

        let record = match self.orders.insert(&new_order).await? {
            OrderInsert::Created(record) => record,
            OrderInsert::DuplicatePaymentRef => return Err(CheckoutError::DuplicateOrder),
        };
        info!(
            "Order {} created for user {} ({} lines, total {})",
            record.order.id,
            user_id,
            record.items.len(),
            record.order.total_amount
        );

        if let Err(err) = self.carts.clear(user_id).await {
            error!(
                "Order {} created but cart of user {} was not cleared: {}",
                record.order.id, user_id, err
            );
        }
        Ok(record)
    }

    /// Open a hosted checkout for the caller's cart
    ///
    /// Prices come from the server-side cart. A coupon is applied per unit so
    /// the amount charged equals the order total recorded later.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        request.validate()?;
        let cart = self.non_empty_cart(user_id).await?;
        let products = self.available_products(&cart).await?;
        let coupon = self.coupon(request.coupon_code.as_deref()).await?;

        let mut line_items = Vec::with_capacity(cart.items.len());
        let mut subtotal = Decimal::ZERO;
        let mut total = Decimal::ZERO;
        for line in &cart.items {
            let product = products.get(&line.product_id);
            let unit_price = match &coupon {
                Some(coupon) => line.unit_price - coupon.discount_on(line.unit_price),
                None => line.unit_price,
            };
            let unit_amount = PriceCalculator::to_minor_units(unit_price)
                .filter(|amount| *amount >= 0)
                .ok_or_else(|| CheckoutError::InvalidAmount(unit_price.to_string()))?;

            subtotal += PriceCalculator::calculate_subtotal(line.quantity, line.unit_price);
            total += PriceCalculator::calculate_subtotal(line.quantity, unit_price);
            line_items.push(GatewayLineItem {
                name: product
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| FALLBACK_PRODUCT_NAME.to_string()),
                unit_amount,
                quantity: line.quantity,
                image: product.and_then(|p| p.primary_image()).map(str::to_string),
                description: product.and_then(|p| p.description.clone()),
            });
        }

        let locale = non_empty(request.locale.as_deref()).unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        let session_request = SessionRequest {
            line_items,
            metadata: CheckoutMetadata {
                user_id: Some(user_id.to_string()),
                shipping_address: Some(request.shipping_address.trim().to_string()),
                phone_number: Some(request.phone_number.trim().to_string()),
                total_amount: Some(total.to_string()),
                discount_amount: Some((subtotal - total).to_string()),
                coupon_code: coupon.map(|c| c.code),
            },
            currency: self.settings.currency.clone(),
            success_url: self.settings.success_url(&locale),
            cancel_url: self.settings.cancel_url(&locale),
        };

        let session = self.gateway.create_session(&session_request).await?;
        info!("Checkout session {} opened for user {} (total {})", session.session_id, user_id, total);
        Ok(session)
    }

    /// Handle a gateway webhook delivery
    ///
    /// Signature failures are errors. Once the event is authenticated and
    /// recorded, every outcome (including processing failures and timeouts)
    /// is returned as `Ok` so the gateway stops retrying; failures are logged
    /// for manual reconciliation. Failing to record the event is an error so
    /// the gateway retries.
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, CheckoutError> {
        let signature = signature.ok_or(CheckoutError::MissingSignature)?;
        let event = self.gateway.verify_event(raw_body, signature)?;

        let first_delivery = self
            .events
            .record(&NewPaymentEvent {
                event_id: event.id.clone(),
                event_type: event.event_type.clone(),
                payload: event.payload.clone(),
            })
            .await
            .map_err(CheckoutError::EventLog)?;
        if !first_delivery {
            debug!("Event {} delivered again", event.id);
        }

        let event_id = event.id.clone();
        let outcome = match tokio::time::timeout(self.settings.processing_timeout, self.process_event(event)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                error!("Processing of payment event {} failed, needs reconciliation: {}", event_id, err);
                WebhookOutcome::Failed
            }
            Err(_) => {
                error!(
                    "Processing of payment event {} exceeded {:?}, needs reconciliation",
                    event_id, self.settings.processing_timeout
                );
                WebhookOutcome::TimedOut
            }
        };

        if let Err(err) = self.events.mark_processed(&event_id, outcome.as_str()).await {
            warn!("Could not record outcome of payment event {}: {}", event_id, err);
        }
        Ok(outcome)
    }

    async fn process_event(&self, event: GatewayEvent) -> Result<WebhookOutcome, CheckoutError> {
        match event.body {
            EventBody::CompletedSession(session) => self.complete_hosted_checkout(session).await,
            EventBody::Other => {
                debug!("Ignoring {} event {}", event.event_type, event.id);
                Ok(WebhookOutcome::Ignored)
            }
            EventBody::Unreadable(reason) => {
                error!(
                    "Payment event {} ({}) is signed but unreadable, needs reconciliation: {}",
                    event.id, event.event_type, reason
                );
                Ok(WebhookOutcome::Unreadable)
            }
        }
    }

    async fn complete_hosted_checkout(&self, session: CompletedSession) -> Result<WebhookOutcome, CheckoutError> {
        let Some(user_id) = session.metadata.user_id() else {
            warn!("Checkout session {} carries no usable userId; acknowledging without an order", session.id);
            return Ok(WebhookOutcome::MissingUser);
        };

        let cart = match self.carts.find(user_id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => {
                info!("Cart of user {} is empty for session {}; nothing to order", user_id, session.id);
                return Ok(WebhookOutcome::CartEmpty);
            }
        };

        let products = self.products(&cart).await?;
        let items = order_items(&cart, &products);
        let subtotal = NewOrder::line_subtotal(&items);
        let metadata = &session.metadata;
        let reference = session.payment_reference();

        let new_order = NewOrder {
            user_id,
            items,
            subtotal,
            discount_amount: metadata.discount_amount().unwrap_or(Decimal::ZERO),
            total_amount: metadata.total_amount().unwrap_or(subtotal),
            shipping_address: non_empty(metadata.shipping_address.as_deref()).unwrap_or_default(),
            phone_number: non_empty(metadata.phone_number.as_deref()).unwrap_or_default(),
            payment_method: PaymentMethod::HostedCheckout,
            payment_status: PaymentMethod::HostedCheckout.initial_payment_status(),
            external_payment_ref: Some(reference.clone()),
            coupon_code: metadata.coupon_code(),
        };

        match self.orders.insert(&new_order).await? {
            OrderInsert::Created(record) => {
                info!("Order {} created from payment {}", record.order.id, reference);
                if let Err(err) = self.carts.clear(user_id).await {
                    error!(
                        "Order {} created but cart of user {} was not cleared: {}",
                        record.order.id, user_id, err
                    );
                }
                Ok(WebhookOutcome::OrderCreated(record.order.id))
            }
            OrderInsert::DuplicatePaymentRef => {
                info!("Payment {} already has an order; treating delivery as a no-op", reference);
                Ok(WebhookOutcome::Duplicate)
            }
        }
    }

    /// Gateway's view of a session, passed through untouched
    pub async fn verify_session(&self, session_id: Option<&str>) -> Result<SessionStatus, CheckoutError> {
        let session_id = non_empty(session_id).ok_or(CheckoutError::MissingSessionId)?;
        let status = self.gateway.get_session(&session_id).await?;
        debug!("Session {} payment status {}", session_id, status.status);
        Ok(status)
    }

    async fn non_empty_cart(&self, user_id: Uuid) -> Result<Cart, CheckoutError> {
        match self.carts.find(user_id).await? {
            Some(cart) if !cart.is_empty() => Ok(cart),
            _ => {
                warn!("User {} tried to check out an empty cart", user_id);
                Err(CheckoutError::CartEmpty)
            }
        }
    }

    async fn products(&self, cart: &Cart) -> Result<HashMap<Uuid, Product>, CheckoutError> {
        let products = self.catalog.find_by_ids(&cart.product_ids()).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Products behind the cart, all of which must still be on sale
    async fn available_products(&self, cart: &Cart) -> Result<HashMap<Uuid, Product>, CheckoutError> {
        let products = self.products(cart).await?;
        for line in &cart.items {
            match products.get(&line.product_id) {
                Some(product) if !product.is_deleted => {}
                _ => return Err(CheckoutError::ProductUnavailable(line.product_id)),
            }
        }
        Ok(products)
    }

    async fn coupon(&self, code: Option<&str>) -> Result<Option<Coupon>, CheckoutError> {
        match non_empty(code) {
            Some(code) => Ok(Some(self.coupons.usable(&code, Utc::now()).await?)),
            None => Ok(None),
        }
    }
}

/// Freeze cart lines into order lines at the cart's unit prices
fn order_items(cart: &Cart, products: &HashMap<Uuid, Product>) -> Vec<NewOrderItem> {
    cart.items
        .iter()
        .map(|line| NewOrderItem {
            product_id: line.product_id,
            product_name: products
                .get(&line.product_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| FALLBACK_PRODUCT_NAME.to_string()),
            quantity: line.quantity,
            price_at_purchase: line.unit_price,
            size: line.size.clone(),
            color: line.color.clone(),
        })
        .collect()
}
