mod auth;
mod cart;
mod catalog;
mod checkout;
mod config;
mod coupons;
mod db;
mod error;
mod orders;
mod pricing;
mod query;
mod reviews;
mod validation;
mod wishlist;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{IdentityVerifier, JwtVerifier};
use cart::{CartService, CartStore, PgCartStore};
use catalog::{CatalogService, CatalogStore, PgCatalogStore};
use checkout::{
    CheckoutCoordinator, CheckoutSettings, PaymentEventLog, PaymentGateway, PgPaymentEventLog, StripeConfig,
    StripeGateway,
};
use config::AppConfig;
use coupons::{CouponService, CouponStore, PgCouponStore};
use db::DbPool;
use orders::{OrderService, OrderStore, PgOrderStore};
use reviews::{PgReviewStore, ReviewService, ReviewStore};
use wishlist::{PgWishlistStore, WishlistService, WishlistStore};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::handlers::list_products_handler,
        catalog::handlers::get_product_handler,
        catalog::handlers::new_products_handler,
        catalog::handlers::discounted_products_handler,
        catalog::handlers::best_selling_handler,
        catalog::handlers::facets_handler,
        catalog::handlers::create_product_handler,
        catalog::handlers::update_product_handler,
        catalog::handlers::delete_product_handler,
        catalog::handlers::sweep_handler,
        catalog::handlers::list_categories_handler,
        cart::handlers::view_cart_handler,
        cart::handlers::add_cart_item_handler,
        cart::handlers::update_cart_item_handler,
        cart::handlers::remove_cart_item_handler,
        cart::handlers::clear_cart_handler,
        orders::handlers::create_order_handler,
        orders::handlers::order_history_handler,
        orders::handlers::get_order_handler,
        orders::handlers::list_all_orders_handler,
        orders::handlers::count_orders_handler,
        orders::handlers::update_order_status_handler,
        orders::handlers::update_payment_status_handler,
        orders::handlers::delete_order_handler,
        checkout::handlers::create_session_handler,
        checkout::handlers::webhook_handler,
        checkout::handlers::verify_session_handler,
        reviews::handlers::list_product_reviews_handler,
        reviews::handlers::create_review_handler,
        reviews::handlers::update_review_handler,
        reviews::handlers::delete_review_handler,
        reviews::handlers::set_review_visibility_handler,
        wishlist::handlers::view_wishlist_handler,
        wishlist::handlers::add_wishlist_handler,
        wishlist::handlers::remove_wishlist_handler,
        wishlist::handlers::clear_wishlist_handler,
        coupons::handlers::validate_coupon_handler,
        coupons::handlers::quote_coupon_handler,
    ),
    components(
        schemas(
            error::ErrorResponse,
            catalog::Category,
            catalog::CategoryCount,
            catalog::DiscountView,
            catalog::NoveltyView,
            catalog::ProductResponse,
            catalog::ProductPage,
            catalog::DiscountInput,
            catalog::CreateProductRequest,
            catalog::UpdateProductRequest,
            catalog::DiscountProgress,
            catalog::DiscountedProducts,
            catalog::ProductFacets,
            catalog::SweepReport,
            cart::AddCartItemRequest,
            cart::UpdateCartItemRequest,
            cart::CartLineView,
            cart::CartView,
            orders::PaymentMethod,
            orders::PaymentStatus,
            orders::FulfillmentStatus,
            orders::CreateOrderRequest,
            orders::UpdateStatusRequest,
            orders::UpdatePaymentRequest,
            orders::OrderResponse,
            orders::OrderItemResponse,
            orders::OrderPage,
            orders::OrderCount,
            checkout::CreateSessionRequest,
            checkout::CheckoutSession,
            checkout::SessionStatus,
            checkout::WebhookAck,
            reviews::Review,
            reviews::CreateReviewRequest,
            reviews::UpdateReviewRequest,
            reviews::VisibilityRequest,
            wishlist::AddWishlistRequest,
            wishlist::WishlistEntry,
            wishlist::WishlistView,
            wishlist::WishlistChange,
            coupons::CouponValidation,
            coupons::CouponQuote,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "catalog", description = "Products, categories and the derived-field sweep"),
        (name = "cart", description = "Per-user shopping cart"),
        (name = "orders", description = "Direct checkout and order history"),
        (name = "checkout", description = "Hosted payment sessions and gateway webhooks"),
        (name = "reviews", description = "Product reviews and ratings"),
        (name = "wishlist", description = "Per-user wishlist"),
        (name = "coupons", description = "Coupon validation")
    ),
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = "Catalog, cart, checkout and order lifecycle for an online store"
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Persistence backends behind every service
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub events: Arc<dyn PaymentEventLog>,
    pub coupons: Arc<dyn CouponStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub wishlists: Arc<dyn WishlistStore>,
}

impl Stores {
    pub fn postgres(pool: &DbPool) -> Self {
        Self {
            catalog: Arc::new(PgCatalogStore::new(pool.clone())),
            carts: Arc::new(PgCartStore::new(pool.clone())),
            orders: Arc::new(PgOrderStore::new(pool.clone())),
            events: Arc::new(PgPaymentEventLog::new(pool.clone())),
            coupons: Arc::new(PgCouponStore::new(pool.clone())),
            reviews: Arc::new(PgReviewStore::new(pool.clone())),
            wishlists: Arc::new(PgWishlistStore::new(pool.clone())),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub orders: OrderService,
    pub checkout: CheckoutCoordinator,
    pub reviews: ReviewService,
    pub wishlist: WishlistService,
    pub coupons: CouponService,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityVerifier>,
        settings: CheckoutSettings,
    ) -> Self {
        let coupons = CouponService::new(stores.coupons);
        let checkout = CheckoutCoordinator::new(
            stores.carts.clone(),
            stores.catalog.clone(),
            stores.orders.clone(),
            stores.events,
            gateway,
            coupons.clone(),
            settings,
        );
        Self {
            catalog: CatalogService::new(stores.catalog.clone()),
            cart: CartService::new(stores.carts, stores.catalog.clone()),
            orders: OrderService::new(stores.orders),
            checkout,
            reviews: ReviewService::new(stores.reviews, stores.catalog.clone()),
            wishlist: WishlistService::new(stores.wishlists, stores.catalog),
            coupons,
            identity,
        }
    }
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and tracing middleware
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Catalog
        .route(
            "/api/products",
            get(catalog::list_products_handler).post(catalog::create_product_handler),
        )
        .route("/api/products/new", get(catalog::new_products_handler))
        .route("/api/products/discounted", get(catalog::discounted_products_handler))
        .route("/api/products/best-selling", get(catalog::best_selling_handler))
        .route("/api/products/filters", get(catalog::facets_handler))
        .route("/api/products/sweep", post(catalog::sweep_handler))
        .route(
            "/api/products/:slug",
            get(catalog::get_product_handler)
                .put(catalog::update_product_handler)
                .delete(catalog::delete_product_handler),
        )
        .route("/api/products/:slug/reviews", get(reviews::list_product_reviews_handler))
        .route("/api/categories", get(catalog::list_categories_handler))
        // Cart
        .route(
            "/api/cart",
            get(cart::view_cart_handler).delete(cart::clear_cart_handler),
        )
        .route("/api/cart/items", post(cart::add_cart_item_handler))
        .route(
            "/api/cart/items/:product_id",
            patch(cart::update_cart_item_handler).delete(cart::remove_cart_item_handler),
        )
        // Orders
        .route(
            "/api/orders",
            post(orders::create_order_handler).get(orders::order_history_handler),
        )
        .route("/api/orders/:id", get(orders::get_order_handler))
        .route("/api/admin/orders", get(orders::list_all_orders_handler))
        .route("/api/admin/orders/count", get(orders::count_orders_handler))
        .route("/api/admin/orders/:id", axum::routing::delete(orders::delete_order_handler))
        .route("/api/admin/orders/:id/status", patch(orders::update_order_status_handler))
        .route("/api/admin/orders/:id/payment", patch(orders::update_payment_status_handler))
        // Hosted checkout
        .route("/api/checkout/session", post(checkout::create_session_handler))
        .route("/api/checkout/webhook", post(checkout::webhook_handler))
        .route("/api/checkout/verify", get(checkout::verify_session_handler))
        // Reviews
        .route("/api/reviews", post(reviews::create_review_handler))
        .route(
            "/api/reviews/:id",
            put(reviews::update_review_handler).delete(reviews::delete_review_handler),
        )
        .route("/api/reviews/:id/visibility", patch(reviews::set_review_visibility_handler))
        // Wishlist
        .route(
            "/api/wishlist",
            get(wishlist::view_wishlist_handler)
                .post(wishlist::add_wishlist_handler)
                .delete(wishlist::clear_wishlist_handler),
        )
        .route("/api/wishlist/:product_id", axum::routing::delete(wishlist::remove_wishlist_handler))
        // Coupons
        .route("/api/coupons/:code/validate", get(coupons::validate_coupon_handler))
        .route("/api/coupons/:code/quote", get(coupons::quote_coupon_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Storefront API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let gateway = StripeGateway::new(StripeConfig::from_app_config(&config))
        .expect("Failed to build payment gateway client");
    let state = AppState::new(
        Stores::postgres(&db_pool),
        Arc::new(gateway),
        Arc::new(JwtVerifier::new(&config.jwt_secret)),
        CheckoutSettings::from_app_config(&config),
    );

    match config.sweep_interval {
        Some(interval) => {
            tracing::info!("Discount/novelty sweeper running every {:?}", interval);
            catalog::spawn_sweeper(state.catalog.clone(), interval);
        }
        None => tracing::info!("Background sweeper disabled"),
    }

    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Storefront API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod testing;
