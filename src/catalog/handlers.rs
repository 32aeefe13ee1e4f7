// HTTP handlers for catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::AdminUser;
use crate::catalog::query::{ProductQuery, ProductQueryParams};
use crate::catalog::{
    CatalogError, Category, CreateProductRequest, DiscountedProducts, ProductFacets, ProductPage,
    ProductResponse, SweepReport, UpdateProductRequest,
};
use crate::error::ErrorResponse;
use crate::AppState;

/// Handler for GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQueryParams),
    responses(
        (status = 200, description = "One page of matching products", body = ProductPage),
        (status = 400, description = "Invalid filter, sort or page", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn list_products_handler(
    State(state): State<AppState>,
    Query(params): Query<ProductQueryParams>,
) -> Result<Json<ProductPage>, CatalogError> {
    let query = ProductQuery::from_params(params)?;
    let page = state.catalog.list(query).await?;
    Ok(Json(page))
}

/// Handler for GET /api/products/:slug
#[utoipa::path(
    get,
    path = "/api/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_product_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductResponse>, CatalogError> {
    let product = state.catalog.get_by_slug(&slug).await?;
    Ok(Json(product.into()))
}

/// Handler for GET /api/products/new
#[utoipa::path(
    get,
    path = "/api/products/new",
    responses((status = 200, description = "Products flagged new, newest first", body = [ProductResponse])),
    tag = "catalog"
)]
pub async fn new_products_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, CatalogError> {
    let products = state.catalog.new_products().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// Handler for GET /api/products/discounted
#[utoipa::path(
    get,
    path = "/api/products/discounted",
    responses((status = 200, description = "Products on sale with window progress", body = DiscountedProducts)),
    tag = "catalog"
)]
pub async fn discounted_products_handler(
    State(state): State<AppState>,
) -> Result<Json<DiscountedProducts>, CatalogError> {
    Ok(Json(state.catalog.discounted_products().await?))
}

/// Handler for GET /api/products/best-selling
#[utoipa::path(
    get,
    path = "/api/products/best-selling",
    responses((status = 200, description = "Top rated products", body = [ProductResponse])),
    tag = "catalog"
)]
pub async fn best_selling_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, CatalogError> {
    let products = state.catalog.best_selling().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// Handler for GET /api/products/filters
#[utoipa::path(
    get,
    path = "/api/products/filters",
    responses((status = 200, description = "Values available to filter on", body = ProductFacets)),
    tag = "catalog"
)]
pub async fn facets_handler(State(state): State<AppState>) -> Result<Json<ProductFacets>, CatalogError> {
    Ok(Json(state.catalog.facets().await?))
}

/// Handler for POST /api/products (admin)
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid input, unknown category or name without a slug", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 409, description = "Name already taken", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn create_product_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), CatalogError> {
    let product = state.catalog.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// Handler for PUT /api/products/:slug (admin)
#[utoipa::path(
    put,
    path = "/api/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated; slug unchanged", body = ProductResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn update_product_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(slug): Path<String>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, CatalogError> {
    let product = state.catalog.update_product(&slug, request).await?;
    Ok(Json(product.into()))
}

/// Handler for DELETE /api/products/:slug (admin)
#[utoipa::path(
    delete,
    path = "/api/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 204, description = "Product soft-deleted"),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn delete_product_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, CatalogError> {
    state.catalog.soft_delete(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/products/sweep (admin)
#[utoipa::path(
    post,
    path = "/api/products/sweep",
    responses(
        (status = 200, description = "Derived discount and novelty fields refreshed", body = SweepReport),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn sweep_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<SweepReport>, CatalogError> {
    Ok(Json(state.catalog.sweep().await?))
}

/// Handler for GET /api/categories
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Active categories by name", body = [Category])),
    tag = "catalog"
)]
pub async fn list_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, CatalogError> {
    Ok(Json(state.catalog.categories().await?))
}
