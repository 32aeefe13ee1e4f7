use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::catalog::CatalogError;
use crate::db::escape_like;
use crate::query::Page;

/// Default number of products per page
pub const DEFAULT_PAGE_SIZE: u32 = 12;
/// Upper bound on products per page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Column list shared by every product SELECT
pub const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, old_price, category_id, \
    quantity, colors, sizes, images, rating, review_ids, discount_percentage, discount_price, \
    discount_start, discount_end, discount_active, is_new, new_until, is_deleted, created_at, updated_at";

/// Query parameters accepted by GET /api/products
///
/// List-valued filters (`categories`, `colors`, `sizes`) are comma separated.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQueryParams {
    /// Single category id
    pub category: Option<String>,
    /// Comma-separated category ids
    pub categories: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub colors: Option<String>,
    pub sizes: Option<String>,
    /// Case-insensitive substring over name and description
    pub search: Option<String>,
    /// Only products with an active discount
    pub discount: Option<bool>,
    /// Only products flagged new
    pub new: Option<bool>,
    /// Only products with quantity > 0
    pub in_stock: Option<bool>,
    /// newest | price-asc | price-desc | name-asc | name-desc | discount | rating
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Combinable product predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category_ids: Vec<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub search: Option<String>,
    pub discount_only: bool,
    pub new_only: bool,
    pub in_stock_only: bool,
    pub include_deleted: bool,
}

/// Product sort orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    /// Highest discount percentage first
    Discount,
    /// Highest rating first
    Rating,
    /// Discount window ending last first
    DiscountEndingLast,
}

impl ProductSort {
    pub fn parse(value: &str) -> Result<Self, CatalogError> {
        match value.trim().to_lowercase().as_str() {
            "" | "newest" => Ok(ProductSort::Newest),
            "price-asc" => Ok(ProductSort::PriceAsc),
            "price-desc" => Ok(ProductSort::PriceDesc),
            "name-asc" => Ok(ProductSort::NameAsc),
            "name-desc" => Ok(ProductSort::NameDesc),
            "discount" => Ok(ProductSort::Discount),
            "rating" => Ok(ProductSort::Rating),
            _ => Err(CatalogError::InvalidQuery(format!(
                "Invalid sort '{}'. Must be one of newest, price-asc, price-desc, name-asc, name-desc, discount, rating",
                value
            ))),
        }
    }

    /// ORDER BY clause; every order ends on `id` so pages are stable
    pub fn order_by(&self) -> &'static str {
        match self {
            ProductSort::Newest => "created_at DESC, id",
            ProductSort::PriceAsc => "price ASC, id",
            ProductSort::PriceDesc => "price DESC, id",
            ProductSort::NameAsc => "name ASC, id",
            ProductSort::NameDesc => "name DESC, id",
            ProductSort::Discount => "discount_percentage DESC, id",
            ProductSort::Rating => "rating DESC, id",
            ProductSort::DiscountEndingLast => "discount_end DESC NULLS LAST, id",
        }
    }
}

/// Validated and normalized listing request
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: ProductSort,
    pub page: Page,
}

impl ProductQuery {
    /// Validate raw query parameters and apply defaults
    pub fn from_params(params: ProductQueryParams) -> Result<Self, CatalogError> {
        let mut category_ids = Vec::new();
        for raw in params
            .category
            .iter()
            .chain(params.categories.iter())
            .flat_map(|value| split_list(value))
        {
            let id = Uuid::parse_str(&raw)
                .map_err(|_| CatalogError::InvalidQuery(format!("Invalid category id '{}'", raw)))?;
            if !category_ids.contains(&id) {
                category_ids.push(id);
            }
        }

        for (name, value) in [("min_price", params.min_price), ("max_price", params.max_price)] {
            if value.is_some_and(|price| price < Decimal::ZERO) {
                return Err(CatalogError::InvalidQuery(format!("{} cannot be negative", name)));
            }
        }
        if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
            if min > max {
                return Err(CatalogError::InvalidQuery(
                    "min_price cannot be greater than max_price".to_string(),
                ));
            }
        }

        let page = Page::from_params(params.page, params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
            .map_err(CatalogError::InvalidQuery)?;

        let sort = match params.sort {
            Some(ref value) => ProductSort::parse(value)?,
            None => ProductSort::default(),
        };

        let search = params
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            filter: ProductFilter {
                category_ids,
                min_price: params.min_price,
                max_price: params.max_price,
                colors: params.colors.as_deref().map(split_list).unwrap_or_default(),
                sizes: params.sizes.as_deref().map(split_list).unwrap_or_default(),
                search,
                discount_only: params.discount.unwrap_or(false),
                new_only: params.new.unwrap_or(false),
                in_stock_only: params.in_stock.unwrap_or(false),
                include_deleted: false,
            },
            sort,
            page,
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A bound parameter of a generated product query
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Decimal(Decimal),
    Uuids(Vec<Uuid>),
    Texts(Vec<String>),
}

/// Builds parameterized product queries from a [`ProductFilter`]
///
/// The page query and the count query share one WHERE clause, so the total
/// never depends on the page window.
pub struct ProductQueryBuilder {
    where_clauses: Vec<String>,
    params: Vec<SqlParam>,
}

impl ProductQueryBuilder {
    pub fn new(filter: &ProductFilter) -> Self {
        let mut builder = Self {
            where_clauses: Vec::new(),
            params: Vec::new(),
        };

        if !filter.include_deleted {
            builder.where_clauses.push("is_deleted = FALSE".to_string());
        }
        if !filter.category_ids.is_empty() {
            builder.push_param(SqlParam::Uuids(filter.category_ids.clone()), |i| {
                format!("category_id = ANY(${})", i)
            });
        }
        if let Some(min) = filter.min_price {
            builder.push_param(SqlParam::Decimal(min), |i| format!("price >= ${}", i));
        }
        if let Some(max) = filter.max_price {
            builder.push_param(SqlParam::Decimal(max), |i| format!("price <= ${}", i));
        }
        if !filter.colors.is_empty() {
            builder.push_param(SqlParam::Texts(filter.colors.clone()), |i| format!("colors && ${}", i));
        }
        if !filter.sizes.is_empty() {
            builder.push_param(SqlParam::Texts(filter.sizes.clone()), |i| format!("sizes && ${}", i));
        }
        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", escape_like(search));
            builder.push_param(SqlParam::Text(pattern), |i| {
                format!("(name ILIKE ${0} OR description ILIKE ${0})", i)
            });
        }
        if filter.discount_only {
            builder.where_clauses.push("discount_active = TRUE".to_string());
        }
        if filter.new_only {
            builder.where_clauses.push("is_new = TRUE".to_string());
        }
        if filter.in_stock_only {
            builder.where_clauses.push("quantity > 0".to_string());
        }

        builder
    }

    fn push_param(&mut self, param: SqlParam, clause: impl FnOnce(usize) -> String) {
        self.params.push(param);
        self.where_clauses.push(clause(self.params.len()));
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// SELECT for one page, or for every match when `page` is `None`
    pub fn build_page(&self, sort: ProductSort, page: Option<Page>) -> (String, Vec<SqlParam>) {
        let mut query = format!("SELECT {} FROM products{}", PRODUCT_COLUMNS, self.where_sql());
        query.push_str(" ORDER BY ");
        query.push_str(sort.order_by());

        // LIMIT/OFFSET are integers we computed, not user text
        if let Some(page) = page {
            query.push_str(&format!(" LIMIT {} OFFSET {}", page.size, page.offset()));
        }

        (query, self.params.clone())
    }

    /// SELECT COUNT(*) over the same predicates
    pub fn build_count(&self) -> (String, Vec<SqlParam>) {
        (
            format!("SELECT COUNT(*) FROM products{}", self.where_sql()),
            self.params.clone(),
        )
    }
}
