use std::{sync::Arc, time::Duration};

use actix_web::{Responder, get, post, web};
use common::{
    env_config::Config,
    error::Res,
    http::Success,
    jwt::JwtClaims,
    misc::Pagination,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    dtos::{category::ProductListQuery, product::ProductAggregate},
    services::{reader, writer},
};

/// Lists products with the given status, newest first.
///
/// # Input
/// - `status_id`: required
/// - `page`: 1-based, defaults to 1
/// - `page_size`: 1 to 100, defaults to 20
///
/// # Frontend Example
/// ```javascript
/// const products = await fetch('/api/catalog/products?status_id=1&page=2&page_size=10')
///   .then(r => r.json());
/// ```
#[get("/products")]
async fn get_products(
    query: web::Query<ProductListQuery>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let pagination = Pagination {
        page: query.page,
        page_size: query.page_size,
    };
    let products = reader::list_by_status(pg_pool, query.status_id, &pagination).await?;
    Success::ok(products)
}

#[get("/products/{id}")]
async fn get_product(path: web::Path<i64>, pool: web::Data<Arc<PgPool>>) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let details = reader::get_product(pg_pool, path.into_inner()).await?;
    Success::ok(details)
}

/// Creates a product with its images and variations in one transaction.
///
/// # Input
/// ```json
/// {
///   "name": "Tomatoes", "category_id": 3, "market_id": 1, "status_id": 1,
///   "images": ["https://cdn.example/products/....jpg"],
///   "variations": [
///     { "price": 4500, "quantity": 10, "images": [],
///       "attributes": [{ "name": "Color", "value": "Red" }] }
///   ]
/// }
/// ```
///
/// # Output
/// - Success: `{ "id": 42 }` with 201 Created
/// - Error: 400 for invalid input, 403 unless the caller is a verified supplier
#[post("/products")]
async fn post_product(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<ProductAggregate>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let supplier_id = writer::supplier_for_user(pg_pool, claims.user_id).await?;
    let product_id = writer::create_product(
        pg_pool,
        supplier_id,
        &req,
        Duration::from_secs(config.product_tx_timeout_secs),
    )
    .await?;
    Success::created(json!({ "id": product_id }))
}
