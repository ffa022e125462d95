use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{error::Res, http::Success, jwt::JwtClaims, misc::UserRole};
use sqlx::PgPool;

use crate::{dtos::category::CategoryCreateRequest, services::reader};

/// Returns the whole category forest.
///
/// # Output
/// ```json
/// [{ "id": 1, "name": "Vegetables", "path": "/vegetables", "parent_id": null,
///    "children": [{ "id": 2, "name": "Tomatoes", "path": "/vegetables/tomatoes", ... }] }]
/// ```
#[get("/categories")]
async fn get_categories(pool: web::Data<Arc<PgPool>>) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    Success::ok(reader::category_tree(pg_pool).await?)
}

#[post("/categories")]
async fn post_category(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<CategoryCreateRequest>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    claims.require_role(UserRole::Admin)?;
    req.validate()?;
    let pg_pool: &PgPool = &**pool;
    let req = req.into_inner();
    let category = reader::create_category(pg_pool, &req.name, req.parent_id, req.image_url).await?;
    Success::created(category)
}
