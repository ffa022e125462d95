use std::sync::Arc;

use actix_web::{Responder, get, put, web};
use common::{error::Res, http::Success, jwt::JwtClaims};
use sqlx::PgPool;

use crate::{dtos::supplier::SupplierDetailsRequest, services};

/// Endpoint to retrieve the current authenticated user's information.
///
/// # Output
/// - Success: the user profile (the password hash is never serialized)
/// - Error: 401 without a valid token, 404 if the user no longer exists
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/me', {
///   headers: { 'Authorization': `Bearer ${localStorage.getItem('authToken')}` }
/// });
/// ```
#[get("/me")]
async fn get_me(claims: web::ReqData<JwtClaims>, pool: web::Data<Arc<PgPool>>) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let user = services::user::get_user_by_id(pg_pool, claims.user_id).await?;
    Success::ok(user)
}

#[get("/supplier/me")]
async fn get_my_supplier(
    claims: web::ReqData<JwtClaims>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let supplier = services::supplier::get_for_user(pg_pool, claims.user_id).await?;
    Success::ok(supplier)
}

/// Partially updates market, place, row and categories of the caller's
/// supplier profile. Omitted fields keep their stored value.
#[put("/supplier/details")]
async fn put_supplier_details(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<SupplierDetailsRequest>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let req = req.into_inner();
    req.validate()?;
    let supplier = services::supplier::update_details(pg_pool, claims.user_id, req.into()).await?;
    Success::ok(supplier)
}
