use actix_web::{Responder, post, web};
use common::env_config::Config;
use common::error::Res;
use common::http::Success;
use sqlx::PgPool;
use std::sync::Arc;

use crate::dtos::auth::{LoginRequest, RegisterRequest};
use crate::services;

/// Registers a new user with username and password authentication.
///
/// # Input
/// - `req`: JSON payload `{ "username": "...", "password": "..." }`
///
/// # Output
/// - Success: the created user with 201 Created status
/// - Error: 400 for a blank username or short password, 409 if the username is taken
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/register', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ username: 'alice', password: 'securepassword' })
/// });
/// ```
#[post("/register")]
async fn post_register(
    req: web::Json<RegisterRequest>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let req = req.into_inner();
    req.validate()?;
    let user = services::user::create_user_with_credentials(pg_pool, &req).await?;
    Success::created(user)
}

/// Authenticates a user with username and password.
///
/// # Output
/// - Success: `{ "token": "...", "user": {...} }`
/// - Error: 401 for unknown users, wrong passwords and OTP-only accounts
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth/login', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ username: 'alice', password: 'securepassword' })
/// });
/// if (response.ok) {
///   const authData = await response.json();
///   localStorage.setItem('authToken', authData.token);
/// }
/// ```
#[post("/login")]
pub async fn post_login(
    login_data: web::Json<LoginRequest>,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let user = services::auth::authenticate_user(pg_pool, &login_data.into_inner()).await?;
    Success::ok(services::auth::issue_token(user, &config.jwt_config)?)
}
