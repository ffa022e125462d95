use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{env_config::Config, error::Res, http::Success, whatsapp::MessageSender};
use limiter::{AttemptLimiter, PhoneLimiter};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    dtos::supplier::{
        CodeSentResponse, SendCodeRequest, SupplierRegisterRequest, VerifyCodeRequest,
    },
    services::{self, otp::OtpEngine},
};

/// Registers a supplier by phone number and sends a WhatsApp verification code.
///
/// # Frontend Example
/// ```javascript
/// await fetch('/api/auth/supplier/register', {
///   method: 'POST',
///   headers: { 'Content-Type': 'application/json' },
///   body: JSON.stringify({ phone_number: '+380501112233', name: 'Green Farm' })
/// });
/// ```
#[post("/supplier/register")]
async fn post_register_supplier(
    req: web::Json<SupplierRegisterRequest>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
    sender: web::Data<dyn MessageSender>,
    throttle: web::Data<PhoneLimiter>,
) -> Res<impl Responder> {
    req.validate()?;
    let pg_pool: &PgPool = &**pool;
    let engine = OtpEngine::new(pg_pool, &**sender, config.otp.ttl_minutes);

    let (supplier, issued) = services::supplier::register_supplier(
        pg_pool,
        &engine,
        &throttle,
        &req.phone_number,
        &req.name,
    )
    .await?;

    Success::created(json!({
        "supplier": supplier,
        "expires_at": issued.expires_at,
    }))
}

/// Sends a fresh code to a registered phone. Any earlier code stops working.
#[post("/otp/send")]
async fn post_send_code(
    req: web::Json<SendCodeRequest>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
    sender: web::Data<dyn MessageSender>,
    throttle: web::Data<PhoneLimiter>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let engine = OtpEngine::new(pg_pool, &**sender, config.otp.ttl_minutes);

    let (phone_number, issued) =
        services::supplier::send_code(pg_pool, &engine, &throttle, &req.phone_number).await?;

    Success::ok(CodeSentResponse {
        phone_number,
        expires_at: issued.expires_at,
    })
}

/// Verifies the latest code of a phone and returns a session token.
///
/// # Output
/// - Success: `{ "token": "...", "user": {...} }`
/// - Error: 401 for a wrong or missing code (or an expired one), 404 when the
///   phone has no supplier, 429 once the phone's attempts are used up
#[post("/otp/verify")]
async fn post_verify_code(
    req: web::Json<VerifyCodeRequest>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
    sender: web::Data<dyn MessageSender>,
    attempts: web::Data<AttemptLimiter>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &**pool;
    let engine = OtpEngine::new(pg_pool, &**sender, config.otp.ttl_minutes);

    let auth = services::supplier::verify_code(
        pg_pool,
        &engine,
        &attempts,
        &config.jwt_config,
        &req.phone_number,
        &req.code,
    )
    .await?;
    Success::ok(auth)
}
