use std::{sync::Arc, time::Duration};

use actix_web::web;
use limiter::{AttemptLimiter, PhoneLimiter};
use middleware::auth::AuthMiddleware;
use sqlx::PgPool;

pub mod routes {
    pub mod auth;
    pub mod otp;
    pub mod user;
}
pub mod middleware {
    pub mod auth;
}
pub mod services {
    pub mod auth;
    pub mod directory;
    pub mod otp;
    pub mod supplier;
    pub mod user;

    #[cfg(test)]
    mod testing;
}
pub mod dtos {
    pub mod auth;
    pub mod supplier;
}

pub fn mount_auth() -> actix_web::Scope {
    web::scope("/auth")
        .service(routes::auth::post_register)
        .service(routes::auth::post_login)
        .service(routes::otp::post_register_supplier)
        .service(routes::otp::post_send_code)
        .service(routes::otp::post_verify_code)
}

/// Routes of the authenticated user, mounted next to other dashboard scopes.
pub fn mount_user(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::user::get_me)
        .service(routes::user::get_my_supplier)
        .service(routes::user::put_supplier_details);
}

pub fn auth_middleware() -> AuthMiddleware {
    AuthMiddleware
}

/// Periodically deletes expired verification codes and forgets idle
/// per-phone throttle buckets.
pub fn spawn_code_sweeper(
    pool: Arc<PgPool>,
    throttle: web::Data<PhoneLimiter>,
    attempts: web::Data<AttemptLimiter>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            services::otp::sweep_expired_codes(&*pool, chrono::Utc::now()).await;
            throttle.shrink();
            attempts.shrink();
        }
    })
}
