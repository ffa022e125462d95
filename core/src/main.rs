mod cors;

use std::{sync::Arc, time::Duration};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::{
    env_config::Config,
    storage::{ObjectStorage, S3Storage},
    whatsapp::{MessageSender, WhatsAppClient},
};
use limiter::{AttemptLimiter, PhoneLimiter};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.is_production();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup().expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config.database, is_production)
        .await
        .expect("Failed to set up database");

    // outbound collaborators, shared by all workers
    let sender: Arc<dyn MessageSender> = Arc::new(
        WhatsAppClient::new(&config.whatsapp, is_production)
            .expect("Failed to set up WhatsApp client"),
    );
    let storage: Arc<dyn ObjectStorage> =
        Arc::new(S3Storage::new(&config.storage).expect("Failed to set up object storage"));
    let sender_data = web::Data::from(sender);
    let storage_data = web::Data::from(storage);

    // rate limiting
    let phone_limiter = web::Data::new(
        PhoneLimiter::new(config.otp.max_sends_per_hour).expect("Invalid OTP throttle settings"),
    );
    let attempt_limiter = web::Data::new(
        AttemptLimiter::new(config.otp.max_verify_attempts_per_hour)
            .expect("Invalid OTP attempt settings"),
    );
    let global_limiter = limiter::global_middleware(config.global_rate_limit_per_second)
        .expect("Invalid global rate limit settings");

    api_auth::spawn_code_sweeper(
        pool.clone(),
        phone_limiter.clone(),
        attempt_limiter.clone(),
        Duration::from_secs(config.otp.sweep_interval_secs),
    );

    log::info!(
        "Starting server on {}:{} ({} workers)",
        config.server_host,
        config.server_port,
        config.num_workers
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(sender_data.clone())
            .app_data(storage_data.clone())
            .app_data(phone_limiter.clone())
            .app_data(attempt_limiter.clone())
            .app_data(web::PayloadConfig::new(config_data.storage.max_upload_bytes))
            .wrap(global_limiter.clone())
            .wrap(logger::middleware(config_data.console_logging_enabled)) // 3rd
            .wrap(extractor::middleware(&config_data.jwt_config.secret)) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_auth::mount_auth())
                    .service(api_catalog::mount_catalog())
                    .service(
                        web::scope("/dashboard")
                            .wrap(api_auth::auth_middleware())
                            .configure(api_auth::mount_user)
                            .service(api_catalog::mount_catalog_admin()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
