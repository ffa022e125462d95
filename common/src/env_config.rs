use std::{env, str::FromStr, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes database connection details, JWT configuration,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences and the settings of the external collaborators
/// (WhatsApp messaging and S3-compatible object storage).
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Requests per second accepted by the global limiter.
    pub global_rate_limit_per_second: u32,
    /// One-time passcode settings.
    pub otp: OtpConfig,
    /// WhatsApp Cloud API settings.
    pub whatsapp: WhatsAppConfig,
    /// S3-compatible object storage settings.
    pub storage: StorageConfig,
    /// Upper bound for a single product ingestion transaction, in seconds.
    pub product_tx_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// The URL of the database to connect to.
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Applied as Postgres `statement_timeout` on every connection.
    pub statement_timeout_ms: u64,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// This struct contains the secret key used to sign JWTs and
/// the expiration time in hours for issued tokens.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

#[derive(Clone, Debug)]
pub struct OtpConfig {
    /// Lifetime of an issued code.
    pub ttl_minutes: i64,
    /// Codes a single phone number may request per hour.
    pub max_sends_per_hour: u32,
    /// Code submissions a single phone number may make per hour.
    pub max_verify_attempts_per_hour: u32,
    /// Interval of the expired-code sweeper.
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    /// Base URL of the Graph API, e.g. `https://graph.facebook.com/v19.0`.
    pub api_url: String,
    pub phone_number_id: String,
    /// Empty outside production means messages are only logged.
    pub access_token: String,
    /// Token bucket capacity shared by all outbound messages.
    pub messages_per_second: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Prefix used to build the URL returned for an uploaded object.
    pub public_url: String,
    pub max_upload_bytes: usize,
}

/// Reads an optional variable, falling back to `default` when it is missing or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// Reads the JWT configuration from environment variables:
    /// - `JWT_SECRET`: Required. The secret key for JWT signing.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 24 hours if not provided.
    ///
    /// # Panics
    ///
    /// This function will panic if:
    /// - `JWT_SECRET` environment variable is not set
    /// - `JWT_EXPIRATION_HOURS` is set but cannot be parsed as a valid number
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key for JWT signing (via `JwtConfig::from_env()`)
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `OTP_TTL_MINUTES`: Verification code lifetime (default: 5)
    /// - WhatsApp, S3 and timeout settings (see implementation for details)
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                max_connections: env_or("DB_MAX_CONNECTIONS", 10),
                acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 5),
                statement_timeout_ms: env_or("DB_STATEMENT_TIMEOUT_MS", 5000),
            },
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env_or("PORT", 8080),
            num_workers: env_or("WORKERS", 4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            global_rate_limit_per_second: env_or("GLOBAL_RATE_LIMIT_PER_SECOND", 50),
            otp: OtpConfig {
                ttl_minutes: env_or("OTP_TTL_MINUTES", 5),
                max_sends_per_hour: env_or("OTP_MAX_SENDS_PER_HOUR", 5),
                max_verify_attempts_per_hour: env_or("OTP_MAX_VERIFY_ATTEMPTS_PER_HOUR", 10),
                sweep_interval_secs: env_or("OTP_SWEEP_INTERVAL_SECS", 600),
            },
            whatsapp: WhatsAppConfig {
                api_url: env::var("WHATSAPP_API_URL")
                    .unwrap_or_else(|_| "https://graph.facebook.com/v19.0".to_string()),
                phone_number_id: env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_default(),
                access_token: env::var("WHATSAPP_ACCESS_TOKEN").unwrap_or_default(),
                messages_per_second: env_or("WHATSAPP_MESSAGES_PER_SECOND", 10),
                timeout_secs: env_or("WHATSAPP_TIMEOUT_SECS", 10),
            },
            storage: StorageConfig {
                endpoint: env::var("S3_ENDPOINT")
                    .unwrap_or_else(|_| "http://localhost:9000".to_string()),
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "marketplace".to_string()),
                access_key: env::var("S3_ACCESS_KEY").unwrap_or_default(),
                secret_key: env::var("S3_SECRET_KEY").unwrap_or_default(),
                public_url: env::var("S3_PUBLIC_URL")
                    .unwrap_or_else(|_| "http://localhost:9000/marketplace".to_string()),
                max_upload_bytes: env_or("UPLOAD_MAX_BYTES", 5 * 1024 * 1024),
            },
            product_tx_timeout_secs: env_or("PRODUCT_TX_TIMEOUT_SECS", 10),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
