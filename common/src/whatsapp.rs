use std::{num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::json;

use crate::{
    env_config::WhatsAppConfig,
    error::{AppError, Res},
};

/// Outbound text message delivery.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, body: &str, recipient_phone: &str) -> Res<()>;
}

/// WhatsApp Cloud API client.
///
/// All messages share one token bucket; `send` waits for a permit before
/// calling the API.
pub struct WhatsAppClient {
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    messages_url: String,
    access_token: String,
    dry_run: bool,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig, is_production: bool) -> Res<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let per_second = NonZeroU32::new(config.messages_per_second).ok_or_else(|| {
            AppError::Internal("WHATSAPP_MESSAGES_PER_SECOND must be positive".to_string())
        })?;

        let dry_run = config.access_token.is_empty();
        if dry_run && is_production {
            return Err(AppError::Internal(
                "WHATSAPP_ACCESS_TOKEN must be set in production".to_string(),
            ));
        }
        if dry_run {
            log::warn!("WhatsApp access token not set, messages will only be logged");
        }

        Ok(Self {
            http,
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            messages_url: format!(
                "{}/{}/messages",
                config.api_url.trim_end_matches('/'),
                config.phone_number_id
            ),
            access_token: config.access_token.clone(),
            dry_run,
        })
    }
}

#[async_trait]
impl MessageSender for WhatsAppClient {
    async fn send(&self, body: &str, recipient_phone: &str) -> Res<()> {
        self.limiter.until_ready().await;

        if self.dry_run {
            log::info!("[dry-run] WhatsApp message to {}: {}", recipient_phone, body);
            return Ok(());
        }

        let payload = json!({
            "messaging_product": "whatsapp",
            "to": recipient_phone.trim_start_matches('+'),
            "type": "text",
            "text": { "body": body },
        });

        let response = self
            .http
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to reach WhatsApp API: {}", e)))?;

        if response.status().is_success() {
            log::debug!("WhatsApp message delivered to {}", recipient_phone);
            Ok(())
        } else {
            let status = response.status();
            let details = response.text().await.unwrap_or_default();
            Err(AppError::Upstream(format!(
                "WhatsApp API returned error status {}: {}",
                status, details
            )))
        }
    }
}
