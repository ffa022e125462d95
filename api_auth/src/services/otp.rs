use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{
    error::{AppError, Res, ResultExt},
    whatsapp::MessageSender,
};
use db::models::verification::VerificationCode;
use rand::Rng;
use sqlx::PgPool;

/// Number of digits in a verification code.
pub const CODE_LENGTH: usize = 6;

/// Persistence of verification codes, keyed by phone number.
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn insert_code(
        &self,
        phone_number: &str,
        code: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Res<VerificationCode>;

    /// Most recently created code, the only one that counts.
    async fn latest_code(&self, phone_number: &str) -> Res<Option<VerificationCode>>;

    async fn delete_code(&self, code_id: i64) -> Res<u64>;

    async fn delete_codes(&self, phone_number: &str) -> Res<u64>;

    async fn delete_expired(&self, phone_number: Option<&str>, now: DateTime<Utc>) -> Res<u64>;
}

#[async_trait]
impl CodeStore for PgPool {
    async fn insert_code(
        &self,
        phone_number: &str,
        code: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Res<VerificationCode> {
        db::verification::insert_code(self, phone_number, code, created_at, expires_at).await
    }

    async fn latest_code(&self, phone_number: &str) -> Res<Option<VerificationCode>> {
        db::verification::get_latest_code(self, phone_number).await
    }

    async fn delete_code(&self, code_id: i64) -> Res<u64> {
        db::verification::delete_code(self, code_id).await
    }

    async fn delete_codes(&self, phone_number: &str) -> Res<u64> {
        db::verification::delete_codes(self, phone_number).await
    }

    async fn delete_expired(&self, phone_number: Option<&str>, now: DateTime<Utc>) -> Res<u64> {
        db::verification::delete_expired_codes(self, phone_number, now).await
    }
}

/// Outcome of checking a submitted code against the latest stored one.
///
/// Per phone number the flow is `Unverified -> CodeIssued -> Valid -> Verified`.
/// `Expired` and `Mismatch` leave the number in `CodeIssued` until a new code
/// is issued; a new code always replaces the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    /// No code was ever issued, or the codes were already consumed.
    Missing,
    Mismatch,
    /// `now` is at or past `expires_at`.
    Expired,
}

impl CodeCheck {
    pub fn classify(latest: Option<&VerificationCode>, submitted: &str, now: DateTime<Utc>) -> Self {
        match latest {
            None => CodeCheck::Missing,
            Some(row) if now >= row.expires_at => CodeCheck::Expired,
            Some(row) if row.code != submitted.trim() => CodeCheck::Mismatch,
            Some(_) => CodeCheck::Valid,
        }
    }

    pub fn is_valid(self) -> bool {
        self == CodeCheck::Valid
    }

    /// Maps every non-valid outcome to the client error returned by the API.
    pub fn into_result(self) -> Res<()> {
        match self {
            CodeCheck::Valid => Ok(()),
            CodeCheck::Missing | CodeCheck::Mismatch => Err(AppError::Unauthorized(
                "Invalid verification code".to_string(),
            )),
            CodeCheck::Expired => Err(AppError::Expired(
                "Request a new verification code".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Uniformly distributed, zero padded numeric code.
pub fn generate_code() -> String {
    let max = 10u32.pow(CODE_LENGTH as u32);
    let n = rand::rng().random_range(0..max);
    format!("{:0width$}", n, width = CODE_LENGTH)
}

fn message_body(code: &str, ttl: Duration) -> String {
    format!(
        "Your verification code is {}. It expires in {} minutes.",
        code,
        ttl.num_minutes()
    )
}

pub struct OtpEngine<'a> {
    store: &'a dyn CodeStore,
    sender: &'a dyn MessageSender,
    ttl: Duration,
}

impl<'a> OtpEngine<'a> {
    pub fn new(store: &'a dyn CodeStore, sender: &'a dyn MessageSender, ttl_minutes: i64) -> Self {
        Self {
            store,
            sender,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub async fn issue_code(&self, phone_number: &str) -> Res<IssuedCode> {
        self.issue_code_at(phone_number, Utc::now()).await
    }

    /// Stores a fresh code and hands it to the sender.
    ///
    /// Earlier codes of the number are not checked; they simply stop being the
    /// latest. Already expired rows of the number are purged first. A delivery
    /// failure fails the whole call and removes the undelivered code again, so
    /// the previously delivered code keeps working.
    pub async fn issue_code_at(&self, phone_number: &str, now: DateTime<Utc>) -> Res<IssuedCode> {
        let purged = self
            .store
            .delete_expired(Some(phone_number), now)
            .await
            .context("purge expired verification codes")?;
        if purged > 0 {
            log::debug!("Purged {} expired codes for {}", purged, phone_number);
        }

        let code = generate_code();
        let expires_at = now + self.ttl;
        let row = self
            .store
            .insert_code(phone_number, &code, now, expires_at)
            .await
            .context("store verification code")?;

        if let Err(e) = self
            .sender
            .send(&message_body(&code, self.ttl), phone_number)
            .await
        {
            if let Err(cleanup) = self.store.delete_code(row.id).await {
                log::error!(
                    "Failed to remove undelivered code {} for {}: {}",
                    row.id,
                    phone_number,
                    cleanup
                );
            }
            return Err(e).context("deliver verification code");
        }

        log::info!("Verification code issued for {}", phone_number);
        Ok(IssuedCode { code, expires_at })
    }

    pub async fn check_code_at(
        &self,
        phone_number: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Res<CodeCheck> {
        let latest = self
            .store
            .latest_code(phone_number)
            .await
            .context("load latest verification code")?;
        Ok(CodeCheck::classify(latest.as_ref(), code, now))
    }

    pub async fn validate_code(&self, phone_number: &str, code: &str) -> Res<bool> {
        self.validate_code_at(phone_number, code, Utc::now()).await
    }

    /// Never deletes anything, failed attempts leave the stored code in place.
    pub async fn validate_code_at(
        &self,
        phone_number: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Res<bool> {
        Ok(self.check_code_at(phone_number, code, now).await?.is_valid())
    }

    /// Deletes every code of the number once it has been verified.
    pub async fn consume(&self, phone_number: &str) -> Res<u64> {
        self.store
            .delete_codes(phone_number)
            .await
            .context("consume verification codes")
    }
}

/// Deletes expired codes of every number. Errors are logged, never returned.
pub async fn sweep_expired_codes(store: &dyn CodeStore, now: DateTime<Utc>) -> u64 {
    match store.delete_expired(None, now).await {
        Ok(n) => {
            if n > 0 {
                log::info!("Swept {} expired verification codes", n);
            }
            n
        }
        Err(e) => {
            log::error!("Failed to sweep expired verification codes: {}", e);
            0
        }
    }
}
