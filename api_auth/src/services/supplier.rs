use common::{
    env_config::JwtConfig,
    error::{AppError, Res, ResultExt},
    misc::{UserRole, normalize_phone},
};
use db::{
    dtos::supplier::{SupplierCreateRequest, SupplierUpdateRequest},
    models::supplier::Supplier,
};
use limiter::{AttemptLimiter, PhoneLimiter};

use crate::{
    dtos::auth::AuthResponse,
    services::{
        auth,
        directory::Directory,
        otp::{IssuedCode, OtpEngine},
        user,
    },
};

/// Creates the user and supplier rows for `phone` (both idempotent) and sends
/// the first verification code.
///
/// A phone number that is already the username of a credential account is
/// refused, otherwise the code would log its receiver into that account.
pub async fn register_supplier(
    directory: &dyn Directory,
    engine: &OtpEngine<'_>,
    throttle: &PhoneLimiter,
    raw_phone: &str,
    name: &str,
) -> Res<(Supplier, IssuedCode)> {
    let phone_number = normalize_phone(raw_phone)?;

    let existing = directory
        .find_user(&phone_number)
        .await
        .context("look up supplier user")?;
    if existing.is_some_and(|u| u.password_hash.is_some()) {
        return Err(AppError::Conflict(format!(
            "Phone number {} belongs to a password account",
            phone_number
        )));
    }
    throttle.check(&phone_number)?;

    let user = user::ensure_user(directory, &phone_number, &[UserRole::Supplier])
        .await
        .context("ensure supplier user")?;
    let supplier = directory
        .insert_supplier(SupplierCreateRequest {
            user_id: user.id,
            phone_number: phone_number.clone(),
            name: name.trim().to_string(),
        })
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => AppError::Conflict(format!(
                "Phone number {} is already registered",
                phone_number
            )),
            other => other,
        })?;

    let issued = engine.issue_code(&supplier.phone_number).await?;
    log::info!(
        "Supplier {} registered for user {}",
        supplier.id,
        supplier.user_id
    );
    Ok((supplier, issued))
}

/// Re-sends a code to an already registered supplier phone.
pub async fn send_code(
    directory: &dyn Directory,
    engine: &OtpEngine<'_>,
    throttle: &PhoneLimiter,
    raw_phone: &str,
) -> Res<(String, IssuedCode)> {
    let phone_number = normalize_phone(raw_phone)?;
    if directory.supplier_by_phone(&phone_number).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "No supplier registered for {}",
            phone_number
        )));
    }
    throttle.check(&phone_number)?;

    let issued = engine.issue_code(&phone_number).await?;
    Ok((phone_number, issued))
}

pub async fn verify_code(
    directory: &dyn Directory,
    engine: &OtpEngine<'_>,
    attempts: &AttemptLimiter,
    jwt_config: &JwtConfig,
    raw_phone: &str,
    code: &str,
) -> Res<AuthResponse> {
    verify_code_at(
        directory,
        engine,
        attempts,
        jwt_config,
        raw_phone,
        code,
        chrono::Utc::now(),
    )
    .await
}

/// Checks the code, flips the supplier to verified, consumes every code of the
/// phone and logs the user in.
///
/// Each call spends one attempt of the phone's budget before the code is
/// looked at.
pub async fn verify_code_at(
    directory: &dyn Directory,
    engine: &OtpEngine<'_>,
    attempts: &AttemptLimiter,
    jwt_config: &JwtConfig,
    raw_phone: &str,
    code: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Res<AuthResponse> {
    let phone_number = normalize_phone(raw_phone)?;
    attempts.check(&phone_number)?;

    engine
        .check_code_at(&phone_number, code, now)
        .await?
        .into_result()?;

    if directory.mark_phone_verified(&phone_number).await? == 0 {
        return Err(AppError::NotFound(format!(
            "No supplier registered for {}",
            phone_number
        )));
    }
    engine.consume(&phone_number).await?;

    let user = user::ensure_user(directory, &phone_number, &[UserRole::Supplier])
        .await
        .context("load verified user")?;
    log::info!("Phone {} verified for user {}", phone_number, user.id);
    auth::issue_token(user, jwt_config)
}

pub async fn get_for_user(directory: &dyn Directory, user_id: i64) -> Res<Supplier> {
    directory
        .supplier_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier profile does not exist".to_string()))
}

pub async fn update_details(
    directory: &dyn Directory,
    user_id: i64,
    data: SupplierUpdateRequest,
) -> Res<Supplier> {
    directory
        .update_supplier_details(user_id, data)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier profile does not exist".to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDateTime, Utc};
    use common::jwt;
    use db::models::user::User;

    use super::*;
    use crate::services::testing::{MemoryCodes, MemoryDirectory, RecordingSender};

    const PHONE: &str = "+380501112233";

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "supplier-test-secret".to_string(),
            expiration_hours: 1,
        }
    }

    fn limits() -> (PhoneLimiter, AttemptLimiter) {
        (PhoneLimiter::new(10).unwrap(), AttemptLimiter::new(10).unwrap())
    }

    fn wrong_code(code: &str) -> &'static str {
        if code == "123456" { "654321" } else { "123456" }
    }

    #[tokio::test]
    async fn registration_creates_supplier_user_and_sends_a_code() {
        let directory = MemoryDirectory::default();
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let (throttle, _) = limits();

        let (supplier, _) =
            register_supplier(&directory, &engine, &throttle, "+380 50 111 22 33", " Green Farm ")
                .await
                .unwrap();

        assert_eq!(supplier.phone_number, PHONE);
        assert_eq!(supplier.name, "Green Farm");
        assert!(!supplier.is_verified);
        let user = directory.find_user(PHONE).await.unwrap().unwrap();
        assert!(user.roles.contains(&"supplier".to_string()));
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
        assert_eq!(codes.count(PHONE), 1);
    }

    #[tokio::test]
    async fn registration_refuses_a_password_account_with_that_name() {
        let directory = MemoryDirectory::default();
        directory.users.lock().unwrap().push(User {
            id: 1,
            username: PHONE.to_string(),
            password_hash: Some("$argon2id$stored".to_string()),
            roles: vec!["customer".to_string()],
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        });
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let (throttle, _) = limits();

        let err = register_supplier(&directory, &engine, &throttle, PHONE, "Green Farm")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert!(directory.supplier(PHONE).is_none());
        assert!(sender.sent.lock().unwrap().is_empty());
        assert_eq!(directory.users.lock().unwrap()[0].roles, vec!["customer".to_string()]);
    }

    #[tokio::test]
    async fn verification_marks_consumes_and_logs_in() {
        let directory = MemoryDirectory::default();
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let (throttle, attempts) = limits();
        let (supplier, issued) = register_supplier(&directory, &engine, &throttle, PHONE, "Farm")
            .await
            .unwrap();

        let auth = verify_code_at(
            &directory,
            &engine,
            &attempts,
            &jwt_config(),
            PHONE,
            &issued.code,
            Utc::now() + Duration::minutes(1),
        )
        .await
        .unwrap();

        assert!(directory.supplier(PHONE).unwrap().is_verified);
        assert_eq!(codes.count(PHONE), 0);
        assert_eq!(auth.user.id, supplier.user_id);
        let claims = jwt::validate_jwt(&auth.token, &jwt_config().secret).unwrap();
        assert_eq!(claims.user_id, supplier.user_id);
        assert!(claims.roles.contains(&"supplier".to_string()));
    }

    #[tokio::test]
    async fn wrong_code_leaves_supplier_unverified() {
        let directory = MemoryDirectory::default();
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let (throttle, attempts) = limits();
        let (_, issued) = register_supplier(&directory, &engine, &throttle, PHONE, "Farm")
            .await
            .unwrap();

        let err = verify_code_at(
            &directory,
            &engine,
            &attempts,
            &jwt_config(),
            PHONE,
            wrong_code(&issued.code),
            Utc::now() + Duration::minutes(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(!directory.supplier(PHONE).unwrap().is_verified);
        assert_eq!(codes.count(PHONE), 1);
    }

    #[tokio::test]
    async fn valid_code_without_supplier_is_not_found() {
        let directory = MemoryDirectory::default();
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let (_, attempts) = limits();
        let issued = engine.issue_code(PHONE).await.unwrap();

        let err = verify_code(&directory, &engine, &attempts, &jwt_config(), PHONE, &issued.code)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(codes.count(PHONE), 1);
        assert!(directory.find_user(PHONE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn verifying_an_already_verified_phone_succeeds() {
        let directory = MemoryDirectory::default();
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let (throttle, attempts) = limits();
        let (_, first) = register_supplier(&directory, &engine, &throttle, PHONE, "Farm")
            .await
            .unwrap();
        verify_code(&directory, &engine, &attempts, &jwt_config(), PHONE, &first.code)
            .await
            .unwrap();

        let (_, second) = send_code(&directory, &engine, &throttle, PHONE).await.unwrap();
        let auth = verify_code(&directory, &engine, &attempts, &jwt_config(), PHONE, &second.code)
            .await
            .unwrap();

        assert!(directory.supplier(PHONE).unwrap().is_verified);
        assert_eq!(directory.suppliers.lock().unwrap().len(), 1);
        assert!(!auth.token.is_empty());
    }

    #[tokio::test]
    async fn attempts_run_out_before_a_code_can_be_guessed() {
        let directory = MemoryDirectory::default();
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let throttle = PhoneLimiter::new(10).unwrap();
        let attempts = AttemptLimiter::new(3).unwrap();
        let (_, issued) = register_supplier(&directory, &engine, &throttle, PHONE, "Farm")
            .await
            .unwrap();

        for _ in 0..3 {
            let err = verify_code(
                &directory,
                &engine,
                &attempts,
                &jwt_config(),
                PHONE,
                wrong_code(&issued.code),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }

        let err = verify_code(&directory, &engine, &attempts, &jwt_config(), PHONE, &issued.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_)));
        assert!(!directory.supplier(PHONE).unwrap().is_verified);
    }

    #[tokio::test]
    async fn send_code_requires_a_registered_supplier() {
        let directory = MemoryDirectory::default();
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let (throttle, _) = limits();

        let err = send_code(&directory, &engine, &throttle, PHONE).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn details_update_keeps_omitted_fields() {
        let directory = MemoryDirectory::default();
        let codes = MemoryCodes::default();
        let sender = RecordingSender::default();
        let engine = OtpEngine::new(&codes, &sender, 5);
        let (throttle, _) = limits();
        let (supplier, _) = register_supplier(&directory, &engine, &throttle, PHONE, "Farm")
            .await
            .unwrap();

        update_details(
            &directory,
            supplier.user_id,
            SupplierUpdateRequest {
                market_id: Some(2),
                place: Some("B-12".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let updated = update_details(
            &directory,
            supplier.user_id,
            SupplierUpdateRequest {
                categories: Some(vec![3, 4]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.market_id, Some(2));
        assert_eq!(updated.place.as_deref(), Some("B-12"));
        assert_eq!(updated.row_name, None);
        assert_eq!(updated.categories, Some(vec![3, 4]));
    }

    #[tokio::test]
    async fn details_of_a_missing_supplier_are_not_found() {
        let directory = MemoryDirectory::default();

        assert!(matches!(
            update_details(&directory, 7, SupplierUpdateRequest::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            get_for_user(&directory, 7).await,
            Err(AppError::NotFound(_))
        ));
    }
}
