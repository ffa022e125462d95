use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, password_hash::PasswordHasher};
use common::error::{AppError, Res};
use common::misc::UserRole;
use db::dtos::user::UserCreateRequest;
use db::models::user::User;
use sqlx::PgPool;

use crate::{dtos::auth::RegisterRequest, services::directory::Directory};

pub async fn get_user_by_id(pool: &PgPool, user_id: i64) -> Res<User> {
    db::user::get_user_by_id(pool, user_id).await
}

/// Get-or-create a password-less user, merging `extra_roles` into its roles.
///
/// Safe under concurrency: every caller ends up with the same row.
pub async fn ensure_user(
    directory: &dyn Directory,
    identifier: &str,
    extra_roles: &[UserRole],
) -> Res<User> {
    let mut roles = UserRole::default_set();
    roles.extend(extra_roles.iter().map(|r| r.as_str().to_string()));
    roles.sort();
    roles.dedup();

    directory
        .upsert_user(UserCreateRequest {
            username: identifier.to_string(),
            password_hash: None,
            roles,
        })
        .await
}

/// Inserts user record with an Argon2 password hash.
pub async fn create_user_with_credentials(pool: &PgPool, req: &RegisterRequest) -> Res<User> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    db::user::insert_user(
        pool,
        UserCreateRequest {
            username: req.username.trim().to_string(),
            password_hash: Some(password_hash),
            roles: UserRole::default_set(),
        },
    )
    .await
    .map_err(|e| match e {
        AppError::Conflict(_) => AppError::Conflict("Username already exists".to_string()),
        other => other,
    })
}
