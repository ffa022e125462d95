use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use common::{
    env_config::JwtConfig,
    error::{AppError, Res},
    jwt::{self, ClaimsSpec},
};
use db::models::user::User;
use sqlx::PgPool;

use crate::dtos::auth::{AuthResponse, LoginRequest};

/// Authenticates existing user.
/// Unknown usernames, password-less (OTP only) accounts and wrong passwords
/// all answer 401 with the same message.
pub async fn authenticate_user(pool: &PgPool, login_data: &LoginRequest) -> Res<User> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = db::user::get_user_by_username(pool, login_data.username.trim())
        .await?
        .ok_or_else(invalid)?;
    let stored_hash = user.password_hash.as_deref().ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is malformed: {}", e)))?;
    Argon2::default()
        .verify_password(login_data.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    Ok(user)
}

/// Signs a token for `user` and bundles both into the login response.
pub fn issue_token(user: User, config: &JwtConfig) -> Res<AuthResponse> {
    let token = jwt::generate_jwt(
        ClaimsSpec {
            user_id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
        },
        config,
    )?;
    Ok(AuthResponse { token, user })
}
