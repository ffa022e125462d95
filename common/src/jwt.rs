use actix_web::{HttpMessage, HttpResponse, dev::ServiceRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
    misc::UserRole,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: i64,
    pub username: String,
    pub roles: Vec<String>,
    pub exp: usize,
}

impl JwtClaims {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.iter().any(|r| r == role.as_str())
    }

    /// Fails with `Forbidden` unless the token carries `role`.
    pub fn require_role(&self, role: UserRole) -> Res<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role '{}' is required for this operation",
                role
            )))
        }
    }
}

pub struct ClaimsSpec {
    pub user_id: i64,
    pub username: String,
    pub roles: Vec<String>,
}

/// Generates JWT token based on user object and JWT configuration options
pub fn generate_jwt(spec: ClaimsSpec, config: &JwtConfig) -> Res<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.expiration_hours))
        .ok_or_else(|| AppError::Internal("JWT expiration overflows".to_string()))?
        .timestamp();

    let claims = JwtClaims {
        user_id: spec.user_id,
        username: spec.username,
        roles: spec.roles,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;
    Ok(token_data.claims)
}

pub fn get_jwt_claims_or_error(req: &ServiceRequest) -> Result<JwtClaims, HttpResponse> {
    if let Some(jwt_claims_res) = req.extensions().get::<Res<JwtClaims>>() {
        match jwt_claims_res {
            Ok(claims) => Ok(claims.clone()),
            Err(app_error) => Err(app_error.to_http_response()),
        }
    } else {
        Err(
            AppError::Unauthorized("No authorization token provided".to_string())
                .to_http_response(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let token = generate_jwt(
            ClaimsSpec {
                user_id: 42,
                username: "+380501112233".to_string(),
                roles: vec!["supplier".to_string()],
            },
            &config(),
        )
        .unwrap();

        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.user_id, 42);
        assert!(claims.has_role(UserRole::Supplier));
        assert!(claims.require_role(UserRole::Admin).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_unauthorized() {
        let token = generate_jwt(
            ClaimsSpec {
                user_id: 1,
                username: "alice".to_string(),
                roles: vec![],
            },
            &config(),
        )
        .unwrap();

        let err = validate_jwt(&token, "another-secret").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
