use common::error::{AppError, Res};
use db::models::user::User;
use serde::{Deserialize, Serialize};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Res<()> {
        if self.username.trim().is_empty() {
            return Err(AppError::BadRequest("username is required".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::BadRequest(format!(
                "password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_is_rejected() {
        let req = RegisterRequest {
            username: "alice".to_string(),
            password: "1234567".to_string(),
        };
        assert!(matches!(req.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn blank_username_is_rejected() {
        let req = RegisterRequest {
            username: "  ".to_string(),
            password: "long enough".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
