use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use db::dtos::supplier::SupplierUpdateRequest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SupplierRegisterRequest {
    pub phone_number: String,
    pub name: String,
}

impl SupplierRegisterRequest {
    pub fn validate(&self) -> Res<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("name is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub phone_number: String,
    pub code: String,
}

/// The code itself is only delivered over WhatsApp.
#[derive(Debug, Serialize)]
pub struct CodeSentResponse {
    pub phone_number: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierDetailsRequest {
    pub market_id: Option<i64>,
    pub place: Option<String>,
    pub row_name: Option<String>,
    pub categories: Option<Vec<i64>>,
}

impl SupplierDetailsRequest {
    pub fn validate(&self) -> Res<()> {
        if self.market_id.is_some_and(|id| id <= 0) {
            return Err(AppError::BadRequest("market_id must be positive".to_string()));
        }
        if let Some(categories) = &self.categories {
            if categories.iter().any(|id| *id <= 0) {
                return Err(AppError::BadRequest(
                    "category ids must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl From<SupplierDetailsRequest> for SupplierUpdateRequest {
    fn from(req: SupplierDetailsRequest) -> Self {
        SupplierUpdateRequest {
            market_id: req.market_id,
            place: req.place,
            row_name: req.row_name,
            categories: req.categories,
        }
    }
}
