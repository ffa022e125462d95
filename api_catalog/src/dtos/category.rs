use common::error::{AppError, Res};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CategoryCreateRequest {
    pub name: String,
    /// Omitted or 0 creates a root category.
    pub parent_id: Option<i64>,
    pub image_url: Option<String>,
}

impl CategoryCreateRequest {
    pub fn validate(&self) -> Res<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("category name is required".to_string()));
        }
        if self.parent_id.is_some_and(|id| id < 0) {
            return Err(AppError::BadRequest("parent_id must not be negative".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub status_id: i64,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
