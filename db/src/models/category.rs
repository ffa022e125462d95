use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub image_url: Option<String>,
    /// `None` (or 0 in legacy rows) marks a root category.
    pub parent_id: Option<i64>,
    pub created_at: NaiveDateTime,
}
