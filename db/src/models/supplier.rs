use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub user_id: i64,
    pub phone_number: String,
    pub is_verified: bool,
    pub name: String,
    pub market_id: Option<i64>,
    pub place: Option<String>,
    pub row_name: Option<String>,
    pub categories: Option<Vec<i64>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
