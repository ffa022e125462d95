use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub market_id: i64,
    pub status_id: i64,
    pub supplier_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProductVariation {
    pub id: i64,
    pub product_id: i64,
    pub position: i32,
    pub price: i64,
    pub quantity: i32,
}

/// Attribute name/value pair linked to a variation.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct VariationAttribute {
    pub variation_id: i64,
    pub name: String,
    pub value: String,
}

/// Image URL list owned by a product or a variation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageSet {
    pub owner_id: i64,
    pub urls: Vec<String>,
}
