#[derive(Debug, Clone)]
pub struct ProductInsert {
    pub name: String,
    pub category_id: i64,
    pub market_id: i64,
    pub status_id: i64,
    pub supplier_id: i64,
}

#[derive(Debug, Clone)]
pub struct VariationInsert {
    pub product_id: i64,
    pub position: i32,
    pub price: i64,
    pub quantity: i32,
}
