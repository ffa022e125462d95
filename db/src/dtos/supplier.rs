pub struct SupplierCreateRequest {
    pub user_id: i64,
    pub phone_number: String,
    pub name: String,
}

/// Fields left as `None` keep their stored value.
#[derive(Default)]
pub struct SupplierUpdateRequest {
    pub market_id: Option<i64>,
    pub place: Option<String>,
    pub row_name: Option<String>,
    pub categories: Option<Vec<i64>>,
}
