pub struct CategoryInsert {
    pub name: String,
    pub path: String,
    pub image_url: Option<String>,
    pub parent_id: Option<i64>,
}
