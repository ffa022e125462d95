pub struct UserCreateRequest {
    pub username: String,
    pub password_hash: Option<String>,
    pub roles: Vec<String>,
}
