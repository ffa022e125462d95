use std::sync::Arc;

use actix_web::{HttpRequest, Responder, http::header, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
    jwt::JwtClaims,
    misc::UserRole,
    storage::ObjectStorage,
};
use serde_json::json;

use crate::services::upload::{self, UploadFolder};

/// Uploads one image. The raw request body is the file, `Content-Type` its type.
///
/// `products` accepts suppliers and admins, `categories` admins only.
///
/// # Frontend Example
/// ```javascript
/// const res = await fetch('/api/dashboard/catalog/upload/products', {
///   method: 'POST',
///   headers: { 'Authorization': `Bearer ${token}`, 'Content-Type': file.type },
///   body: file
/// });
/// const { url } = await res.json();
/// ```
#[post("/upload/{folder}")]
async fn post_upload(
    claims: web::ReqData<JwtClaims>,
    path: web::Path<String>,
    req: HttpRequest,
    body: web::Bytes,
    storage: web::Data<dyn ObjectStorage>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let folder = UploadFolder::from_str(&path)?;
    match folder {
        UploadFolder::Categories => claims.require_role(UserRole::Admin)?,
        UploadFolder::Products if !claims.has_role(UserRole::Admin) => {
            claims.require_role(UserRole::Supplier)?
        }
        UploadFolder::Products => {}
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Content-Type header is required".to_string()))?;

    let url = upload::upload_image(
        &**storage,
        folder,
        content_type,
        &body,
        config.storage.max_upload_bytes,
    )
    .await?;
    Success::created(json!({ "url": url }))
}
