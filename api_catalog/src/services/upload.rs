use common::{
    error::{AppError, Res},
    storage::ObjectStorage,
};
use mime_guess::mime;
use uuid::Uuid;

const ALLOWED_IMAGE_TYPES: [&str; 4] = ["jpeg", "png", "webp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UploadFolder {
    Products,
    Categories,
}

impl UploadFolder {
    pub fn from_str(folder: &str) -> Res<Self> {
        match folder {
            "products" => Ok(UploadFolder::Products),
            "categories" => Ok(UploadFolder::Categories),
            other => Err(AppError::BadRequest(format!(
                "Unknown upload folder: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadFolder::Products => "products",
            UploadFolder::Categories => "categories",
        }
    }
}

/// Parses the content type and returns the essence and file extension of an
/// accepted image type.
pub fn image_extension(content_type: &str) -> Res<(String, &'static str)> {
    let parsed: mime::Mime = content_type
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid content type: {}", content_type)))?;

    if parsed.type_() != mime::IMAGE || !ALLOWED_IMAGE_TYPES.contains(&parsed.subtype().as_str()) {
        return Err(AppError::BadRequest(format!(
            "Only {} images can be uploaded",
            ALLOWED_IMAGE_TYPES.join(", ")
        )));
    }

    let extensions = mime_guess::get_mime_extensions(&parsed).unwrap_or_default();
    let extension = extensions
        .iter()
        .copied()
        .find(|ext| *ext == "jpg")
        .or_else(|| extensions.first().copied())
        .ok_or_else(|| {
            AppError::BadRequest(format!("No file extension known for {}", parsed))
        })?;

    Ok((parsed.essence_str().to_string(), extension))
}

pub fn object_path(folder: UploadFolder, extension: &str) -> String {
    format!("{}/{}.{}", folder.as_str(), Uuid::new_v4(), extension)
}

/// Stores an image under a fresh name and returns its public URL.
pub async fn upload_image(
    storage: &dyn ObjectStorage,
    folder: UploadFolder,
    content_type: &str,
    bytes: &[u8],
    max_bytes: usize,
) -> Res<String> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::BadRequest(format!(
            "Uploaded file exceeds {} bytes",
            max_bytes
        )));
    }

    let (essence, extension) = image_extension(content_type)?;
    let path = object_path(folder, extension);
    let url = storage.upload(bytes, &path, &essence).await?;
    log::info!("Stored {} bytes at {}", bytes.len(), path);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct MemoryStorage {
        objects: Mutex<Vec<(String, String, usize)>>,
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn upload(&self, bytes: &[u8], path: &str, content_type: &str) -> Res<String> {
            self.objects.lock().unwrap().push((
                path.to_string(),
                content_type.to_string(),
                bytes.len(),
            ));
            Ok(format!("https://cdn.test/{}", path))
        }
    }

    #[test]
    fn jpeg_gets_the_jpg_extension() {
        let (essence, ext) = image_extension("image/jpeg").unwrap();
        assert_eq!(essence, "image/jpeg");
        assert_eq!(ext, "jpg");
        assert_eq!(image_extension("image/png; charset=binary").unwrap().1, "png");
    }

    #[test]
    fn non_images_are_rejected() {
        assert!(matches!(
            image_extension("application/pdf"),
            Err(AppError::BadRequest(_))
        ));
        assert!(image_extension("image/svg+xml").is_err());
        assert!(image_extension("not a mime").is_err());
    }

    #[test]
    fn unknown_folder_is_rejected() {
        assert!(UploadFolder::from_str("avatars").is_err());
        assert_eq!(
            UploadFolder::from_str("categories").unwrap(),
            UploadFolder::Categories
        );
    }

    #[tokio::test]
    async fn upload_lands_in_folder_with_fresh_name() {
        let storage = MemoryStorage::default();

        let url = upload_image(&storage, UploadFolder::Products, "image/png", b"\x89PNG", 1024)
            .await
            .unwrap();

        let objects = storage.objects.lock().unwrap();
        let (path, content_type, size) = &objects[0];
        assert!(path.starts_with("products/") && path.ends_with(".png"));
        assert_eq!(content_type, "image/png");
        assert_eq!(*size, 4);
        assert_eq!(url, format!("https://cdn.test/{}", path));
    }

    #[tokio::test]
    async fn oversized_and_empty_bodies_are_rejected() {
        let storage = MemoryStorage::default();
        assert!(
            upload_image(&storage, UploadFolder::Products, "image/png", &[0u8; 16], 8)
                .await
                .is_err()
        );
        assert!(
            upload_image(&storage, UploadFolder::Products, "image/png", &[], 8)
                .await
                .is_err()
        );
        assert!(storage.objects.lock().unwrap().is_empty());
    }
}
