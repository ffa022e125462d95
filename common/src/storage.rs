use async_trait::async_trait;
use s3::{Bucket, Region, creds::Credentials};

use crate::{
    env_config::StorageConfig,
    error::{AppError, Res},
};

/// Object storage used for product and category images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `path` and returns the public URL of the object.
    async fn upload(&self, bytes: &[u8], path: &str, content_type: &str) -> Res<String>;
}

/// S3-compatible bucket (AWS, MinIO, R2...) addressed path-style.
pub struct S3Storage {
    bucket: Box<Bucket>,
    public_url: String,
}

impl S3Storage {
    pub fn new(config: &StorageConfig) -> Res<Self> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Invalid S3 credentials: {}", e)))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| AppError::Internal(format!("Invalid S3 bucket configuration: {}", e)))?
            .with_path_style();

        Ok(Self {
            bucket,
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(&self, bytes: &[u8], path: &str, content_type: &str) -> Res<String> {
        let response = self
            .bucket
            .put_object_with_content_type(path, bytes, content_type)
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to upload {}: {}", path, e)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AppError::Upstream(format!(
                "Object storage returned status {} for {}",
                status, path
            )));
        }

        log::debug!("Uploaded {} ({} bytes)", path, bytes.len());
        Ok(format!("{}/{}", self.public_url, path.trim_start_matches('/')))
    }
}
