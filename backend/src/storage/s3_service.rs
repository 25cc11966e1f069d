use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;
use shared::ImageRole;
use std::time::Duration;
use uuid::Uuid;

use super::{ImageReference, StagingAdapter, StagingError, UploadedImage, sanitize_file_name};
use crate::config::ObjectStorageConfig;

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Failed to sign URL: {0}")]
    Presign(String),
}

impl S3Service {
    pub fn new(client: Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }

    pub async fn from_config(config: &ObjectStorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "tryon-env",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint_url)
            .credentials_provider(credentials)
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Self::new(Client::from_conf(s3_config), config.bucket.clone())
    }

    /// Request-scoped key, so identical file names from concurrent requests never collide.
    pub fn generate_s3_key(request_id: Uuid, role: ImageRole, file_name: &str) -> String {
        format!(
            "uploads/{}/{}/{}",
            request_id,
            role.slug(),
            sanitize_file_name(file_name)
        )
    }

    pub async fn upload_image(
        &self,
        image_data: &[u8],
        s3_key: &str,
        mime_type: &str,
    ) -> Result<(), S3ServiceError> {
        let body = ByteStream::from(image_data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .body(body)
            .content_type(mime_type)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    /// Time-limited GET URL for an object; signing happens locally.
    pub async fn presigned_url(&self, s3_key: &str, expires_in: Duration) -> Result<String, S3ServiceError> {
        let presigning =
            PresigningConfig::expires_in(expires_in).map_err(|e| S3ServiceError::Presign(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .presigned(presigning)
            .await
            .map_err(|e| S3ServiceError::Presign(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }

    pub async fn delete_image(&self, s3_key: &str) -> Result<(), S3ServiceError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}

/// Uploads each image to the bucket and hands the predictor a signed URL.
#[derive(Clone)]
pub struct ObjectStorageStaging {
    service: S3Service,
    expiry: Duration,
}

impl ObjectStorageStaging {
    pub fn new(service: S3Service, expiry: Duration) -> Self {
        Self { service, expiry }
    }
}

#[async_trait]
impl StagingAdapter for ObjectStorageStaging {
    fn name(&self) -> &'static str {
        "object-storage"
    }

    async fn stage(
        &self,
        request_id: Uuid,
        role: ImageRole,
        image: UploadedImage,
    ) -> Result<ImageReference, StagingError> {
        let key = S3Service::generate_s3_key(request_id, role, &image.file_name);
        self.service
            .upload_image(&image.data, &key, &image.content_type)
            .await?;

        let signed_at = Utc::now();
        let url = match self.service.presigned_url(&key, self.expiry).await {
            Ok(url) => url,
            Err(e) => {
                if let Err(cleanup) = self.service.delete_image(&key).await {
                    log::warn!("[{}] failed to remove unsigned object {}: {}", request_id, key, cleanup);
                }
                return Err(e.into());
            }
        };

        let expires_at = signed_at
            + chrono::Duration::from_std(self.expiry).unwrap_or_else(|_| chrono::Duration::hours(1));

        Ok(ImageReference::SignedUrl {
            url,
            key,
            file_name: image.file_name,
            expires_at,
        })
    }

    async fn release(&self, reference: &ImageReference) -> Result<(), StagingError> {
        let ImageReference::SignedUrl { key, .. } = reference else {
            return Ok(());
        };
        self.service.delete_image(key).await?;
        Ok(())
    }
}
