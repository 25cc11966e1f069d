pub mod inline;
pub mod s3_service;
pub mod temp_dir;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::ImageRole;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{AppConfig, StagingStrategy};
use inline::InlineStaging;
use s3_service::{ObjectStorageStaging, S3Service, S3ServiceError};
use temp_dir::TempDirStaging;

const FALLBACK_CONTENT_TYPE: &str = "image/png";

/// One file taken from the multipart upload. Owned by the request that received it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

impl UploadedImage {
    /// Keeps a declared `image/*` type, otherwise sniffs the bytes.
    pub fn new(data: Vec<u8>, declared_type: Option<&str>, file_name: impl Into<String>) -> Self {
        let content_type = match declared_type {
            Some(ct) if ct.starts_with("image/") => ct.to_string(),
            _ => image::guess_format(&data)
                .map(|format| format.to_mime_type().to_string())
                .unwrap_or_else(|_| FALLBACK_CONTENT_TYPE.to_string()),
        };
        Self {
            data,
            content_type,
            file_name: file_name.into(),
        }
    }
}

/// What the predictor receives for each image.
#[derive(Debug, Clone)]
pub enum ImageReference {
    Inline(UploadedImage),
    TempFile {
        path: PathBuf,
        file_name: String,
        content_type: String,
    },
    SignedUrl {
        url: String,
        key: String,
        file_name: String,
        expires_at: DateTime<Utc>,
    },
}

impl ImageReference {
    pub fn file_name(&self) -> &str {
        match self {
            ImageReference::Inline(image) => &image.file_name,
            ImageReference::TempFile { file_name, .. } => file_name,
            ImageReference::SignedUrl { file_name, .. } => file_name,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ImageReference::SignedUrl { expires_at, .. } => Some(*expires_at),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] S3ServiceError),
}

#[async_trait]
pub trait StagingAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn stage(
        &self,
        request_id: Uuid,
        role: ImageRole,
        image: UploadedImage,
    ) -> Result<ImageReference, StagingError>;

    async fn release(&self, reference: &ImageReference) -> Result<(), StagingError>;
}

pub async fn build_stager(config: &AppConfig) -> Result<Arc<dyn StagingAdapter>, StagingError> {
    let stager: Arc<dyn StagingAdapter> = match config.staging {
        StagingStrategy::Inline => Arc::new(InlineStaging),
        StagingStrategy::TempDir => Arc::new(TempDirStaging::new(config.scratch_dir.clone())),
        StagingStrategy::ObjectStorage => {
            let storage = config
                .object_storage
                .as_ref()
                .ok_or_else(|| S3ServiceError::S3("object storage is not configured".into()))?;
            let service = S3Service::from_config(storage).await;
            Arc::new(ObjectStorageStaging::new(service, storage.presign_expiry))
        }
    };
    Ok(stager)
}

/// Keeps only characters that are safe in object keys and file names.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Every reference staged for one request, released together when the request ends.
pub struct StagedImages {
    stager: Arc<dyn StagingAdapter>,
    request_id: Uuid,
    staged: Vec<(ImageRole, ImageReference)>,
}

impl StagedImages {
    pub fn new(stager: Arc<dyn StagingAdapter>, request_id: Uuid) -> Self {
        Self {
            stager,
            request_id,
            staged: Vec::new(),
        }
    }

    pub async fn stage(&mut self, role: ImageRole, image: UploadedImage) -> Result<(), StagingError> {
        let reference = self.stager.stage(self.request_id, role, image).await?;
        log::debug!(
            "[{}] staged {} via {} as {}",
            self.request_id,
            role,
            self.stager.name(),
            reference.file_name()
        );
        if let Some(expires_at) = reference.expires_at() {
            log::debug!("[{}] {} link valid until {}", self.request_id, role, expires_at);
        }
        self.staged.push((role, reference));
        Ok(())
    }

    pub fn get(&self, role: ImageRole) -> Option<&ImageReference> {
        self.staged
            .iter()
            .find(|(staged_role, _)| *staged_role == role)
            .map(|(_, reference)| reference)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Releases everything staged so far. Returns how many releases failed.
    pub async fn release_all(mut self) -> usize {
        let staged = std::mem::take(&mut self.staged);
        release_each(self.stager.as_ref(), self.request_id, staged).await
    }
}

impl Drop for StagedImages {
    fn drop(&mut self) {
        if self.is_empty() {
            return;
        }
        // Request future dropped mid-flight; finish the release pass in the background.
        let staged = std::mem::take(&mut self.staged);
        let stager = self.stager.clone();
        let request_id = self.request_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    release_each(stager.as_ref(), request_id, staged).await;
                });
            }
            Err(_) => log::warn!(
                "[{}] no runtime available, {} staged image(s) left behind",
                request_id,
                staged.len()
            ),
        }
    }
}

async fn release_each(
    stager: &dyn StagingAdapter,
    request_id: Uuid,
    staged: Vec<(ImageRole, ImageReference)>,
) -> usize {
    let mut failures = 0;
    for (role, reference) in staged {
        if let Err(e) = stager.release(&reference).await {
            failures += 1;
            log::warn!("[{}] failed to release staged {}: {}", request_id, role, e);
        }
    }
    failures
}
