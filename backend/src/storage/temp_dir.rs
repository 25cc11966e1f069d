use async_trait::async_trait;
use shared::ImageRole;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

use super::{ImageReference, StagingAdapter, StagingError, UploadedImage, sanitize_file_name};

/// Writes uploads into a scratch directory for the predictor to read back.
#[derive(Debug, Clone)]
pub struct TempDirStaging {
    root: PathBuf,
}

impl TempDirStaging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn staged_path(&self, request_id: Uuid, role: ImageRole, file_name: &str) -> PathBuf {
        self.root.join(format!(
            "{}-{}-{}",
            request_id,
            role.slug(),
            sanitize_file_name(file_name)
        ))
    }

    async fn ensure_root(&self) -> Result<(), std::io::Error> {
        match fs::create_dir(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl StagingAdapter for TempDirStaging {
    fn name(&self) -> &'static str {
        "temp-dir"
    }

    async fn stage(
        &self,
        request_id: Uuid,
        role: ImageRole,
        image: UploadedImage,
    ) -> Result<ImageReference, StagingError> {
        self.ensure_root().await?;

        let path = self.staged_path(request_id, role, &image.file_name);
        if let Err(e) = fs::write(&path, &image.data).await {
            // A partial write must not outlive the failed stage.
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        Ok(ImageReference::TempFile {
            path,
            file_name: image.file_name,
            content_type: image.content_type,
        })
    }

    async fn release(&self, reference: &ImageReference) -> Result<(), StagingError> {
        let ImageReference::TempFile { path, .. } = reference else {
            return Ok(());
        };
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn stage_writes_and_release_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let staging = TempDirStaging::new(dir.path().join("scratch"));
        let request_id = Uuid::new_v4();

        let reference = staging
            .stage(
                request_id,
                ImageRole::Garment,
                UploadedImage::new(b"garment-bytes".to_vec(), Some("image/png"), "shirt.png"),
            )
            .await
            .unwrap();

        let ImageReference::TempFile { path, .. } = &reference else {
            panic!("expected a temp file reference");
        };
        assert_eq!(path, &staging.staged_path(request_id, ImageRole::Garment, "shirt.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"garment-bytes");

        staging.release(&reference).await.unwrap();
        assert!(!path.exists());

        // Second release of the same file is harmless.
        staging.release(&reference).await.unwrap();
    }

    #[actix_web::test]
    async fn existing_root_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let staging = TempDirStaging::new(dir.path());
        let request_id = Uuid::new_v4();

        for role in [ImageRole::Person, ImageRole::Garment] {
            staging
                .stage(request_id, role, UploadedImage::new(vec![1], None, "same.png"))
                .await
                .unwrap();
        }

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 2);
    }

    #[actix_web::test]
    async fn missing_parent_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let staging = TempDirStaging::new(dir.path().join("no").join("such").join("dir"));

        let result = staging
            .stage(Uuid::new_v4(), ImageRole::Person, UploadedImage::new(vec![1], None, "me.png"))
            .await;

        assert!(matches!(result, Err(StagingError::Io(_))));
    }
}
