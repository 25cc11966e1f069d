use async_trait::async_trait;
use shared::ImageRole;
use uuid::Uuid;

use super::{ImageReference, StagingAdapter, StagingError, UploadedImage};

/// Hands the uploaded bytes straight to the predictor. Nothing to clean up.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStaging;

#[async_trait]
impl StagingAdapter for InlineStaging {
    fn name(&self) -> &'static str {
        "inline"
    }

    async fn stage(
        &self,
        _request_id: Uuid,
        _role: ImageRole,
        image: UploadedImage,
    ) -> Result<ImageReference, StagingError> {
        Ok(ImageReference::Inline(image))
    }

    async fn release(&self, _reference: &ImageReference) -> Result<(), StagingError> {
        Ok(())
    }
}
