use actix_multipart::Multipart;
use futures::TryStreamExt;
use shared::ImageRole;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::RelayError;
use crate::predictor::{PredictionError, PredictionRequest, PredictionResult, Predictor};
use crate::storage::{StagedImages, StagingAdapter, UploadedImage};

/// Files collected from one multipart body. Either slot may be missing.
#[derive(Debug, Default)]
pub struct TryOnForm {
    pub person: Option<UploadedImage>,
    pub garment: Option<UploadedImage>,
}

impl TryOnForm {
    pub fn insert(&mut self, role: ImageRole, image: UploadedImage) {
        match role {
            ImageRole::Person => self.person = Some(image),
            ImageRole::Garment => self.garment = Some(image),
        }
    }

    /// Both images present and non-empty, or `MissingImages`.
    pub fn into_pair(self) -> Result<(UploadedImage, UploadedImage), RelayError> {
        match (self.person, self.garment) {
            (Some(person), Some(garment)) if !person.data.is_empty() && !garment.data.is_empty() => {
                Ok((person, garment))
            }
            _ => Err(RelayError::MissingImages),
        }
    }
}

/// Drains the multipart body, keeping the two image fields and ignoring the rest.
pub async fn read_form(mut payload: Multipart, max_bytes: usize) -> Result<TryOnForm, RelayError> {
    let mut form = TryOnForm::default();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| RelayError::Multipart(e.to_string()))?
    {
        let role = field.name().and_then(ImageRole::from_field_name);
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);
        let content_type = field.content_type().map(|mime| mime.essence_str().to_owned());

        let mut data = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| RelayError::Multipart(e.to_string()))?
        {
            if role.is_none() {
                continue;
            }
            if data.len() + chunk.len() > max_bytes {
                return Err(RelayError::TooLarge { limit: max_bytes });
            }
            data.extend_from_slice(&chunk);
        }

        let Some(role) = role else {
            continue;
        };
        if data.is_empty() {
            continue;
        }
        let file_name = file_name.unwrap_or_else(|| format!("{}.png", role.slug()));
        form.insert(role, UploadedImage::new(data, content_type.as_deref(), file_name));
    }

    Ok(form)
}

/// Stages both images, calls the predictor once, and always releases what was staged.
#[derive(Clone)]
pub struct TryOnRelay {
    stager: Arc<dyn StagingAdapter>,
    predictor: Arc<dyn Predictor>,
    predictor_timeout: Option<Duration>,
    max_upload_bytes: usize,
}

impl TryOnRelay {
    pub fn new(
        stager: Arc<dyn StagingAdapter>,
        predictor: Arc<dyn Predictor>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            stager,
            predictor,
            predictor_timeout: None,
            max_upload_bytes,
        }
    }

    pub fn with_predictor_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.predictor_timeout = timeout;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub async fn run(&self, request_id: Uuid, form: TryOnForm) -> Result<PredictionResult, RelayError> {
        let (person, garment) = form.into_pair()?;
        log::info!(
            "[{}] received {} ({} bytes) and {} ({} bytes)",
            request_id,
            person.file_name,
            person.data.len(),
            garment.file_name,
            garment.data.len()
        );

        let mut staged = StagedImages::new(self.stager.clone(), request_id);
        let outcome = self.stage_and_predict(&mut staged, request_id, person, garment).await;

        let count = staged.len();
        let failures = staged.release_all().await;
        if failures == 0 {
            log::debug!("[{}] released {} staged image(s)", request_id, count);
        } else {
            log::warn!("[{}] {} of {} release(s) failed", request_id, failures, count);
        }

        outcome
    }

    async fn stage_and_predict(
        &self,
        staged: &mut StagedImages,
        request_id: Uuid,
        person: UploadedImage,
        garment: UploadedImage,
    ) -> Result<PredictionResult, RelayError> {
        staged.stage(ImageRole::Person, person).await?;
        staged.stage(ImageRole::Garment, garment).await?;

        let (Some(person), Some(garment)) = (staged.get(ImageRole::Person), staged.get(ImageRole::Garment))
        else {
            return Err(RelayError::MissingImages);
        };
        let request = PredictionRequest::new(person, garment);

        log::info!("[{}] calling predictor", request_id);
        let result = match self.predictor_timeout {
            Some(limit) => tokio::time::timeout(limit, self.predictor.predict(request))
                .await
                .map_err(|_| PredictionError::Timeout(limit))?,
            None => self.predictor.predict(request).await,
        }?;
        log::info!("[{}] predictor returned {}", request_id, result.result_image_url);

        Ok(result)
    }
}
