use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::{ErrorResponse, INTERNAL_ERROR_MESSAGE, MISSING_IMAGES_MESSAGE};

use crate::predictor::PredictionError;
use crate::storage::StagingError;

/// Everything that can end a try-on request early.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid multipart form data: {0}")]
    Multipart(String),
    #[error("Both person and garment images are required")]
    MissingImages,
    #[error("Image exceeds the upload size limit of {limit} bytes")]
    TooLarge { limit: usize },
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl RelayError {
    fn body(&self) -> ErrorResponse {
        match self {
            RelayError::Multipart(details) => {
                ErrorResponse::with_details("Invalid multipart form data", details.clone())
            }
            RelayError::MissingImages => ErrorResponse::new(MISSING_IMAGES_MESSAGE),
            RelayError::TooLarge { .. } => {
                ErrorResponse::with_details("Image exceeds the upload size limit", self.to_string())
            }
            RelayError::Staging(e) => ErrorResponse::with_details(INTERNAL_ERROR_MESSAGE, e.to_string()),
            RelayError::Prediction(e) => {
                ErrorResponse::with_details(INTERNAL_ERROR_MESSAGE, e.to_string())
            }
        }
    }
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Multipart(_) | RelayError::MissingImages => StatusCode::BAD_REQUEST,
            RelayError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Staging(_) | RelayError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}
