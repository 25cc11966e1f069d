pub mod gradio;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

use crate::storage::ImageReference;

pub use gradio::GradioPredictor;

pub const PROMPT_TEXT: &str = "Processing image";
pub const USE_MASK: bool = true;
pub const AUTO_MASK: bool = true;
pub const DENOISING_STEPS: u32 = 30;
pub const SEED: u32 = 42;

/// Remote failures display their cause verbatim; it becomes the 500 `details`.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    Remote(String),
    #[error("{0}")]
    MalformedResponse(String),
    #[error("Failed to read staged image: {0}")]
    StagedImage(#[from] std::io::Error),
    #[error("Remote predictor did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for PredictionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            PredictionError::MalformedResponse(e.to_string())
        } else if let Some(status) = e.status() {
            PredictionError::Remote(format!("HTTP {} from {}", status, url_of(&e)))
        } else {
            PredictionError::Connection(e.to_string())
        }
    }
}

fn url_of(e: &reqwest::Error) -> String {
    e.url().map(|u| u.to_string()).unwrap_or_else(|| "predictor".to_string())
}

/// The fixed-shape try-on call. Only the two images vary between requests.
#[derive(Debug, Clone, Copy)]
pub struct PredictionRequest<'a> {
    person: &'a ImageReference,
    garment: &'a ImageReference,
    prompt: &'static str,
    use_mask: bool,
    auto_mask: bool,
    denoising_steps: u32,
    seed: u32,
}

impl<'a> PredictionRequest<'a> {
    pub fn new(person: &'a ImageReference, garment: &'a ImageReference) -> Self {
        Self {
            person,
            garment,
            prompt: PROMPT_TEXT,
            use_mask: USE_MASK,
            auto_mask: AUTO_MASK,
            denoising_steps: DENOISING_STEPS,
            seed: SEED,
        }
    }

    pub fn person(&self) -> &'a ImageReference {
        self.person
    }

    pub fn garment(&self) -> &'a ImageReference {
        self.garment
    }

    /// Positional arguments in the order the remote `tryon` operation declares them.
    /// `person` and `garment` are the already-encoded file descriptors.
    pub fn arguments(&self, person: Value, garment: Value) -> Vec<Value> {
        vec![
            json!({ "background": person, "layers": [], "composite": null }),
            garment,
            json!(self.prompt),
            json!(self.use_mask),
            json!(self.auto_mask),
            json!(self.denoising_steps),
            json!(self.seed),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionResult {
    pub result_image_url: String,
}

#[async_trait]
pub trait Predictor: Send + Sync {
    /// One round trip to the hosted model. Never retries.
    async fn predict(&self, request: PredictionRequest<'_>) -> Result<PredictionResult, PredictionError>;
}
