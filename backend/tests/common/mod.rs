#![allow(dead_code)]

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tryon_backend::predictor::{PredictionError, PredictionRequest, PredictionResult, Predictor};
use tryon_backend::storage::ImageReference;

pub const BOUNDARY: &str = "----tryon-test-boundary";

/// One multipart part: field name, file name, content type, bytes.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

impl<'a> FilePart<'a> {
    pub fn new(field: &'a str, file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            field,
            file_name,
            content_type: "image/png",
            data,
        }
    }
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

pub fn multipart_body(parts: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field, part.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub enum Outcome {
    Url(String),
    Fail(String),
}

/// Stand-in for the hosted model. Records each call and which staged files existed at call time.
pub struct ScriptedPredictor {
    outcome: Outcome,
    calls: AtomicUsize,
    seen_paths: Mutex<Vec<PathBuf>>,
}

impl ScriptedPredictor {
    pub fn succeeding(url: &str) -> Self {
        Self::with(Outcome::Url(url.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Outcome::Fail(message.to_string()))
    }

    fn with(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            seen_paths: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen_paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    async fn predict(&self, request: PredictionRequest<'_>) -> Result<PredictionResult, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for reference in [request.person(), request.garment()] {
            if let ImageReference::TempFile { path, .. } = reference {
                assert!(path.exists(), "staged file missing during predict: {}", path.display());
                self.seen_paths.lock().unwrap().push(path.clone());
            }
        }
        match &self.outcome {
            Outcome::Url(url) => Ok(PredictionResult {
                result_image_url: url.clone(),
            }),
            Outcome::Fail(message) => Err(PredictionError::Remote(message.clone())),
        }
    }
}
