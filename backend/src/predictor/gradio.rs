use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{PredictionError, PredictionRequest, PredictionResult, Predictor};
use crate::config::PredictorConfig;
use crate::storage::ImageReference;

pub const HUB_URL: &str = "https://huggingface.co";
const FILE_DATA_TYPE: &str = "gradio.FileData";
const SESSION_HASH_LEN: usize = 11;

#[derive(Debug, Deserialize)]
struct SpaceHost {
    host: String,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteAppConfig {
    #[serde(default)]
    api_prefix: String,
}

#[derive(Debug, Deserialize)]
struct CallStarted {
    event_id: String,
}

/// Client for a model hosted as a Gradio app.
#[derive(Clone)]
pub struct GradioPredictor {
    http: Client,
    config: PredictorConfig,
    hub_url: String,
}

impl GradioPredictor {
    pub fn new(config: PredictorConfig) -> Result<Self, PredictionError> {
        let http = Client::builder()
            .user_agent(concat!("ai-try-on/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config,
            hub_url: HUB_URL.to_string(),
        })
    }

    /// Points space-host resolution somewhere other than the public hub.
    pub fn with_hub_url(mut self, hub_url: impl Into<String>) -> Self {
        self.hub_url = hub_url.into();
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.hf_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn resolve_host(&self) -> Result<String, PredictionError> {
        if let Some(base_url) = &self.config.base_url {
            return Ok(base_url.trim_end_matches('/').to_string());
        }

        let url = format!(
            "{}/api/spaces/{}/host",
            self.hub_url.trim_end_matches('/'),
            self.config.space
        );
        let space: SpaceHost = self
            .authorized(self.http.get(&url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(space.host.trim_end_matches('/').to_string())
    }

    /// Opens a fresh session; nothing is pooled between calls.
    async fn connect(&self) -> Result<Session<'_>, PredictionError> {
        let host = self.resolve_host().await?;
        let app: RemoteAppConfig = self
            .authorized(self.http.get(format!("{}/config", host)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let root = format!("{}{}", host, app.api_prefix.trim_end_matches('/'));
        log::debug!("connected to {} at {}", self.config.space, root);

        Ok(Session {
            predictor: self,
            root,
            session_hash: session_hash(),
        })
    }
}

#[async_trait]
impl Predictor for GradioPredictor {
    async fn predict(&self, request: PredictionRequest<'_>) -> Result<PredictionResult, PredictionError> {
        let session = self.connect().await?;

        let person = session.file_data(request.person()).await?;
        let garment = session.file_data(request.garment()).await?;
        let outputs = session
            .call(&self.config.api_name, request.arguments(person, garment))
            .await?;

        Ok(PredictionResult {
            result_image_url: first_output_url(&outputs)?,
        })
    }
}

struct Session<'a> {
    predictor: &'a GradioPredictor,
    root: String,
    session_hash: String,
}

impl Session<'_> {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.root, path.trim_start_matches('/'))
    }

    /// Encodes an image the way the remote app expects a file argument.
    async fn file_data(&self, image: &ImageReference) -> Result<Value, PredictionError> {
        match image {
            ImageReference::Inline(uploaded) => {
                let path = self
                    .upload(uploaded.data.clone(), &uploaded.file_name, &uploaded.content_type)
                    .await?;
                Ok(uploaded_file(&path, &uploaded.file_name, &uploaded.content_type))
            }
            ImageReference::TempFile {
                path,
                file_name,
                content_type,
            } => {
                let data = tokio::fs::read(path).await?;
                let remote = self.upload(data, file_name, content_type).await?;
                Ok(uploaded_file(&remote, file_name, content_type))
            }
            ImageReference::SignedUrl { url, file_name, .. } => Ok(json!({
                "path": url,
                "url": url,
                "orig_name": file_name,
                "meta": { "_type": FILE_DATA_TYPE },
            })),
        }
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<String, PredictionError> {
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| PredictionError::Connection(e.to_string()))?;
        let form = Form::new().part("files", part);

        let paths: Vec<String> = self
            .predictor
            .authorized(self.predictor.http.post(self.endpoint("upload")))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        paths
            .into_iter()
            .next()
            .ok_or_else(|| PredictionError::MalformedResponse("upload returned no file paths".into()))
    }

    async fn call(&self, api_name: &str, data: Vec<Value>) -> Result<Vec<Value>, PredictionError> {
        let call_path = format!("call/{}", api_name.trim_start_matches('/'));
        let started: CallStarted = self
            .predictor
            .authorized(self.predictor.http.post(self.endpoint(&call_path)))
            .json(&json!({ "data": data, "session_hash": self.session_hash }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        log::debug!("{} queued as event {}", api_name, started.event_id);

        let stream = self
            .predictor
            .authorized(
                self.predictor
                    .http
                    .get(self.endpoint(&format!("{}/{}", call_path, started.event_id))),
            )
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_event_stream(&stream)
    }
}

fn uploaded_file(path: &str, file_name: &str, content_type: &str) -> Value {
    json!({
        "path": path,
        "orig_name": file_name,
        "mime_type": content_type,
        "meta": { "_type": FILE_DATA_TYPE },
    })
}

fn session_hash() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_HASH_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Reads a completed call's event stream and returns the output array.
pub fn parse_event_stream(body: &str) -> Result<Vec<Value>, PredictionError> {
    let mut event = "";
    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();

        match event {
            "complete" => {
                return match serde_json::from_str::<Value>(data) {
                    Ok(Value::Array(outputs)) => Ok(outputs),
                    Ok(other) => Err(PredictionError::MalformedResponse(format!(
                        "expected an output array, got {}",
                        other
                    ))),
                    Err(e) => Err(PredictionError::MalformedResponse(e.to_string())),
                };
            }
            "error" => {
                let message = match serde_json::from_str::<Value>(data) {
                    Ok(Value::String(message)) => message,
                    Ok(Value::Null) => "remote operation failed".to_string(),
                    Ok(other) => other.to_string(),
                    Err(_) if data.is_empty() => "remote operation failed".to_string(),
                    Err(_) => data.to_string(),
                };
                return Err(PredictionError::Remote(message));
            }
            _ => {}
        }
    }

    Err(PredictionError::MalformedResponse(
        "event stream ended without a result".into(),
    ))
}

pub fn first_output_url(outputs: &[Value]) -> Result<String, PredictionError> {
    outputs
        .first()
        .and_then(|item| item.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PredictionError::MalformedResponse("first output has no url".into()))
}
